//! Letter templates.
//!
//! Templates are reusable prompt skeletons plus default generation parameters. They are
//! referenced by id from requests and never mutated by generation.

use crate::binding::{placeholders, PLACEHOLDER_KEYS};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    #[default]
    Academic,
    Employment,
    Scholarship,
    General,
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateCategory::Academic => "academic",
            TemplateCategory::Employment => "employment",
            TemplateCategory::Scholarship => "scholarship",
            TemplateCategory::General => "general",
        };
        f.write_str(name)
    }
}

/// Per-template generation defaults. Unset fields fall back to the global settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateParameters {
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Filled from the configuration key when omitted.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category: TemplateCategory,
    pub prompt_skeleton: String,
    #[serde(default)]
    pub default_parameters: TemplateParameters,
}

impl Template {
    /// Check the skeleton is non-empty and only references known placeholder keys.
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Template id cannot be empty".to_string());
        }
        if self.prompt_skeleton.trim().is_empty() {
            return Err(format!("Template '{}' has an empty prompt skeleton", self.id));
        }
        let unknown: Vec<String> = placeholders(&self.prompt_skeleton)
            .into_iter()
            .filter(|key| !PLACEHOLDER_KEYS.contains(&key.as_str()))
            .collect();
        if !unknown.is_empty() {
            return Err(format!(
                "Template '{}' references unknown placeholders: {}",
                self.id,
                unknown.join(", ")
            ));
        }
        if let Some(temperature) = self.default_parameters.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(format!(
                    "Template '{}' temperature {} is outside 0.0-2.0",
                    self.id, temperature
                ));
            }
        }
        Ok(())
    }
}

/// In-memory template lookup.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Template>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog pre-populated with [`builtin_templates`].
    pub fn with_builtin() -> Self {
        let mut catalog = Self::new();
        for template in builtin_templates() {
            catalog.templates.insert(template.id.clone(), template);
        }
        catalog
    }

    /// Register templates keyed by configuration name, overriding same-id entries.
    pub fn load_from_config(&mut self, templates: &HashMap<String, Template>) -> Result<(), ApiError> {
        for (name, template) in templates {
            let mut template = template.clone();
            if template.id.is_empty() {
                template.id = name.clone();
            }
            self.register(template)?;
        }
        Ok(())
    }

    pub fn register(&mut self, template: Template) -> Result<(), ApiError> {
        template.validate().map_err(ApiError::Config)?;
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn get(&self, template_id: &str) -> Option<&Template> {
        self.templates.get(template_id)
    }

    pub fn get_or_error(&self, template_id: &str) -> Result<&Template, ApiError> {
        self.get(template_id)
            .ok_or_else(|| ApiError::TemplateNotFound(template_id.to_string()))
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.templates.contains_key(template_id)
    }

    pub fn list(&self) -> Vec<&Template> {
        self.templates.values().collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

const ACADEMIC_SKELETON: &str = "Write a formal letter of recommendation for {{applicant_name}}, \
who is applying to the {{program}} program.\n\
I have known the applicant as their {{relationship}} for {{duration}}.\n\
Their key strengths: {{strengths}}.\n\
Keep the letter under one page and write it in the first person.";

const EMPLOYMENT_SKELETON: &str = "Write a professional reference letter for {{applicant_name}}, \
who is applying for {{program}}.\n\
I worked with the applicant as their {{relationship}} for {{duration}}.\n\
Highlight these strengths: {{strengths}}.\n\
Concrete examples: {{examples}}.";

/// Templates shipped with the crate.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        Template {
            id: "academic".to_string(),
            category: TemplateCategory::Academic,
            prompt_skeleton: ACADEMIC_SKELETON.to_string(),
            default_parameters: TemplateParameters {
                system_prompt: Some(
                    "You write recommendation letters on behalf of university faculty.".to_string(),
                ),
                max_tokens: Some(1200),
                temperature: Some(0.7),
            },
        },
        Template {
            id: "employment".to_string(),
            category: TemplateCategory::Employment,
            prompt_skeleton: EMPLOYMENT_SKELETON.to_string(),
            default_parameters: TemplateParameters {
                system_prompt: Some(
                    "You write concise professional reference letters.".to_string(),
                ),
                max_tokens: Some(900),
                temperature: Some(0.6),
            },
        },
    ]
}
