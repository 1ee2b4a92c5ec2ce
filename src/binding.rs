//! Prompt binding: applicant data + reviewer context + template skeleton → prompt.
//!
//! Placeholders are written `{{key}}` (inner whitespace allowed). The known keys are listed
//! in [`PLACEHOLDER_KEYS`]; a key is bound only when its value is non-blank. Any placeholder
//! left without a value fails the whole binding with a [`BindingError`] naming every
//! missing key, so a prompt is never sent with holes in it.

use crate::error::{ApiError, BindingError};
use crate::request::ApplicantData;
use crate::template::Template;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

pub const KEY_APPLICANT_NAME: &str = "applicant_name";
pub const KEY_PROGRAM: &str = "program";
pub const KEY_GOAL: &str = "goal";
pub const KEY_ACHIEVEMENTS: &str = "achievements";
pub const KEY_RELATIONSHIP: &str = "relationship";
pub const KEY_DURATION: &str = "duration";
pub const KEY_STRENGTHS: &str = "strengths";
pub const KEY_EXAMPLES: &str = "examples";
pub const KEY_ADDITIONAL_NOTES: &str = "additional_notes";

pub const PLACEHOLDER_KEYS: [&str; 9] = [
    KEY_APPLICANT_NAME,
    KEY_PROGRAM,
    KEY_GOAL,
    KEY_ACHIEVEMENTS,
    KEY_RELATIONSHIP,
    KEY_DURATION,
    KEY_STRENGTHS,
    KEY_EXAMPLES,
    KEY_ADDITIONAL_NOTES,
];

/// Free-text fields the referee supplies about the applicant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerContext {
    pub relationship: String,
    pub duration: String,
    pub strengths: String,
    #[serde(default)]
    pub examples: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl ReviewerContext {
    pub fn new(
        relationship: impl Into<String>,
        duration: impl Into<String>,
        strengths: impl Into<String>,
    ) -> Self {
        Self {
            relationship: relationship.into(),
            duration: duration.into(),
            strengths: strengths.into(),
            examples: None,
            additional_notes: None,
        }
    }

    pub fn with_examples(mut self, examples: impl Into<String>) -> Self {
        self.examples = Some(examples.into());
        self
    }

    pub fn with_additional_notes(mut self, notes: impl Into<String>) -> Self {
        self.additional_notes = Some(notes.into());
        self
    }

    /// Relationship, duration and strengths must all be non-blank.
    pub fn validate_required(&self) -> Result<(), ApiError> {
        let empty: Vec<&str> = [
            (KEY_RELATIONSHIP, &self.relationship),
            (KEY_DURATION, &self.duration),
            (KEY_STRENGTHS, &self.strengths),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| key)
        .collect();

        if empty.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(format!(
                "Reviewer context is missing required fields: {}",
                empty.join(", ")
            )))
        }
    }
}

/// Resolved placeholder values. Blank values are never bound.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptBindings {
    values: BTreeMap<&'static str, String>,
}

impl PromptBindings {
    pub fn from_parts(applicant: &ApplicantData, context: &ReviewerContext) -> Self {
        let mut bindings = Self::default();
        bindings.bind(KEY_APPLICANT_NAME, Some(&applicant.name));
        bindings.bind(KEY_PROGRAM, Some(&applicant.program));
        bindings.bind(KEY_GOAL, applicant.goal.as_ref());
        bindings.bind(KEY_ACHIEVEMENTS, applicant.achievements.as_ref());
        bindings.bind(KEY_RELATIONSHIP, Some(&context.relationship));
        bindings.bind(KEY_DURATION, Some(&context.duration));
        bindings.bind(KEY_STRENGTHS, Some(&context.strengths));
        bindings.bind(KEY_EXAMPLES, context.examples.as_ref());
        bindings.bind(KEY_ADDITIONAL_NOTES, context.additional_notes.as_ref());
        bindings
    }

    fn bind(&mut self, key: &'static str, value: Option<&String>) {
        if let Some(value) = value {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.values.insert(key, trimmed.to_string());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Distinct placeholder keys referenced by a skeleton.
pub fn placeholders(skeleton: &str) -> BTreeSet<String> {
    placeholder_pattern()
        .captures_iter(skeleton)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitute `bindings` into `skeleton`.
pub fn render_skeleton(
    template_id: &str,
    skeleton: &str,
    bindings: &PromptBindings,
) -> Result<String, BindingError> {
    let missing: Vec<String> = placeholders(skeleton)
        .into_iter()
        .filter(|key| bindings.get(key).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(BindingError {
            template_id: template_id.to_string(),
            missing,
        });
    }

    let rendered = placeholder_pattern().replace_all(skeleton, |caps: &Captures<'_>| {
        bindings.get(&caps[1]).unwrap_or_default().to_string()
    });
    Ok(rendered.into_owned())
}

/// Bind a template's prompt skeleton for one applicant and reviewer context.
pub fn bind_prompt(
    template: &Template,
    applicant: &ApplicantData,
    context: &ReviewerContext,
) -> Result<String, BindingError> {
    let bindings = PromptBindings::from_parts(applicant, context);
    render_skeleton(&template.id, &template.prompt_skeleton, &bindings)
}
