//! Document rendering seam.
//!
//! A completed letter is handed to a [`DocumentRenderer`] together with [`RenderMetadata`]
//! and comes back as an opaque byte payload. Layout is entirely the renderer's business.
//! [`PlainTextRenderer`] covers `text` and `markdown`; binary formats need an external
//! renderer plugged into the API.

use crate::error::ApiError;
use crate::types::RequestId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    Text,
    Markdown,
    Pdf,
    Docx,
}

impl RenderFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderFormat::Text => "text",
            RenderFormat::Markdown => "markdown",
            RenderFormat::Pdf => "pdf",
            RenderFormat::Docx => "docx",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            RenderFormat::Text => "txt",
            RenderFormat::Markdown => "md",
            RenderFormat::Pdf => "pdf",
            RenderFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for RenderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(RenderFormat::Text),
            "markdown" | "md" => Ok(RenderFormat::Markdown),
            "pdf" => Ok(RenderFormat::Pdf),
            "docx" => Ok(RenderFormat::Docx),
            other => Err(format!("Unknown render format: {}", other)),
        }
    }
}

/// Signature block details supplied by the referee at render time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefereeProfile {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderMetadata {
    pub request_id: RequestId,
    pub applicant_name: String,
    pub program: String,
    pub referee: RefereeProfile,
    pub completed_at: DateTime<Utc>,
}

/// Rendered output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub format: RenderFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub trait DocumentRenderer: Send + Sync {
    fn supports(&self, format: RenderFormat) -> bool;

    fn render(
        &self,
        content: &str,
        metadata: &RenderMetadata,
        format: RenderFormat,
    ) -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl PlainTextRenderer {
    fn signature_lines(referee: &RefereeProfile) -> Vec<&str> {
        let mut lines = vec![referee.name.as_str()];
        lines.extend(referee.title.as_deref());
        lines.extend(referee.institution.as_deref());
        lines.push(referee.email.as_str());
        lines
    }

    fn text(content: &str, metadata: &RenderMetadata) -> String {
        let mut out = format!(
            "Letter of recommendation for {} ({})\nDate: {}\n\n",
            metadata.applicant_name,
            metadata.program,
            metadata.completed_at.format("%B %-d, %Y")
        );
        out.push_str(content.trim());
        out.push_str("\n\nSincerely,\n\n");
        out.push_str(&Self::signature_lines(&metadata.referee).join("\n"));
        out.push('\n');
        out
    }

    fn markdown(content: &str, metadata: &RenderMetadata) -> String {
        let mut out = format!(
            "# Letter of Recommendation\n\n**Applicant:** {}  \n**Program:** {}  \n**Date:** {}\n\n",
            metadata.applicant_name,
            metadata.program,
            metadata.completed_at.format("%Y-%m-%d")
        );
        out.push_str(content.trim());
        out.push_str("\n\n---\n\n");
        out.push_str(&Self::signature_lines(&metadata.referee).join("  \n"));
        out.push('\n');
        out
    }
}

impl DocumentRenderer for PlainTextRenderer {
    fn supports(&self, format: RenderFormat) -> bool {
        matches!(format, RenderFormat::Text | RenderFormat::Markdown)
    }

    fn render(
        &self,
        content: &str,
        metadata: &RenderMetadata,
        format: RenderFormat,
    ) -> Result<Vec<u8>, ApiError> {
        let rendered = match format {
            RenderFormat::Text => Self::text(content, metadata),
            RenderFormat::Markdown => Self::markdown(content, metadata),
            RenderFormat::Pdf | RenderFormat::Docx => {
                return Err(ApiError::Render(format!(
                    "Format {} is not supported by the plain text renderer",
                    format
                )))
            }
        };
        Ok(rendered.into_bytes())
    }
}
