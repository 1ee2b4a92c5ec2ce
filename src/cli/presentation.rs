//! CLI presentation: text and JSON formatting of workflow results.

use crate::error::ApiError;
use crate::generation::GenerationOutcome;
use crate::ledger::VersionSnapshot;
use crate::request::LetterRequest;
use crate::status::RequestStatus;
use crate::template::Template;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;

/// Pretty JSON for any serializable result.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::Validation(format!("Failed to serialize output: {}", e)))
}

pub fn colored_status(status: RequestStatus) -> String {
    let name = status.as_str();
    match status {
        RequestStatus::Requested => name.cyan().to_string(),
        RequestStatus::InProgress => name.blue().to_string(),
        RequestStatus::Draft => name.yellow().to_string(),
        RequestStatus::InReview => name.magenta().to_string(),
        RequestStatus::Completed => name.green().to_string(),
        RequestStatus::Rejected | RequestStatus::Canceled => name.red().to_string(),
    }
}

fn excerpt(content: &str, limit: usize) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= limit {
        single_line
    } else {
        let cut: String = single_line.chars().take(limit).collect();
        format!("{}…", cut)
    }
}

pub fn format_request_text(request: &LetterRequest) -> String {
    let mut lines = vec![
        format!("Request {}  [{}]", request.id, colored_status(request.status)),
        format!(
            "Applicant:  {} <{}>",
            request.applicant.name, request.applicant_email
        ),
        format!("Program:    {}", request.applicant.program),
        format!("Referee:    {}", request.referee_email),
        format!("Template:   {}", request.template_id),
        format!(
            "Versions:   {} (next {})",
            request.history.len(),
            request.current_version
        ),
    ];
    if let Some(params) = &request.generation_parameters {
        lines.push(format!("Model:      {}", params.model_id));
    }
    if let Some(reason) = &request.rejection_reason {
        lines.push(format!("Rejected:   {}", reason));
    }
    if let Some(reason) = &request.cancellation_reason {
        lines.push(format!("Canceled:   {}", reason));
    }
    for clearance in &request.clearances {
        lines.push(format!(
            "Cleared:    {} versions at {} by {}",
            clearance.discarded_versions,
            clearance.cleared_at.to_rfc3339(),
            clearance.actor
        ));
    }
    if request.has_content() {
        lines.push(String::new());
        lines.push(request.current_content.clone());
    }
    lines.join("\n")
}

pub fn format_request_list_text(requests: &[LetterRequest]) -> String {
    if requests.is_empty() {
        return "No requests.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["ID", "Status", "Applicant", "Program", "Versions", "Updated"]);
    for request in requests {
        table.add_row(vec![
            request.id.to_string(),
            request.status.as_str().to_string(),
            request.applicant.name.clone(),
            request.applicant.program.clone(),
            request.history.len().to_string(),
            request.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.to_string()
}

pub fn format_history_text(history: &[VersionSnapshot]) -> String {
    if history.is_empty() {
        return "No versions.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Version", "Origin", "Model", "Tokens", "Created", "Excerpt"]);
    for snapshot in history {
        let origin = match snapshot.restored_from {
            Some(source) => format!("{} (from v{})", snapshot.origin, source),
            None => snapshot.origin.to_string(),
        };
        table.add_row(vec![
            snapshot.version.to_string(),
            origin,
            snapshot.model_used.clone(),
            snapshot.tokens_used.to_string(),
            snapshot.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            excerpt(&snapshot.content, 48),
        ]);
    }
    table.to_string()
}

pub fn format_outcome_text(outcome: &GenerationOutcome) -> String {
    format!(
        "Version {} ({}) via {} [{} tokens], status {}\n\n{}",
        outcome.snapshot.version,
        outcome.snapshot.origin,
        outcome.snapshot.model_used,
        outcome.snapshot.tokens_used,
        colored_status(outcome.status),
        outcome.snapshot.content
    )
}

pub fn format_templates_text(templates: &[&Template]) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["ID", "Category", "Max tokens", "Temperature"]);
    for template in templates {
        let params = &template.default_parameters;
        table.add_row(vec![
            template.id.clone(),
            template.category.to_string(),
            params
                .max_tokens
                .map(|t| t.to_string())
                .unwrap_or_else(|| "-".to_string()),
            params
                .temperature
                .map(|t| format!("{:.2}", t))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.to_string()
}
