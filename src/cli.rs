//! CLI domain: parse, route, output, and presentation only.
//! No workflow logic; a single route table dispatches to [`crate::api::LetterApi`].

mod output;
mod parse;
mod presentation;
mod route;

pub use output::{exit_code, map_error};
pub use parse::{
    Cli, Commands, ContextArgs, IdentityArgs, ProviderCommands, RegenerateCommands,
};
pub use presentation::{colored_status, format_history_text, format_request_text};
pub use route::{caller_from, RunContext};
