//! CLI parse: clap types for letterflow. No behavior; definitions only.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Letterflow CLI - recommendation letter drafting and review
#[derive(Parser)]
#[command(name = "letterflow")]
#[command(about = "Generate, version and finalize recommendation letters")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (overrides layered config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub identity: IdentityArgs,

    /// Output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

/// Who is running the command. Identity is trusted as given.
#[derive(Args, Debug, Clone, Default)]
pub struct IdentityArgs {
    /// Caller user id
    #[arg(long = "user", global = true)]
    pub user_id: Option<String>,

    /// Caller email
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Caller role (referee or applicant)
    #[arg(long, global = true)]
    pub role: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a new letter request (applicant)
    Create {
        /// Applicant's full name
        #[arg(long)]
        name: String,
        /// Program or position applied for
        #[arg(long)]
        program: String,
        /// Email of the referee being asked
        #[arg(long)]
        referee_email: String,
        /// Template id
        #[arg(long, default_value = "academic")]
        template: String,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        achievements: Option<String>,
    },
    /// Accept an invitation (referee)
    Accept { id: String },
    /// Decline an invitation (referee)
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Withdraw a request (either party)
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Generate a draft from reviewer context (referee)
    Generate {
        id: String,
        /// Model id (defaults to generation.default_model)
        #[arg(long)]
        model: Option<String>,
        /// Template override
        #[arg(long)]
        template: Option<String>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Produce a new version under a regeneration strategy (referee)
    Regenerate {
        id: String,
        #[command(subcommand)]
        strategy: RegenerateCommands,
    },
    /// Show one request
    Show { id: String },
    /// List the caller's requests
    List,
    /// Show version history
    History { id: String },
    /// Print one version's content
    Version { id: String, version: u32 },
    /// Make an earlier version current (referee)
    Restore { id: String, version: u32 },
    /// Discard all versions except the current content (referee)
    ClearHistory { id: String },
    /// Replace the current content with edited text (referee)
    Edit {
        id: String,
        /// New content
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read new content from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Move a draft into review (referee)
    Submit { id: String },
    /// Move a letter in review back to draft (referee)
    ReturnToDraft { id: String },
    /// Finalize the letter (referee)
    Approve { id: String },
    /// Render a completed letter (referee)
    Render {
        id: String,
        /// text, markdown, pdf or docx
        #[arg(long = "as", default_value = "text")]
        render_format: String,
        /// Signature name
        #[arg(long)]
        signature: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        institution: Option<String>,
        /// Write the document here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List available templates
    Templates,
    /// Provider commands
    Provider {
        #[command(subcommand)]
        command: ProviderCommands,
    },
    /// Validate the loaded configuration
    ValidateConfig,
}

/// Reviewer context supplied on the command line.
#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// How the referee knows the applicant
    #[arg(long)]
    pub relationship: String,
    /// How long the referee has known the applicant
    #[arg(long)]
    pub duration: String,
    /// Key strengths
    #[arg(long)]
    pub strengths: String,
    #[arg(long)]
    pub examples: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum RegenerateCommands {
    /// Same template, model and context
    Same,
    /// Same template and context, different model
    Model { model: String },
    /// Same template and model, new reviewer context
    Context {
        #[command(flatten)]
        context: ContextArgs,
    },
}

#[derive(Subcommand)]
pub enum ProviderCommands {
    /// Show the configured generation provider
    Show,
    /// List models the provider reports
    Models,
}
