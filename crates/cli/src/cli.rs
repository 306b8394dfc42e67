use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use lpgen_preview::Viewport;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "lpgen",
    version,
    about = "Generate landing pages with the LP generation service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides LPGEN_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit a request and follow it until the page is ready
    Generate {
        /// JSON file with the request (camelCase fields)
        request: Option<PathBuf>,

        #[command(flatten)]
        fields: RequestArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the current status of a job
    Status {
        job_id: String,

        /// Print the raw snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Retry a failed job and follow the new one
    Retry {
        job_id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Download the generated bundle as lp-{job_id}.zip
    Download {
        job_id: String,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// List jobs, newest first
    Jobs {
        /// Print the raw snapshots as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Request fields given as flags. They override values from a request file.
#[derive(Args, Debug, Default, Clone)]
pub struct RequestArgs {
    #[arg(long)]
    pub service_name: Option<String>,

    #[arg(long)]
    pub service_type: Option<String>,

    #[arg(long)]
    pub target_audience: Option<String>,

    #[arg(long)]
    pub features: Option<String>,

    #[arg(long)]
    pub testimonials: Option<String>,

    #[arg(long)]
    pub company_name: Option<String>,
}

/// Where and how a finished generation is written.
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Directory for previews and downloads
    #[arg(short, long, default_value = "lp-output")]
    pub out: PathBuf,

    /// Also download the bundle zip
    #[arg(long)]
    pub download: bool,

    /// Preview frame size: desktop or mobile
    #[arg(long, default_value = "desktop")]
    pub viewport: Viewport,
}
