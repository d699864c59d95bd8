mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use pagesmith_core::config::ServiceConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "pagesmith",
    about = "Generate single-page apps, publish them to GitHub Pages, report them for evaluation",
    version,
    propagate_version = true
)]
struct Cli {
    /// YAML config file; environment variables override its values
    #[arg(long, global = true, env = "PAGESMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8000")]
        port: u16,
        /// Publish into an in-process repository host instead of GitHub
        #[arg(long)]
        offline: bool,
    },

    /// Run the code generator once and print or write its files
    Generate {
        /// What the app should do
        #[arg(long)]
        brief: String,
        /// Attachment URL or data URL (repeatable)
        #[arg(long = "attachment", value_name = "URL")]
        attachments: Vec<String>,
        /// Write the files into this directory instead of printing them
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Inspect the most recently published repository for a task
    Verify {
        /// Task identifier (repository name prefix)
        task: String,
    },

    /// Send a test notification to an evaluation endpoint
    Notify {
        /// Evaluation callback URL
        url: String,
        #[arg(long)]
        task: String,
        #[arg(long, default_value = "1")]
        round: u32,
        #[arg(long)]
        nonce: String,
        #[arg(long)]
        repo_url: String,
        #[arg(long)]
        commit_sha: String,
        #[arg(long)]
        pages_url: String,
        #[arg(long, default_value = "")]
        email: String,
    },

    /// Inspect the loaded configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let result = ServiceConfig::load(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| run(cli.command, &config, cli.json));

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &ServiceConfig, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port, offline } => cmd::serve::run(config, port, offline),
        Commands::Generate {
            brief,
            attachments,
            out,
        } => cmd::generate::run(config, &brief, attachments, out.as_deref(), json),
        Commands::Verify { task } => cmd::verify::run(config, &task, json),
        Commands::Notify {
            url,
            task,
            round,
            nonce,
            repo_url,
            commit_sha,
            pages_url,
            email,
        } => {
            let payload = pagesmith_server::notifier::EvaluationPayload {
                email,
                task,
                round,
                nonce,
                repo_url,
                commit_sha,
                pages_url,
            };
            cmd::notify::run(config, &url, &payload, json)
        }
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, json),
    }
}
