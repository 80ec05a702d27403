// Copyright 2026 Recon Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use recon_runtime::cli;

#[derive(Parser)]
#[command(
    name = "recon",
    about = "Recon — tactic-driven discovery engine for live web pages",
    version,
    after_help = "Run 'recon <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a discovery mission against a URL
    Scout {
        /// URL to scout
        url: String,
        /// Use only the low-invasiveness tactic catalog
        #[arg(long)]
        safe: bool,
        /// Report output path (default: recon_report_<timestamp>.json)
        #[arg(long)]
        out: Option<String>,
        /// Navigation timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Skip screenshot artifacts
        #[arg(long)]
        no_artifacts: bool,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var("RECON_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("RECON_QUIET", "1");
    }
    if cli.no_color {
        std::env::set_var("RECON_NO_COLOR", "1");
    }

    let directive = if cli.verbose {
        "recon_runtime=debug"
    } else {
        "recon_runtime=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Scout {
            url,
            safe,
            out,
            timeout,
            no_artifacts,
        } => cli::scout_cmd::run(&url, safe, out.as_deref(), timeout, no_artifacts).await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "recon", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !cli::output::is_quiet() && !cli::output::is_json() {
            eprintln!("  Error: {e:#}");
        }
        if cli::output::is_json() {
            cli::output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
