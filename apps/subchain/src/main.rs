//! # Subchain - Pipeline Runner
//!
//! The command-line driver for the subchain assembly engine.
//!
//! This application provides:
//! - Plan execution (`run`)
//! - Chain introspection (`inspect`)
//! - Plan validation (`validate`)
//! - Deep-chain concurrency stress testing (`stress`)
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                apps/subchain (THE BINARY)             │
//! │                                                       │
//! │  ┌─────────────┐    ┌─────────────┐    ┌───────────┐  │
//! │  │   CLI       │    │ Plan loader │    │  Stress   │  │
//! │  │  (clap)     │    │ (toml/json) │    │  (tokio)  │  │
//! │  └──────┬──────┘    └──────┬──────┘    └─────┬─────┘  │
//! │         └──────────────────┼─────────────────┘        │
//! │                            ▼                          │
//! │                   ┌─────────────────┐                 │
//! │                   │  subchain-core  │                 │
//! │                   │ (THE ASSEMBLY)  │                 │
//! │                   └─────────────────┘                 │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! subchain run --plan plans/evens.toml
//! subchain inspect --plan plans/deep.toml --limit 10
//! subchain stress --depth 100000 --attachers 8
//! ```

use clap::Parser;
use subchain::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing: SUBCHAIN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SUBCHAIN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "subchain=debug,subchain_core=debug"
    } else {
        "subchain=info,subchain_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the subchain startup banner.
fn print_banner() {
    println!(
        r#"
  ┌─┐┬ ┬┌┐ ┌─┐┬ ┬┌─┐┬┌┐┌
  └─┐│ │├┴┐│  ├─┤├─┤││││
  └─┘└─┘└─┘└─┘┴ ┴┴ ┴┴┘└┘

  Pipeline Runner v{}

  Flat • Stack-safe • Concurrent
"#,
        env!("CARGO_PKG_VERSION")
    );
}
