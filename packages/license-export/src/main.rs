//! CLI for exporting Miro license data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use license_export::config::{read_token_file, Config};
use license_export::{run_export, write_export, ExportSummary, LicenseReport, SlackNotifier};
use miro_client::{fetch_all, MemberQuery, MiroClient, DEFAULT_BOARDS_LIMIT};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "miro-export")]
#[command(about = "Export Miro members and boards for license reviews")]
#[command(version)]
struct Cli {
    /// Miro API token (overrides MIRO_API_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Read the API token from a text file
    #[arg(long, global = true, conflicts_with = "token")]
    token_file: Option<PathBuf>,

    /// Retries after HTTP 429 before giving up
    #[arg(long, global = true)]
    rate_limit_retries: Option<u32>,

    /// Retries after network failures before giving up
    #[arg(long, global = true)]
    transport_retries: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export organization members to CSV
    Members {
        /// Organization ID (overrides MIRO_ORG_ID)
        #[arg(long)]
        org_id: Option<String>,

        #[arg(short, long, default_value = "miro_users_export.csv")]
        output: PathBuf,

        /// Members per request (1-100)
        #[arg(long, default_value_t = 100)]
        page_size: u32,

        /// Only active (true) or inactive (false) members
        #[arg(long)]
        active: Option<bool>,

        /// Only members with this license (e.g. full, free)
        #[arg(long)]
        license: Option<String>,

        /// Only members with this role
        #[arg(long)]
        role: Option<String>,

        /// Only these emails (comma-separated or repeated)
        #[arg(long, value_delimiter = ',')]
        email: Vec<String>,
    },

    /// Export boards to CSV
    Boards {
        #[arg(short, long, default_value = "miro_boards_export.csv")]
        output: PathBuf,

        /// Boards per request (1-50)
        #[arg(long, default_value_t = DEFAULT_BOARDS_LIMIT)]
        page_size: u32,
    },

    /// Summarise full-license usage and idle seats
    Licenses {
        /// Organization ID (overrides MIRO_ORG_ID)
        #[arg(long)]
        org_id: Option<String>,

        /// Licenses purchased (overrides MIRO_TOTAL_LICENSES)
        #[arg(long)]
        total_licenses: Option<u32>,

        /// Days without activity before a seat counts as idle
        #[arg(long)]
        inactive_days: Option<i64>,

        /// Write idle full-license members to this CSV
        #[arg(long)]
        idle_output: Option<PathBuf>,

        /// Post the report to SLACK_WEBHOOK_URL instead of printing it
        #[arg(long)]
        notify: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,miro_client=debug,license_export=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = &cli.token_file {
        config.api_token = Some(read_token_file(path)?);
    }
    if let Some(token) = cli.token {
        config.api_token = Some(token);
    }
    if let Some(retries) = cli.rate_limit_retries {
        config.retry.max_rate_limit_retries = retries;
    }
    if let Some(retries) = cli.transport_retries {
        config.retry.max_transport_retries = retries;
    }

    let client = MiroClient::new(config.require_token()?)
        .with_base_url(&config.api_base)
        .with_timeout(config.request_timeout)?;

    match cli.command {
        Commands::Members {
            org_id,
            output,
            page_size,
            active,
            license,
            role,
            email,
        } => {
            if org_id.is_some() {
                config.org_id = org_id;
            }
            let mut query = MemberQuery::default().with_limit(page_size).emails(email);
            query.active = active;
            query.license = license;
            query.role = role;

            let source = client.members(config.require_org_id()?, query);
            let summary = run_export(source, config.retry.clone(), &output).await?;
            print_summary("members", &summary);
        }
        Commands::Boards { output, page_size } => {
            let source = client.boards(page_size);
            let summary = run_export(source, config.retry.clone(), &output).await?;
            print_summary("boards", &summary);
        }
        Commands::Licenses {
            org_id,
            total_licenses,
            inactive_days,
            idle_output,
            notify,
        } => {
            if org_id.is_some() {
                config.org_id = org_id;
            }
            let total = total_licenses.unwrap_or(config.total_licenses);
            let days = inactive_days.unwrap_or(config.inactive_days);

            let source = client.members(config.require_org_id()?, MemberQuery::default());
            let members = fetch_all(source, config.retry.clone())
                .await
                .context("License report aborted")?;

            let report = LicenseReport::from_members(&members, total, days, chrono::Utc::now())?;
            tracing::info!(
                used = report.used,
                total = report.total_licenses,
                reclaimable = report.reclaimable.len(),
                "License usage computed"
            );

            if let Some(path) = idle_output {
                let summary = write_export(&path, &report.reclaimable)?;
                print_summary("idle members", &summary);
            }

            let message = report.to_message();
            if notify {
                let webhook = config
                    .slack_webhook_url
                    .as_deref()
                    .context("--notify requires SLACK_WEBHOOK_URL")?;
                SlackNotifier::new(webhook).post(&message).await?;
            } else {
                println!("{}", message);
            }
        }
    }

    Ok(())
}

fn print_summary(what: &str, summary: &ExportSummary) {
    println!(
        "{} {} {} to {}",
        "✓".bright_green(),
        format!("Exported {}", summary.rows).bold(),
        what,
        summary.path.display()
    );
}
