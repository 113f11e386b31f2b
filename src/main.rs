use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use crate::handler::AnalyticsRequest;
use crate::models::ErrorEnvelope;

mod analytics;
mod db;
mod handler;
mod insights;
mod models;
mod report;

#[derive(Parser)]
#[command(name = "institution-analytics")]
#[command(about = "Institution analytics aggregation for the scholarship platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import analytics events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute the analytics envelope and print it as JSON
    Analytics {
        #[arg(long)]
        institution: String,
        #[arg(long)]
        timeframe: Option<String>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        institution: String,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let institution_id = db::seed(&pool).await?;
            println!("Seed data inserted for institution {institution_id}.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} events from {}.", csv.display());
        }
        Commands::Analytics {
            institution,
            timeframe,
        } => {
            let request = AnalyticsRequest {
                institution_id: institution,
                timeframe,
            };
            match handler::handle(&pool, &request).await {
                Ok(envelope) => println!("{}", serde_json::to_string_pretty(&envelope)?),
                Err(err) => {
                    let envelope = ErrorEnvelope::new(format!("{err:#}"));
                    println!("{}", serde_json::to_string_pretty(&envelope)?);
                    std::process::exit(1);
                }
            }
        }
        Commands::Report {
            institution,
            timeframe,
            out,
        } => {
            let request = AnalyticsRequest {
                institution_id: institution,
                timeframe,
            };
            let envelope = handler::handle(&pool, &request).await?;
            std::fs::write(&out, report::build_report(&envelope))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
