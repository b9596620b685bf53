use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod cohort;
mod config;
mod db;
mod error;
mod import;
mod ingest;
mod insights;
#[cfg(test)]
mod memory;
mod models;
mod overview;
mod report;
mod stats;
mod store;

use crate::auth::{AuthSettings, Registration};
use crate::cohort::CohortFilter;
use crate::config::Config;
use crate::db::PgStore;
use crate::models::{SleepEntry, SleepStatus, Subject};

#[derive(Parser)]
#[command(name = "somnio")]
#[command(about = "Sleep tracking with weekly insights and a doctor panel", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TokenArg {
    /// Token printed by `somnio login`
    #[arg(long, env = "SOMNIO_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo doctor and patients with a week of sleep each
    Seed,
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// ADMIN, DOCTOR or PATIENT; anything else registers a patient
        #[arg(long)]
        role: Option<String>,
    },
    /// Sign in and print a session token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Record one night of sleep
    Log {
        #[command(flatten)]
        auth: TokenArg,
        /// excellent, good, fair, poor or terrible
        #[arg(long)]
        quality: Option<String>,
        /// Night the sleep belongs to (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        hours: Option<f64>,
        /// Bedtime as HH:MM
        #[arg(long)]
        start: Option<String>,
        /// Wake-up time as HH:MM, earlier than start means the next morning
        #[arg(long)]
        end: Option<String>,
        /// Kept only for poor or terrible nights
        #[arg(long)]
        issue: Option<String>,
    },
    /// Import sleep rows for existing accounts from a CSV file
    Import {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the last week of sleep
    Records {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        json: bool,
    },
    /// Generate sleep insights for the last week
    Insights {
        #[command(flatten)]
        auth: TokenArg,
    },
    /// Doctor panel across all patients
    Cohort {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long)]
        status: Option<SleepStatus>,
        /// Case-insensitive name or email fragment
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Write a markdown cohort report
    Report {
        #[command(flatten)]
        auth: TokenArg,
        #[arg(long, default_value = "sleep-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let pool = db::connect(&config).await?;
    let store = PgStore::new(pool.clone());

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool, config.bcrypt_cost).await?;
            println!("Seed data inserted. Demo password: DemoUser123!");
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            let settings = config.auth()?;
            let subject = auth::register(
                &store,
                &settings,
                Registration {
                    name,
                    email,
                    password,
                    role,
                },
            )
            .await?;
            println!(
                "Registered {} <{}> as {} ({}).",
                subject.name, subject.email, subject.role, subject.id
            );
        }
        Commands::Login { email, password } => {
            let settings = config.auth()?;
            let session = auth::login(&store, &settings, &email, &password).await?;
            eprintln!("Welcome back {}", session.subject.name);
            println!("{}", session.token);
        }
        Commands::Log {
            auth,
            quality,
            date,
            hours,
            start,
            end,
            issue,
        } => {
            let subject = resolve(&store, &config.auth()?, &auth).await?;
            let entry = SleepEntry {
                quality,
                date,
                hours: hours.map(|hours| vec![hours]),
                sleep_start: start,
                sleep_end: end,
                issue,
            };
            let record = ingest::record_sleep(&store, &subject, &entry).await?;
            println!(
                "Saved {} night of {} on {} ({}).",
                record.quality,
                stats::format_hours(Some(record.hours)),
                record.date,
                record.id
            );
        }
        Commands::Import { auth, csv } => {
            let subject = resolve(&store, &config.auth()?, &auth).await?;
            let file = File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let summary = import::import_csv(&store, &store, &subject, file).await?;
            println!(
                "Inserted {} records from {} ({} rejected).",
                summary.inserted,
                csv.display(),
                summary.rejected
            );
        }
        Commands::Records { auth, json } => {
            let subject = resolve(&store, &config.auth()?, &auth).await?;
            let overview = overview::overview(&store, &subject).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
                return Ok(());
            }
            print_overview(&overview);
        }
        Commands::Insights { auth } => {
            let subject = resolve(&store, &config.auth()?, &auth).await?;
            let text = overview::insight_report(&store, &subject).await?;
            println!("{text}");
        }
        Commands::Cohort {
            auth,
            status,
            search,
            json,
        } => {
            let caller = resolve(&store, &config.auth()?, &auth).await?;
            let overview = cohort::cohort_overview(&store, &caller, Utc::now()).await?;
            let filter = CohortFilter { status, search };
            let patients = filter.apply(&overview.patients);

            if json {
                println!("{}", serde_json::to_string_pretty(&patients)?);
                return Ok(());
            }

            println!(
                "{} patients, {} active today, {} active alerts, average sleep {}",
                overview.total_patients,
                overview.active_today,
                overview.active_alerts,
                stats::format_hours(overview.average_sleep)
            );
            if patients.is_empty() {
                println!("No patients match this filter.");
            }
            for patient in patients {
                println!(
                    "- {} ({}) {} avg {} / goal {:.0}h, {} alerts, last active {}",
                    patient.name,
                    patient.email,
                    patient.status.map_or("no data", SleepStatus::as_str),
                    stats::format_hours(patient.average_hours),
                    patient.sleep_goal_hours,
                    patient.alert_count,
                    patient.last_active
                );
            }
        }
        Commands::Report { auth, out } => {
            let caller = resolve(&store, &config.auth()?, &auth).await?;
            let now = Utc::now();
            let overview = cohort::cohort_overview(&store, &caller, now).await?;
            let report = report::build_report(&overview, now.date_naive());
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn resolve(
    store: &PgStore,
    settings: &AuthSettings,
    token: &TokenArg,
) -> anyhow::Result<Subject> {
    let subject = auth::authenticate(store, settings, token.token.as_deref()).await?;
    info!(subject = %subject.id, role = %subject.role, "request authenticated");
    Ok(subject)
}

fn print_overview(overview: &overview::SleepOverview) {
    let Some(summary) = &overview.summary else {
        println!("No sleep records yet.");
        return;
    };

    println!("Last {} nights:", overview.days.len());
    for day in &overview.days {
        println!("- {} {} {:.1}h", day.day_abbrev, day.date, day.hours);
    }
    println!("Average: {}", overview.average_display);
    println!(
        "Best: {} on {} ({})",
        stats::format_hours(Some(summary.best.hours)),
        summary.best.date,
        summary.best.date.format("%A")
    );
    println!(
        "Worst: {} on {} ({})",
        stats::format_hours(Some(summary.worst.hours)),
        summary.worst.date,
        summary.worst.date.format("%A")
    );
}
