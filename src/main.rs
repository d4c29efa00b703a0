mod api;
mod auth;
mod calendar;
mod cli;
mod config;
mod db;
mod error;
mod habits;
mod patch;
mod schedule;
mod scheduler;
mod stats;
mod tasks;

use crate::auth::{Caller, Owner};
use crate::cli::onboard::run_onboarding;
use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::{Config, parse_hhmm};
use crate::db::Database;
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
        Commands::Seed { owner } => handle_seed(&owner),
        Commands::Streak { owner, date } => handle_streak(&owner, date.as_deref()),
        Commands::Cleanup { owner } => handle_cleanup(owner.as_deref()),
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let summary = database.summary()?;
    let next_cleanup = parse_hhmm(&config.cleanup_time)
        .and_then(scheduler::delay_until_next_run)
        .map(|delay| format!("in {}s", delay.as_secs()))
        .unwrap_or_else(|error| format!("unavailable ({error})"));

    println!("habitgrid status");
    println!("- db_path: {}", config.db_path.display());
    println!("- api: http://127.0.0.1:{}", config.api_port);
    println!("- cleanup_time: {} (next {next_cleanup})", config.cleanup_time);
    println!("- owners: {}", summary.owners);
    println!("- habits: {}", summary.habits);
    println!("- habit_logs: {}", summary.habit_logs);
    println!("- schedule_cards: {}", summary.schedule_cards);
    println!(
        "- tasks: {} active, {} completed",
        summary.active_tasks, summary.completed_tasks
    );
    println!(
        "- last_logged_at: {}",
        summary
            .last_logged_at
            .map(|timestamp| timestamp.to_string())
            .unwrap_or_else(|| "none".to_string())
    );

    Ok(())
}

fn handle_seed(owner: &str) -> Result<()> {
    let config = load_or_default_config()?;
    let owner = Owner::new(owner)?;
    let database = Database::open(&config.db_path)?;
    let outcome = habits::create_defaults(&database, &owner)?;

    println!("Seeded {} default habit(s) for {owner}", outcome.created);
    Ok(())
}

fn handle_streak(owner: &str, date: Option<&str>) -> Result<()> {
    let config = load_or_default_config()?;
    let caller = Caller::from(Owner::new(owner)?);
    let anchor = date
        .map(calendar::parse_date)
        .transpose()?
        .unwrap_or_else(calendar::today);
    let database = Database::open(&config.db_path)?;
    let streak = stats::overall(&database, &caller, anchor, config.stats_window_days)?;

    println!("Streak as of {}", calendar::format_date(anchor));
    println!("- current: {}", streak.current);
    println!("- best: {}", streak.best);
    if !streak.habit_name.is_empty() {
        println!("- longest running habit: {}", streak.habit_name);
    }

    Ok(())
}

fn handle_cleanup(owner: Option<&str>) -> Result<()> {
    let config = load_or_default_config()?;
    let database = Database::open(&config.db_path)?;
    let now = calendar::now_millis();

    match owner {
        Some(owner) => {
            let owner = Owner::new(owner)?;
            let deleted =
                tasks::cleanup_old(&database, &owner, now, config.default_retention_days)?;
            println!("Deleted {deleted} completed task(s) for {owner}");
        }
        None => {
            let report = tasks::cleanup_all(&database, now, config.default_retention_days)?;
            println!(
                "Deleted {} completed task(s) across {} owner(s)",
                report.deleted, report.owners
            );
        }
    }

    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    config.ensure_bootstrap_files()?;
    let _ = Database::open(&config.db_path)?;

    let shared_config = Arc::new(config);
    let api_config = Arc::clone(&shared_config);
    let schedule_fallback = Arc::clone(&shared_config);
    let cleanup_config = Arc::clone(&shared_config);

    info!(port = shared_config.api_port, "habitgrid service started");

    tokio::select! {
        api_result = api::run_server(api_config) => {
            api_result?;
        }
        scheduler_result = scheduler::run_daily_job(move || {
            let cleanup_time = Config::load()
                .map(|runtime| runtime.cleanup_time)
                .unwrap_or_else(|_| schedule_fallback.cleanup_time.clone());

            parse_hhmm(&cleanup_time)
        }, move || {
            let config = Arc::clone(&cleanup_config);
            async move {
                let runtime = Config::load().unwrap_or_else(|_| (*config).clone());
                let database = Database::open(&runtime.db_path)?;
                let report = tasks::cleanup_all(
                    &database,
                    calendar::now_millis(),
                    runtime.default_retention_days,
                )?;
                info!(owners = report.owners, deleted = report.deleted, "daily cleanup finished");
                Ok(())
            }
        }) => {
            scheduler_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn load_or_default_config() -> Result<Config> {
    Config::load().or_else(|_| {
        let config = Config::default();
        config.ensure_bootstrap_files()?;
        config.save()?;
        Ok(config)
    })
}
