use crate::config::{Config, expand_home, parse_hhmm};
use crate::db::Database;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to habitgrid onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let defaults = Config::default();

    println!("\n[1/3] API port");
    let api_port: u16 = Input::with_theme(&theme)
        .with_prompt("  Port for the local HTTP API")
        .default(defaults.api_port)
        .interact_text()
        .context("Failed to read API port")?;
    println!("  ✓ API will listen on 127.0.0.1:{api_port}");

    println!("\n[2/3] Daily cleanup time");
    println!("  Completed tasks past their retention period are purged once a day.");
    let cleanup_time: String = Input::with_theme(&theme)
        .with_prompt("  Cleanup time")
        .default(defaults.cleanup_time.clone())
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            parse_hhmm(input)
                .map(|_| ())
                .map_err(|_| "Use HH:MM format (example: 03:30)")
        })
        .interact_text()
        .context("Failed to read cleanup time")?;
    println!("  ✓ Cleanup runs daily at {cleanup_time}");

    println!("\n[3/3] Database location");
    let db_input: String = Input::with_theme(&theme)
        .with_prompt("  SQLite database file")
        .default(defaults.db_path.display().to_string())
        .interact_text()
        .context("Failed to read database path")?;
    let db_path = expand_home(&db_input);
    println!("  ✓ {}", db_path.display());

    let config = Config {
        api_port,
        cleanup_time,
        db_path,
        ..defaults
    };

    if Config::config_path()?.exists() {
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt("  A config file already exists. Overwrite it?")
            .default(true)
            .interact()
            .context("Failed to read overwrite confirmation")?;
        if !overwrite {
            println!("\n  Kept the existing configuration.");
            return Config::load();
        }
    }

    config.ensure_bootstrap_files()?;
    config.save()?;
    let _ = Database::open(&config.db_path)?;

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Run `habitgrid serve` to start the API.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
