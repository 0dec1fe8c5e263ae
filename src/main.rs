//! Encrypted PostgreSQL snapshot tool
//!
//! `backup` dumps, compresses and encrypts the database and uploads it to an
//! S3-compatible bucket. `restore` fetches the newest snapshot, wipes the
//! local schema and reloads it (loader and `.local` hosts only).

// dbvault/src/main.rs
mod artifact;
mod backup;
mod config;
mod errors;
mod restore;
mod safety;
mod storage;
mod utils;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use config::{AppConfig, OperationConfig, load_backup_config, load_restore_config};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use restore::RestoreOutcome;
use storage::{RemoteStore, S3Store};

/// Main entry point for the backup/restore tool
#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❗ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; stdout stays reserved for progress lines and `list --json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

async fn run_app() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };
    let json = args.iter().skip(2).any(|a| a == "--json");

    let mut app_config =
        AppConfig::load_from_env().context("Failed to load configuration from the environment")?;

    match choice.as_str() {
        "1" | "backup" => {
            println!(
                "Hi! This tool will dump the PostgreSQL database, compress and encrypt it,\n\
                 and then upload it to object storage.\n"
            );
            let backup_config = load_backup_config(&app_config.raw_env_config)
                .context("Failed to load backup configuration")?;
            app_config.operation = Some(OperationConfig::Backup(backup_config));
            backup::run_backup_flow(&app_config)
                .await
                .context("Backup process failed")?;
            println!("👍 That's all!");
        }
        "2" | "restore" => {
            println!(
                "This tool will download the last database backup from object storage,\n\
                 decrypt and unzip it, and then load it into the local database.\n"
            );
            let restore_config = load_restore_config(&app_config.raw_env_config)
                .context("Failed to load restore configuration")?;
            app_config.operation = Some(OperationConfig::Restore(restore_config));
            match restore::run_restore_flow(&app_config)
                .await
                .context("Restore process failed")?
            {
                RestoreOutcome::Restored { .. } => println!("👍 That's all!"),
                RestoreOutcome::NothingToRestore => println!("Nothing to restore."),
            }
        }
        "3" | "list" => {
            app_config.operation = Some(OperationConfig::List);
            list_artifacts(&app_config, json)
                .await
                .context("Listing backups failed")?;
        }
        _ => {
            println!(
                "❌ Invalid choice. Please enter '1' (backup), '2' (restore), or '3' (list)."
            );
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

async fn list_artifacts(app_config: &AppConfig, json: bool) -> Result<()> {
    let store = S3Store::connect(&app_config.spaces_config).await;
    let objects = artifact::newest_first(store.list_objects().await?);

    if json {
        println!("{}", serde_json::to_string_pretty(&objects)?);
    } else if objects.is_empty() {
        println!("No files found.");
    } else {
        println!("{}", artifact::render_listing(&objects));
    }
    Ok(())
}

/// Prompts user to select backup or restore operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Take Backup (or type 'backup')");
    println!("2. Restore Latest Backup (or type 'restore')");
    println!("3. List Backups (or type 'list')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
