// System status display — DB stats, account counts, model files, secrets.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::download::missing_models;

/// Display system status to the terminal.
pub async fn show(config: &Config, db: Option<&Arc<dyn Database>>) -> Result<()> {
    match db {
        Some(db) if Path::new(&config.db_path).exists() => {
            let file_size = std::fs::metadata(&config.db_path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_else(|_| "unknown".to_string());
            println!("Database: {} ({})", config.db_path, file_size);

            let (users, superusers) = db.user_counts().await?;
            println!("Accounts: {users} total, {superusers} superuser");
            if superusers == 0 {
                println!("  {}", "No superuser yet: register one with is_superuser=true".yellow());
            }
        }
        _ => {
            println!("Database: not initialized");
            println!("\nRun `neutralizer init` to set up the database.");
        }
    }

    let missing = missing_models(&config.model_dir);
    if missing.is_empty() {
        println!("Models: all present in {}", config.model_dir.display());
    } else {
        println!(
            "Models: {} missing in {}",
            missing.len(),
            config.model_dir.display()
        );
        for file in &missing {
            println!("  {} {}", "-".red(), file);
        }
        println!("  Run `neutralizer download-model` to fetch them");
    }

    println!(
        "Completion API: {} ({})",
        if config.completion_api_key.is_empty() {
            "no key".red()
        } else {
            "key set".green()
        },
        config.completion_base_url
    );
    println!(
        "Model tiers: standard={}, advanced={}",
        config.standard_model, config.advanced_model
    );
    println!(
        "Email encryption: {}",
        if config.encryption_key.is_some() {
            "on".green()
        } else {
            "off".dimmed()
        }
    );
    if config.session_secret.is_empty() {
        println!("Session secret: {}", "not set".red());
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
