use anyhow::{Context, Result};
use std::io::{self, BufRead};
use std::path::Path;
use tracing::info;

use content_shield::config::Config;
use content_shield::init::{build_shield, init_database, setup_logging};
use content_shield::ContentShield;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config (first argument, when it names a .toml file)
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.first() {
        Some(first) if first.ends_with(".toml") => Some(args.remove(0)),
        _ => None,
    };
    let config = match &config_path {
        Some(path) if Path::new(path).exists() => Config::load(path).await?,
        _ => Config::default(),
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting content-shield...");
    if let Some(path) = &config_path {
        if !Path::new(path).exists() {
            info!("Config file {} not found, using defaults.", path);
        }
    }

    // 3. Init DB & Engine
    let db = init_database(&config)?;
    let shield = build_shield(&config, db, Vec::new())?;
    let reporter = config
        .stats
        .enable
        .then(|| shield.spawn_stats_reporter(config.stats.log_interval_seconds));

    // 4. Classify arguments, or stdin lines when none are given
    if args.is_empty() {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line.context("Failed to read address from stdin")?;
            if !line.trim().is_empty() {
                print_decision(&shield, line.trim());
            }
        }
    } else {
        for address in &args {
            print_decision(&shield, address);
        }
    }

    if let Some(reporter) = reporter {
        reporter.abort();
        shield.stats_dump();
    }

    Ok(())
}

fn print_decision(shield: &ContentShield, address: &str) {
    let decision = shield.decide(address);
    let result = &decision.result;
    if result.is_blocked {
        let category = result
            .category
            .map(|c| c.as_str())
            .unwrap_or("UNKNOWN");
        println!(
            "BLOCK {} {} {:.2} ({}) wait {}s",
            address, category, result.confidence, result.reason, result.remediation_seconds
        );
        if let Some(guidance) = &decision.guidance {
            println!("  {}", guidance.text);
        }
    } else {
        println!("ALLOW {}", address);
    }
}
