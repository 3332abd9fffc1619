//! `nakshatra doctor`: Diagnose configuration and collaborators.

use std::path::Path;

use nakshatra_config::AppConfig;

use super::load_config;

fn report<E: std::fmt::Display>(label: &str, result: Result<bool, E>, issues: &mut usize) {
    match result {
        Ok(true) => println!("  ✅ {label} reachable"),
        Ok(false) => {
            println!("  ⚠️  {label} reported unhealthy");
            *issues += 1;
        }
        Err(e) => {
            println!("  ❌ {label}: {e}");
            *issues += 1;
        }
    }
}

pub async fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    println!("🩺 Nakshatra Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if path.exists() {
        println!("  ✅ Config file found at {}", path.display());
    } else {
        println!("  ℹ️  No config file at {}, using defaults", path.display());
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ {e:#}");
            return Ok(());
        }
    };

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key configured — set OPENAI_API_KEY");
        issues += 1;
    }

    match nakshatra_providers::build_from_config(&config) {
        Ok(provider) => {
            report(&format!("LLM provider ({})", provider.name()), provider.health_check().await, &mut issues);

            match nakshatra_knowledge::build_from_config(&config, provider) {
                Ok(store) => {
                    report(&format!("Knowledge store ({})", store.name()), store.health_check().await, &mut issues);
                    match store.count().await {
                        Ok(0) => {
                            println!("  ⚠️  Knowledge store is empty — run `nakshatra ingest`");
                            issues += 1;
                        }
                        Ok(n) => println!("  ✅ {n} documents indexed"),
                        Err(_) => {}
                    }
                }
                Err(e) => {
                    println!("  ❌ Knowledge store: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ LLM provider: {e}");
            issues += 1;
        }
    }

    match nakshatra_memory::build_from_config(&config).await {
        Ok(sessions) => report(&format!("Session store ({})", sessions.name()), sessions.health_check().await, &mut issues),
        Err(e) => {
            println!("  ❌ Session store: {e}");
            issues += 1;
        }
    }

    match nakshatra_chart::build_from_config(&config) {
        Ok(resolver) => report(
            &format!("Chart service ({})", config.chart.service_url),
            resolver.calculator().health_check().await,
            &mut issues,
        ),
        Err(e) => {
            println!("  ❌ Chart service: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
