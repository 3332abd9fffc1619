//! `nakshatra gateway`: Start the HTTP API server.

use std::path::Path;

use super::load_config;

pub async fn run(config_path: Option<&Path>, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;

    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }

    if !config.has_api_key() {
        anyhow::bail!("No API key configured; set OPENAI_API_KEY or llm.api_key in the config file");
    }

    println!("🪐 Nakshatra Gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   Knowledge:  {}", config.knowledge.backend);
    println!("   Sessions:   {}", config.session.backend);

    nakshatra_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))?;

    Ok(())
}
