//! `hcplog status` — Show configuration status.

use hcplog_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let assistant = &config.assistant;

    println!("hcplog Status");
    println!("=============");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Assistant:     {}", assistant.kind);
    println!("  URL:           {}", assistant.api_url.as_deref().unwrap_or("(default)"));
    if assistant.kind == "openai" {
        println!("  Model:         {}", assistant.model);
        println!("  Temperature:   {}", assistant.temperature);
        println!("  API key:       {}", if assistant.has_api_key() { "set" } else { "missing" });
    }
    match assistant.timeout_secs {
        Some(secs) => println!("  Timeout:       {secs}s"),
        None => println!("  Timeout:       none"),
    }
    println!(
        "  Payload tags:  {}",
        if config.session.honor_payload_tags { "honored" } else { "ignored" }
    );

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `hcplog onboard` first");
    }

    Ok(())
}
