//! `hcplog doctor` — Diagnose configuration and assistant health.

use hcplog_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 hcplog Doctor — Diagnostics");
    println!("==============================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found");
    } else {
        println!("  ⚠️  No config file, using defaults — run `hcplog onboard`");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue found. Fix the config and re-run.");
            return Ok(());
        }
    };

    match hcplog_providers::build_from_config(&config.assistant) {
        Ok(assistant) => {
            println!("  ✅ Assistant configured ({})", assistant.name());
            match assistant.health_check().await {
                Ok(true) => println!("  ✅ Assistant reachable"),
                Ok(false) => {
                    println!("  ⚠️  Assistant answered but reported unhealthy");
                    issues += 1;
                }
                Err(e) => {
                    println!("  ❌ Assistant unreachable: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ Assistant not configured: {e}");
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
