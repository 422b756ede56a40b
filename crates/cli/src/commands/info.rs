//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    pool: PoolInfo,
    sink: SinkInfo,
}

#[derive(Serialize)]
struct PoolInfo {
    core_workers: usize,
    max_workers: usize,
    keep_alive_ms: u64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::PersistenceBlueprint, args: &InfoArgs) -> ConfigInfo {
    let params = if args.params {
        blueprint
            .sink
            .params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    } else {
        BTreeMap::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        pool: PoolInfo {
            core_workers: blueprint.pool.core_workers,
            max_workers: blueprint.pool.max_workers,
            keep_alive_ms: blueprint.pool.keep_alive_ms,
        },
        sink: SinkInfo {
            name: blueprint.sink.name.clone(),
            sink_type: format!("{:?}", blueprint.sink.sink_type),
            params,
        },
    }
}

fn print_config_info(blueprint: &contracts::PersistenceBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Page Persist Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let pool = &blueprint.pool;
    println!("⚙️  Worker Pool");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Core Workers: {}", pool.core_workers);
    println!("   ├─ Max Workers: {}", pool.max_workers);
    println!("   └─ Keep Alive: {} ms", pool.keep_alive_ms);

    let sink = &blueprint.sink;
    println!("\n📤 Sink");
    println!("   ├─ Name: {}", sink.name);
    if args.params && !sink.params.is_empty() {
        println!("   ├─ Type: {:?}", sink.sink_type);
        let params: BTreeMap<_, _> = sink.params.iter().collect();
        println!("   └─ Params ({}):", params.len());
        for (i, (key, value)) in params.iter().enumerate() {
            let prefix = if i == params.len() - 1 { "└─" } else { "├─" };
            println!("        {} {} = {}", prefix, key, value);
        }
    } else {
        println!("   └─ Type: {:?}", sink.sink_type);
    }

    println!();
}
