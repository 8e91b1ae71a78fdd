//! NBT Dump - print a playerdata file as JSON
//!
//! Decodes a gzip-compressed NBT file (e.g. `world/playerdata/<uuid>.dat`)
//! and prints the tree as pretty JSON, followed by the mod metrics the
//! dashboard would extract from it. Useful for checking where a modpack
//! keeps its data.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin nbt_dump -- path/to/player.dat
//! cargo run --bin nbt_dump -- --raw path/to/level.nbt   # uncompressed input
//! ```

use std::env;
use worldstats::{metrics::extract_mod_metrics, nbt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let raw = args.iter().any(|a| a == "--raw");
    let Some(path) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("Usage: nbt_dump [--raw] <file>");
        std::process::exit(2);
    };

    let bytes = tokio::fs::read(path).await?;
    let tree = if raw {
        nbt::decode(&bytes)?
    } else {
        nbt::decode_gzip(&bytes)?
    };
    log::info!("Decoded {} ({} bytes), root {:?}", path, bytes.len(), tree.name);

    println!("{}", serde_json::to_string_pretty(&tree.compound)?);

    let metrics = extract_mod_metrics(&tree.compound);
    if !metrics.is_empty() {
        eprintln!("mod metrics: {}", serde_json::to_string(&metrics)?);
    }
    Ok(())
}
