use std::fs;

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    let port = std::env::var("APP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8000);
    let path = std::env::args().nth(1).unwrap_or_else(|| "openapi.json".to_string());

    let doc = obstacle_registry::docs::build_openapi(port);
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(&path, json).with_context(|| format!("failed to write {path}"))?;

    println!("wrote {path}");
    Ok(())
}
