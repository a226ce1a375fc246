use std::path::PathBuf;
use vendabot_core::{Config, Paths};
use vendabot_tools::SalesDb;

fn db_path(config: &Config, paths: &Paths) -> PathBuf {
    config
        .tools
        .sales
        .db_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| paths.sales_db())
}

pub async fn init() -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    let path = db_path(&config, &paths);
    SalesDb::open(&path)?;
    println!("✓ Sales database ready: {}", path.display());
    Ok(())
}

pub async fn import(file: &str) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    let path = db_path(&config, &paths);
    let db = SalesDb::open(&path)?;
    let count = db.import_csv(std::path::Path::new(file))?;
    println!("✓ Imported {} rows into {}", count, path.display());
    Ok(())
}

pub async fn summary() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;

    let path = db_path(&config, &paths);
    if !path.exists() {
        println!("Sales database not found. Run `vendabot sales init` first.");
        return Ok(());
    }

    let db = SalesDb::open(&path)?;
    let summary = db.summary()?;
    let row = summary
        .as_array()
        .and_then(|a| a.first())
        .cloned()
        .unwrap_or_default();

    println!("Sales database: {}", path.display());
    println!(
        "  rows:          {}",
        row.get("rows").and_then(|v| v.as_i64()).unwrap_or(0)
    );
    println!(
        "  models:        {}",
        row.get("models").and_then(|v| v.as_i64()).unwrap_or(0)
    );
    println!(
        "  manufacturers: {}",
        row.get("manufacturers").and_then(|v| v.as_i64()).unwrap_or(0)
    );
    if let (Some(first), Some(last)) = (
        row.get("first_year").and_then(|v| v.as_i64()),
        row.get("last_year").and_then(|v| v.as_i64()),
    ) {
        println!("  years:         {}-{}", first, last);
    }
    if let Some(revenue) = row.get("revenue_total").and_then(|v| v.as_f64()) {
        println!("  revenue total: {:.2}", revenue);
    }

    Ok(())
}
