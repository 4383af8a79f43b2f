//! Scan command - local scoring of a single file, no classifier

use agentrisk::catalog::Catalog;
use agentrisk::config::AppConfig;
use agentrisk::{report, Engine, UploadedFile};
use anyhow::Context;
use std::path::Path;

pub async fn run(config: &AppConfig, path: &Path, json: bool) -> anyhow::Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let catalog = match &config.analysis.catalog_file {
        Some(file) => Catalog::load_from_file(file, config.analysis.catalog_version)?,
        None => Catalog::builtin(config.analysis.catalog_version)?,
    };
    let engine = Engine::offline(catalog, config.analysis.profile);

    let upload = UploadedFile::new(path.to_string_lossy().to_string(), bytes);
    let analysis = engine
        .analyze_file(&upload)
        .map_err(|skipped| anyhow::anyhow!("{} skipped: {}", skipped.filename, skipped.reason))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("🔍 Local scan");
    println!("────────────────────────────────────");
    print!("{}", report::render_file(&analysis));

    let mut matched: Vec<_> = analysis
        .risk_pattern_scores
        .iter()
        .filter(|(_, score)| score.score > 0.0)
        .collect();
    matched.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

    if matched.is_empty() {
        println!("\nNo risk patterns matched");
    } else {
        println!("\nPattern matches:");
        for (id, score) in matched {
            let name = engine.catalog().risk(id).map(|r| r.name.as_str()).unwrap_or("");
            println!(
                "  {} {:>5.1} {} [{}]",
                id,
                score.score,
                name,
                score.matched_patterns.join(", ")
            );
        }
    }

    if !analysis.dependencies.is_empty() {
        println!("\nDependencies: {}", analysis.dependencies.join(", "));
    }

    Ok(())
}
