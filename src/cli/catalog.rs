//! Catalog inspection commands

use agentrisk::catalog::Catalog;
use agentrisk::config::AppConfig;
use anyhow::Context;
use std::path::Path;

fn load(config: &AppConfig) -> anyhow::Result<Catalog> {
    let catalog = match &config.analysis.catalog_file {
        Some(file) => Catalog::load_from_file(file, config.analysis.catalog_version)
            .with_context(|| format!("failed to load catalog {}", file.display()))?,
        None => Catalog::builtin(config.analysis.catalog_version)?,
    };
    Ok(catalog)
}

pub async fn list(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = load(config)?;

    println!("📜 Risk Catalog {} ({})", catalog.version(), catalog.catalog_version());
    println!("───────────────────");

    for risk in catalog.risks() {
        let frameworks: Vec<String> = risk
            .compliance_frameworks
            .iter()
            .map(|f| f.to_string())
            .collect();
        println!(
            "{} {} [{}] - {}",
            risk.id,
            risk.name,
            risk.category,
            frameworks.join(", ")
        );
    }

    println!("\nTotal: {} risks", catalog.risks().len());
    Ok(())
}

pub async fn show(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let catalog = load(config)?;

    let Some(risk) = catalog.risk(id) else {
        println!("Risk not found: {}", id);
        println!("\nAvailable risks:");
        for risk in catalog.risks() {
            println!("  - {} {}", risk.id, risk.name);
        }
        return Ok(());
    };

    println!("📌 {} {}", risk.id, risk.name);
    println!("   Category: {}", risk.category);
    println!("   {}", risk.description);
    println!("   Keywords: {}", risk.keywords.join(", "));
    println!("   Severity indicators: {}", risk.severity_indicators.join(", "));
    for framework in &risk.compliance_frameworks {
        let penalty = catalog.penalty_for(*framework);
        println!("   ⚖️ {} - {}", framework, penalty);
    }
    Ok(())
}

pub async fn frameworks(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = load(config)?;

    println!("⚖️ Compliance Frameworks");
    println!("═══════════════════════════\n");

    for framework in catalog.frameworks() {
        println!("── {} ──", framework.name);
        if !framework.description.is_empty() {
            println!("  {}", framework.description);
        }
        println!("  Penalty: {}", framework.penalty);
        for article in &framework.articles {
            println!("  📌 {}: {}", article.reference, article.title);
        }
        println!();
    }

    Ok(())
}

pub async fn export(config: &AppConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let catalog = load(config)?;
    let yaml = catalog.to_yaml()?;

    match output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✅ Catalog exported to {}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
