//! Analyze command - score files or directories

use agentrisk::collect::{self, FileFilter};
use agentrisk::config::AppConfig;
use agentrisk::{report, Engine, EngineError};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct AnalyzeOptions {
    pub paths: Vec<PathBuf>,
    pub include: Vec<String>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub offline: bool,
    pub jobs: Option<usize>,
}

pub async fn run(mut config: AppConfig, options: AnalyzeOptions) -> anyhow::Result<()> {
    if options.offline {
        config.classifier.enabled = false;
    }
    if let Some(jobs) = options.jobs {
        config.analysis.jobs = jobs;
    }
    if !options.include.is_empty() {
        config.analysis.include = options.include;
    }

    let filter = FileFilter::new(&config.analysis.include).context("invalid --include pattern")?;
    let found = collect::collect_files(&options.paths, &filter);
    let (uploads, unreadable) = collect::read_uploads(&found);
    for (name, reason) in &unreadable {
        eprintln!("⏭️ {} not read: {}", name, reason);
    }
    info!("Collected {} files", uploads.len());

    let jobs = config.analysis.jobs;
    let engine = tokio::task::spawn_blocking(move || Engine::from_config(&config)).await??;
    let engine = Arc::new(engine);

    let analysis = match engine.analyze_system_concurrent(uploads, jobs).await {
        Ok(analysis) => analysis,
        Err(EngineError::NoValidFiles { skipped }) => {
            for file in &skipped {
                eprintln!("⏭️ {} skipped: {}", file.filename, file.reason);
            }
            anyhow::bail!("no valid files to analyze");
        }
        Err(e) => return Err(e.into()),
    };

    let rendered = if options.json {
        serde_json::to_string_pretty(&analysis)?
    } else {
        report::render_summary(&analysis)
    };

    match options.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("✅ Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
