//! Serve command - run the HTTP API

use agentrisk::config::AppConfig;
use agentrisk::web::{self, AppState};
use agentrisk::Engine;
use std::sync::Arc;

pub async fn run(mut config: AppConfig, listen: Option<String>, offline: bool) -> anyhow::Result<()> {
    if let Some(listen) = listen {
        config.server.listen = listen;
    }
    if offline {
        config.classifier.enabled = false;
    }

    let listen = config.server.listen.clone();
    let jobs = config.analysis.jobs;
    let engine = tokio::task::spawn_blocking(move || Engine::from_config(&config)).await??;

    let state = Arc::new(AppState::new(Arc::new(engine), jobs));
    web::start_server(&listen, state).await
}
