use anyhow::Result;
use pagesmith_core::config::ServiceConfig;
use pagesmith_server::AppState;

pub fn run(config: &ServiceConfig, port: u16, offline: bool) -> Result<()> {
    let state = if offline {
        tracing::warn!("offline mode: repositories live in memory and vanish on exit");
        AppState::offline(config)?
    } else {
        AppState::from_config(config)?
    };
    if !state.secret.is_configured() {
        tracing::warn!("no shared secret configured; every build request will be rejected");
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(pagesmith_server::serve(state, port))
}
