use app_generator::{CodeGenerator, LlmGenerator};
use pagesmith_core::config::ServiceConfig;
use pagesmith_core::memory::MemoryHost;
use pagesmith_core::Synchronizer;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::SharedSecret;
use crate::notifier::Notifier;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<dyn CodeGenerator>,
    pub synchronizer: Arc<Synchronizer>,
    pub notifier: Arc<Notifier>,
    pub secret: SharedSecret,
    pub soft_deadline: Duration,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        generator: Arc<dyn CodeGenerator>,
        synchronizer: Synchronizer,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            generator,
            synchronizer: Arc::new(synchronizer),
            notifier: Arc::new(Notifier::new(&config.notify)?),
            secret: SharedSecret::new(&config.secret),
            soft_deadline: config.soft_deadline(),
        })
    }

    /// Production wiring: GitHub REST host and the configured LLM provider.
    /// Fails before serving if anything required is missing.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        config.ensure_ready()?;
        let generator = Arc::new(LlmGenerator::new(&config.llm)?);
        let synchronizer = Synchronizer::from_config(config)?;
        Self::new(config, generator, synchronizer)
    }

    /// Publishes into an in-process host instead of GitHub. The LLM provider
    /// is still real.
    pub fn offline(config: &ServiceConfig) -> anyhow::Result<Self> {
        let owner = match config.github.user.trim() {
            "" => "offline",
            user => user,
        };
        let generator = Arc::new(LlmGenerator::new(&config.llm)?);
        let synchronizer = Synchronizer::new(Arc::new(MemoryHost::new(owner)), config.settle.clone())
            .with_critical_file(config.critical_file.clone());
        Self::new(config, generator, synchronizer)
    }
}
