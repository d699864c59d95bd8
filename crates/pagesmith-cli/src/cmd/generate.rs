use crate::output::print_json;
use anyhow::{Context, Result};
use app_generator::{Attachment, LlmGenerator};
use pagesmith_core::config::ServiceConfig;
use std::path::Path;

pub fn run(
    config: &ServiceConfig,
    brief: &str,
    attachments: Vec<String>,
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let generator = LlmGenerator::new(&config.llm)?;
    let attachments: Vec<Attachment> = attachments.into_iter().map(Attachment::Url).collect();

    tracing::info!(provider = ?generator.provider(), model = generator.model(), "generating");

    let rt = tokio::runtime::Runtime::new()?;
    let files = rt
        .block_on(generator.try_generate(brief, &attachments))
        .with_context(|| {
            format!(
                "generation with {:?} model '{}' failed",
                generator.provider(),
                generator.model()
            )
        })?;

    if let Some(dir) = out {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        for (path, content) in files.iter() {
            let target = dir.join(path);
            std::fs::write(&target, content)
                .with_context(|| format!("failed to write {}", target.display()))?;
        }
    }

    if json {
        let map: serde_json::Map<String, serde_json::Value> = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.into()))
            .collect();
        return print_json(&map);
    }

    match out {
        Some(dir) => {
            for path in files.paths() {
                println!("wrote {}", dir.join(path).display());
            }
        }
        None => {
            for (path, content) in files.iter() {
                println!("==> {path} <==");
                println!("{content}");
            }
        }
    }
    Ok(())
}
