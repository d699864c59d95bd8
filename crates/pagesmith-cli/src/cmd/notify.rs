use crate::output::print_json;
use anyhow::Result;
use pagesmith_core::config::ServiceConfig;
use pagesmith_server::notifier::{EvaluationPayload, Notifier};

pub fn run(config: &ServiceConfig, url: &str, payload: &EvaluationPayload, json: bool) -> Result<()> {
    let notifier = Notifier::new(&config.notify)?;
    let rt = tokio::runtime::Runtime::new()?;
    let delivered = rt.block_on(notifier.notify(url, payload));

    if json {
        print_json(&serde_json::json!({ "url": url, "delivered": delivered }))?;
    } else if delivered {
        println!("Notification delivered to {url}");
    }

    if !delivered {
        anyhow::bail!("notification to '{url}' was not delivered");
    }
    Ok(())
}
