use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::exchange::{ExchangeController, ExchangeStatus};
use crate::session::ConversationStore;
use crate::transport::{HttpTransport, Transport};
use crate::ui::{self, conversation::ConversationManager};

fn controller_for<T: Transport>(config: &Config, transport: T) -> ExchangeController<T> {
    ExchangeController::new(Arc::new(ConversationStore::new(config.greeting.clone())), transport)
}

/// Launch the interactive chat
pub async fn start_chat(config: Config) -> Result<()> {
    let transport = HttpTransport::new(&config).context("Failed to set up HTTP transport")?;
    tracing::info!(endpoint = %transport.endpoint(), "starting interactive session");

    let controller = Arc::new(controller_for(&config, transport));
    let manager = ConversationManager::new(controller, config.ui.clone());
    ui::run(manager).await
}

/// Send a single message and print the reply.
///
/// Returns an error after printing the offline reply when the backend could not be reached,
/// so scripts can tell a real answer from a fallback.
pub async fn ask(config: Config, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Nothing to send: message is empty");
    }

    let transport = HttpTransport::new(&config).context("Failed to set up HTTP transport")?;
    let controller = controller_for(&config, transport);
    let report = controller.submit(text).await;

    println!("{}", report.reply.content());

    if report.status == ExchangeStatus::Failed {
        let error = controller.error().unwrap_or_default();
        anyhow::bail!("{error}");
    }
    Ok(())
}

/// Check whether the backend answers its health route
pub async fn ping(config: Config) -> Result<()> {
    let transport = HttpTransport::new(&config).context("Failed to set up HTTP transport")?;
    let url = transport.health_url()?;

    let status = transport
        .health()
        .await
        .with_context(|| format!("Backend at {url} is not reachable"))?;

    println!("{url}: {status}");
    Ok(())
}

/// Print the effective configuration, optionally writing defaults to disk first
pub fn show_config(config: &Config, init: bool) -> Result<()> {
    let path = Config::default_path()?;

    if init {
        if path.exists() {
            println!("# {} already exists, leaving it untouched", path.display());
        } else {
            Config::default().save_to(&path)?;
            println!("# wrote defaults to {}", path.display());
        }
    }

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;

    #[test]
    fn controller_uses_configured_greeting() {
        let config = Config {
            greeting: "Welcome back".to_string(),
            ..Config::default()
        };
        let controller = controller_for(&config, MockTransport::new());
        let history = controller.store().snapshot();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content(), "Welcome back");
    }

    #[tokio::test]
    async fn ask_rejects_blank_input_without_network() {
        let config = Config {
            endpoint: "http://127.0.0.1:9/chat".to_string(),
            ..Config::default()
        };
        let err = ask(config, "   ").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
