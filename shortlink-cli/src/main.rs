mod identity;
mod menu;
mod notifier;

use menu::Menu;
use notifier::ConsoleNotifier;
use shortlink_core::{Registry, RegistryConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing on stderr so it doesn't interleave with the menu
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shortlink=info,shortlink_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Configuration from environment variables
    let user_file: PathBuf = std::env::var("SHORTLINK_USER_FILE")
        .unwrap_or_else(|_| identity::DEFAULT_USER_FILE.to_string())
        .into();
    let shutdown_timeout: u64 = std::env::var("SHORTLINK_SHUTDOWN_TIMEOUT")
        .unwrap_or_else(|_| "5".to_string())
        .parse()
        .unwrap_or(5);

    let owner_id = identity::load_or_create_owner_id(&user_file);

    let config = RegistryConfig::default()
        .with_shutdown_timeout(Duration::from_secs(shutdown_timeout));
    let registry = Registry::with_notifier(config, Arc::new(ConsoleNotifier));

    tracing::debug!(user_file = %user_file.display(), shutdown_timeout, "registry ready");

    let mut menu = Menu::new(
        registry.clone(),
        owner_id,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    let result = menu.run().await;

    registry.shutdown().await;
    result
}
