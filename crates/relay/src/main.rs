use std::sync::Arc;

use relay_core::config::Config;
use tracing::info;

fn main() -> Result<(), relay_core::Error> {
    relay_core::logging::init("relay")?;

    // `.env` values are exported into the process environment, so load them
    // while this is still the only thread.
    let cfg = Arc::new(Config::load()?);
    info!(
        data_dir = %cfg.data_dir.display(),
        backend = ?cfg.payload_backend,
        "Relay bot starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(relay_telegram::router::run_polling(cfg))
        .map_err(|e| relay_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
