use {
    secrecy::{ExposeSecret, Secret},
    serenity::Client,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{
    error::{Error, Result},
    handler::RelayHandler,
};

/// Connect to the Discord gateway and process events until `cancel` fires
/// or the connection fails.
pub async fn run_bot(
    token: &Secret<String>,
    handler: RelayHandler,
    cancel: CancellationToken,
) -> Result<()> {
    let token = token.expose_secret();
    if token.trim().is_empty() {
        return Err(Error::MissingToken);
    }

    let mut client = Client::builder(token, RelayHandler::intents())
        .event_handler(handler)
        .await?;
    let shard_manager = client.shard_manager.clone();

    info!("connecting to discord");
    tokio::select! {
        result = client.start() => result?,
        _ = cancel.cancelled() => {
            info!("discord bot shutting down");
            shard_manager.shutdown_all().await;
        },
    }
    Ok(())
}
