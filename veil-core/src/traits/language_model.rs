use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::VeilResult;
use crate::models::{CompletionRequest, ModelEvent};

/// Streaming completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Stream a completion into `sink`, one token per event, then send
    /// [`ModelEvent::Done`]. Each `send` awaits channel capacity, which is how
    /// backpressure reaches the provider. Returns an error on provider failure.
    /// A closed `sink` means the consumer has gone away; implementations should
    /// stop and return `Ok(())`.
    async fn stream(
        &self,
        request: CompletionRequest,
        sink: mpsc::Sender<ModelEvent>,
    ) -> VeilResult<()>;

    fn name(&self) -> &str;
}
