//! Deadline helper shared by the guard and anything that waits on a
//! collaborator outside of one.

use std::future::Future;
use std::time::Duration;

use veil_core::errors::{VeilError, VeilResult};

/// Await `fut` for at most `limit`. An elapsed deadline becomes the error
/// built by `on_timeout`.
pub async fn with_timeout<T, Fut, E>(limit: Duration, fut: Fut, on_timeout: E) -> VeilResult<T>
where
    Fut: Future<Output = VeilResult<T>>,
    E: FnOnce() -> VeilError,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}
