//! Turning handler failures into a reply the user can act on

use std::fmt::Display;
use std::future::Future;

use super::types::HandlerError;

/// Passes `result` through, running `notify` first when it is an error.
///
/// A failing `notify` is only logged; the original error is what the
/// dispatcher's error handler sees.
pub(super) async fn notify_on_error<N, Fut, T, E>(result: Result<(), HandlerError>, notify: N) -> Result<(), HandlerError>
where
    N: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    if let Err(e) = &result {
        log::warn!("Handler failed, telling the user to retry: {}", e);
        if let Err(notify_err) = notify().await {
            log::error!("Could not send the failure notice: {}", notify_err);
        }
    }
    result
}
