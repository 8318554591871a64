//! Target-specific task spawning and timers
//!
//! The browser build drives background futures on the JS event loop. Native builds have
//! no ambient local executor, so the same work is awaited by the caller instead.

use std::future::Future;
use std::time::Duration;

/// Run `future` off the caller's path where the platform allows it
///
/// In the browser the future is spawned and this returns at once. Natively it is awaited
/// in place.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn spawn_or_await<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    future.await;
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn spawn_or_await<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

/// Await `future` for at most `duration`; `None` on timeout
#[cfg(not(target_arch = "wasm32"))]
pub(crate) async fn with_timeout<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    tokio::time::timeout(duration, future).await.ok()
}

#[cfg(target_arch = "wasm32")]
pub(crate) async fn with_timeout<F: Future>(duration: Duration, future: F) -> Option<F::Output> {
    use futures::future::{Either, select};
    use gloo_timers::future::TimeoutFuture;

    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    match select(std::pin::pin!(future), TimeoutFuture::new(millis)).await {
        Either::Left((output, _)) => Some(output),
        Either::Right(_) => None,
    }
}
