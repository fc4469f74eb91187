//! Fire-and-forget execution of asynchronous hooks.

use std::future::Future;
use tracing::debug;

/// Run an asynchronous hook without awaiting it.
///
/// Inside a tokio runtime the future is spawned on it. Without one it is
/// driven to completion on the calling thread.
pub fn spawn<F>(future: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(future);
        }
        Err(_) => {
            debug!("no tokio runtime, running hook inline");
            futures::executor::block_on(future);
        }
    }
}
