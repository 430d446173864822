//! Entry points for use with Tokio runtimes.

pub use crate::impls::tokio::TokioRuntime;

use crate::{Runtime, SpawnBlocking};

/// Create a new Tokio-based [`Runtime`] whose executor runs
/// `worker_threads` worker threads.
///
/// Generally you should call this function only once, and then use
/// [`Clone::clone()`] to create additional references to that
/// runtime.
pub fn create_runtime(worker_threads: usize) -> std::io::Result<impl Runtime> {
    crate::impls::tokio::create_runtime(worker_threads)
}

/// Run a test function using a freshly created tokio runtime.
///
/// # Panics
///
/// Panics if we can't construct a runtime.
pub fn test_with_runtime<P, F, O>(func: P) -> O
where
    P: FnOnce(TokioRuntime) -> F,
    F: futures::Future<Output = O>,
{
    let runtime = crate::impls::tokio::create_runtime(2).expect("couldn't create runtime");
    let rt = runtime.clone();
    runtime.block_on(func(rt))
}
