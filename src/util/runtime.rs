//! Tokio runtime for one command-line run

use crate::Result;
use anyhow::Context;
use std::future::Future;

/// Drive `future` to completion on a fresh multi-threaded runtime
///
/// Band renders run on the blocking pool and cannot be cancelled. When the
/// run fails the runtime is shut down in the background, so those renders are
/// abandoned instead of holding up the exit.
pub fn block_on_run<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let result = runtime.block_on(future);
    if result.is_err() {
        runtime.shutdown_background();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_returns_the_run_result() {
        let value = block_on_run(async { Ok(42) }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_failed_run_abandons_blocking_work() {
        let start = Instant::now();
        let result: Result<()> = block_on_run(async {
            let _render = tokio::task::spawn_blocking(|| std::thread::sleep(Duration::from_secs(10)));
            anyhow::bail!("worker unit failed")
        });

        assert!(result.is_err());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
