use std::future::Future;

use tokio::time::{sleep, Duration, Instant};

const BLOCK_ON_CONDITION_CHECK_FREQ: Duration = Duration::from_millis(10);

/// Wait until `f` returns `true`, failing the test if that takes longer than `timeout`.
pub(crate) async fn block_on<F, Fut>(f: F, timeout: Duration)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if f().await {
            break;
        }

        assert!(Instant::now().duration_since(start) < timeout, "Timed out waiting on desired condition");
        sleep(BLOCK_ON_CONDITION_CHECK_FREQ).await;
    }
}
