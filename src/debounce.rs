use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_timer::Delay;

// Supersession gate shared by every debounced call of one entry point.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    stamp: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            stamp: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    // Returns false when this call was superseded by a newer one while
    // waiting out the delay.
    pub async fn pass(&self) -> bool {
        let ticket = self.stamp.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            Delay::new(self.delay).await;
        }
        self.stamp.load(Ordering::SeqCst) == ticket
    }
}

/// Wraps an async function so that superseded calls resolve to `None`
/// instead of running.
pub fn debounce<A, F, Fut>(
    call: F,
    delay: Duration,
) -> impl Fn(A) -> Pin<Box<dyn Future<Output = Option<Fut::Output>> + Send>> + Clone
where
    A: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
{
    let call = Arc::new(call);
    let debouncer = Debouncer::new(delay);

    move |argument: A| {
        let call = call.clone();
        let debouncer = debouncer.clone();
        Box::pin(async move {
            if debouncer.pass().await {
                Some(call(argument).await)
            } else {
                None
            }
        })
    }
}
