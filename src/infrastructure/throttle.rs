//! Per-provider politeness delay.
//!
//! Wraps any [`SearchProvider`] with a governor limiter that allows one call
//! per configured period. Each provider gets its own limiter, so a slow
//! scrape backend never holds up a keyed API and vice versa.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{Candidate, Query, SearchProvider};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct ThrottledProvider<P: SearchProvider> {
    inner: P,
    /// `None` when the delay is zero
    limiter: Option<Arc<DefaultRateLimiter>>,
}

impl<P: SearchProvider> ThrottledProvider<P> {
    /// Consecutive searches through this provider start at least `delay` apart.
    pub fn new(provider: P, delay: Duration) -> Self {
        Self {
            inner: provider,
            limiter: Quota::with_period(delay).map(|quota| Arc::new(RateLimiter::direct(quota))),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: SearchProvider> SearchProvider for ThrottledProvider<P> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn page_cursors(&self) -> &[u32] {
        self.inner.page_cursors()
    }

    async fn search(&self, query: &Query, cursor: u32) -> Vec<Candidate> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.inner.search(query, cursor).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    struct Counting(AtomicU32);

    #[async_trait]
    impl SearchProvider for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn page_cursors(&self) -> &[u32] {
            &[1]
        }

        async fn search(&self, _query: &Query, cursor: u32) -> Vec<Candidate> {
            self.0.fetch_add(1, Ordering::SeqCst);
            vec![Candidate::new("https://img.test/a.jpg".to_string(), "counting", cursor, 0)]
        }
    }

    #[tokio::test]
    async fn consecutive_searches_are_spaced() {
        let provider = ThrottledProvider::new(Counting(AtomicU32::new(0)), Duration::from_millis(80));
        let query = Query::build::<&str>("red mug", &[]);

        let started = Instant::now();
        for _ in 0..3 {
            assert_eq!(provider.search(&query, 1).await.len(), 1);
        }

        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(provider.inner().0.load(Ordering::SeqCst), 3);
        assert_eq!(provider.name(), "counting");
    }

    #[tokio::test]
    async fn zero_delay_does_not_wait() {
        let provider = ThrottledProvider::new(Counting(AtomicU32::new(0)), Duration::ZERO);
        let query = Query::build::<&str>("red mug", &[]);

        let started = Instant::now();
        for _ in 0..5 {
            provider.search(&query, 1).await;
        }
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
