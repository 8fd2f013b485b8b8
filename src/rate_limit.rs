use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-email limit on reset requests, fixed window.
pub struct ResetRequestLimiter {
    /// email -> (request_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl ResetRequestLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Count a request for `email`. Returns Err with retry-after seconds once
    /// the limit for the current window is used up.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        let now = Instant::now();

        let mut entry = self.entries.entry(email.to_lowercase()).or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove stale entries older than the given duration.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, start)| now.duration_since(*start) < max_age);
    }

    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

impl Default for ResetRequestLimiter {
    /// 5 requests per email per hour.
    fn default() -> Self {
        Self::new(5, Duration::from_secs(60 * 60))
    }
}
