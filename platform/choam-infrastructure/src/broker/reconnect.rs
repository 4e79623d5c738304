use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::Span;

/// Bounded exponential backoff: attempt `n` waits `initial_delay * 2^(n-1)`, capped at
/// `max_delay`, plus up to 10% jitter (still capped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Result<Self, String> {
        if max_attempts == 0 {
            return Err("reconnect max_attempts must be > 0".to_string());
        }
        if initial_delay.is_zero() || initial_delay > max_delay {
            return Err(format!(
                "reconnect delays must satisfy 0 < initial <= max (got {:?} / {:?})",
                initial_delay, max_delay
            ));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            max_delay,
        })
    }

    /// Delay after the failed attempt `attempt` (1-based), before jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_delay(attempt);
        let jitter_ms = (base.as_millis() as u64) / 10;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        (base + Duration::from_millis(jitter)).min(self.max_delay)
    }

    /// Runs `op` until it succeeds or `max_attempts` is spent, sleeping between attempts.
    pub async fn retry<T, F, Fut>(&self, what: &str, span: &Span, mut op: F) -> Result<T, String>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            metrics::counter!("choam.broker.connect_attempts").increment(1);
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt >= self.max_attempts {
                metrics::counter!("choam.broker.connect_failures").increment(1);
                span.in_scope(|| {
                    tracing::error!(attempt, error = %err, "{what} failed; giving up")
                });
                return Err(format!("{what} failed after {attempt} attempts: {err}"));
            }
            let delay = self.jittered_delay(attempt);
            span.in_scope(|| {
                tracing::warn!(
                    attempt,
                    max_attempts = self.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "{what} failed; retrying"
                )
            });
            tokio::time::sleep(delay).await;
        }
    }
}
