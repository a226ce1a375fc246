/// Token-bucket rate limiter for outbound channel messages.
///
/// Each channel gets its own limiter. Callers `await` on `acquire()` before
/// sending; the call returns immediately when a token is available, or sleeps
/// until the next refill tick.
///
/// Default limits (conservative):
/// - WhatsApp bridge :  2 msg/s (wppconnect is touchy about bursts)
/// - Evolution API   :  5 msg/s
use once_cell::sync::Lazy;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub struct RateLimiter {
    /// Maximum tokens in the bucket (= burst capacity).
    capacity: u32,
    /// Current available tokens.
    tokens: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Last time tokens were refilled.
    last_refill: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, per_second: f64) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate: per_second,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity as f64);
        self.last_refill = now;
    }

    /// Try to consume one token. Returns the wait duration if none is available.
    fn try_consume(&mut self) -> Option<Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let needed = 1.0 - self.tokens;
            Some(Duration::from_secs_f64(needed / self.refill_rate))
        }
    }
}

/// Thread-safe wrapper around `RateLimiter`.
pub struct ChannelRateLimiter(Mutex<RateLimiter>);

impl ChannelRateLimiter {
    pub fn new(capacity: u32, per_second: f64) -> Self {
        Self(Mutex::new(RateLimiter::new(capacity, per_second)))
    }

    /// Acquire one send token, sleeping if necessary.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut inner = self.0.lock().await;
                inner.try_consume()
            };
            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d).await,
            }
        }
    }
}

static WHATSAPP_RL: Lazy<ChannelRateLimiter> = Lazy::new(|| ChannelRateLimiter::new(2, 2.0));
static EVOLUTION_RL: Lazy<ChannelRateLimiter> = Lazy::new(|| ChannelRateLimiter::new(5, 5.0));

pub fn whatsapp_limiter() -> &'static ChannelRateLimiter {
    &WHATSAPP_RL
}

pub fn evolution_limiter() -> &'static ChannelRateLimiter {
    &EVOLUTION_RL
}
