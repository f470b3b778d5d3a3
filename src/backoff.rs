//! Randomized exponential backoff between reconnect attempts.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest exponent applied to the base delay.
pub const MAX_EXPONENT: u32 = 10;

/// Produces delays drawn uniformly from `[0, base * 2^n)`, where `n` grows by
/// one per call up to [`MAX_EXPONENT`].
///
/// With `integral` set, delays are whole multiples of one second.
#[derive(Debug)]
pub struct Delayer {
    base: Duration,
    integral: bool,
    max_exponent: u32,
    exponent: u32,
    rng: StdRng,
}

impl Delayer {
    pub fn new(base: Duration) -> Self {
        Self::from_rng(base, StdRng::from_entropy())
    }

    /// A deterministic delayer for tests.
    pub fn with_seed(base: Duration, seed: u64) -> Self {
        Self::from_rng(base, StdRng::seed_from_u64(seed))
    }

    fn from_rng(base: Duration, rng: StdRng) -> Self {
        Self {
            base,
            integral: false,
            max_exponent: MAX_EXPONENT,
            exponent: 0,
            rng,
        }
    }

    #[must_use]
    pub fn integral(mut self, integral: bool) -> Self {
        self.integral = integral;
        self
    }

    #[must_use]
    pub fn max_exponent(mut self, max_exponent: u32) -> Self {
        self.max_exponent = max_exponent;
        self
    }

    /// The exclusive upper bound of the next delay.
    pub fn upper_bound(&self) -> Duration {
        let exponent = (self.exponent + 1).min(self.max_exponent);
        self.base.saturating_mul(1 << exponent)
    }

    /// Draw the next delay and advance the exponent.
    pub fn next_delay(&mut self) -> Duration {
        let bound = self.upper_bound();
        self.exponent = (self.exponent + 1).min(self.max_exponent);

        if bound.is_zero() {
            return Duration::ZERO;
        }
        if self.integral {
            let secs = bound.as_secs().max(1);
            Duration::from_secs(self.rng.gen_range(0..secs))
        } else {
            Duration::from_secs_f64(self.rng.gen_range(0.0..bound.as_secs_f64()))
        }
    }

    /// Start over from the smallest bound.
    pub fn reset(&mut self) {
        self.exponent = 0;
    }

    /// Sleep for the next delay.
    pub async fn delay(&mut self) {
        let delay = self.next_delay();
        tracing::debug!(?delay, "backing off");
        tokio::time::sleep(delay).await;
    }
}
