use std::time::Duration;

const MIN_TICK: Duration = Duration::from_millis(10);
const MAX_TICK: Duration = Duration::from_secs(1);
const MILLIS_PER_SEC: u64 = 1000;

/// Fixed-window wave sizing for stress runs.
///
/// Each tick releases `current_rps * tick` request tokens. The fractional
/// part carries to the next tick so the long-run rate matches the target.
/// During ramp-up the rate rises linearly from zero to the target.
#[derive(Debug, Clone)]
pub struct WavePlanner {
    target_rps: u64,
    ramp_up: Duration,
    tick: Duration,
    remainder: u64,
}

impl WavePlanner {
    #[must_use]
    pub fn new(target_rps: u64, ramp_up: Duration) -> Self {
        let target_rps = target_rps.max(1);
        let tick = Duration::from_millis(MILLIS_PER_SEC.checked_div(target_rps).unwrap_or(0))
            .clamp(MIN_TICK, MAX_TICK);
        Self {
            target_rps,
            ramp_up,
            tick,
            remainder: 0,
        }
    }

    #[must_use]
    pub const fn tick(&self) -> Duration {
        self.tick
    }

    #[must_use]
    pub fn is_ramping(&self, elapsed: Duration) -> bool {
        elapsed < self.ramp_up
    }

    #[must_use]
    pub fn current_rps(&self, elapsed: Duration) -> u64 {
        if !self.is_ramping(elapsed) {
            return self.target_rps;
        }
        let ramp_ms = self.ramp_up.as_millis().max(1);
        let step = u128::from(self.target_rps)
            .saturating_mul(elapsed.as_millis())
            .checked_div(ramp_ms)
            .unwrap_or(0);
        u64::try_from(step).unwrap_or(self.target_rps)
    }

    /// Tokens released for the tick starting at `elapsed`.
    pub fn next_tokens(&mut self, elapsed: Duration) -> usize {
        let rps = self.current_rps(elapsed);
        let tick_ms = u64::try_from(self.tick.as_millis()).unwrap_or(MILLIS_PER_SEC);
        let budget = rps.saturating_mul(tick_ms).saturating_add(self.remainder);
        let (tokens, remainder) = div_mod_u64(budget, MILLIS_PER_SEC);
        self.remainder = remainder;
        usize::try_from(tokens).unwrap_or(usize::MAX)
    }
}

const fn div_mod_u64(value: u64, divisor: u64) -> (u64, u64) {
    match (value.checked_div(divisor), value.checked_rem(divisor)) {
        (Some(quotient), Some(remainder)) => (quotient, remainder),
        _ => (0, 0),
    }
}
