//! Exponential-backoff parameters for re-establishing the `LISTEN`
//! connection after it drops.

use std::time::Duration;

/// No attempt waits less than this, whatever the configuration says.
pub const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Listener reconnect schedule. Defaults to 10s doubling up to 60s.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait before the first attempt of each outage.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth per failed attempt.
    pub multiplier: f64,
}

impl ReconnectConfig {
    /// Backoff doubling from `min` up to `max`, floored at
    /// [`MIN_RECONNECT_DELAY`].
    pub fn between(min: Duration, max: Duration) -> Self {
        let initial_delay = min.max(MIN_RECONNECT_DELAY);
        Self {
            initial_delay,
            max_delay: max.max(initial_delay),
            ..Default::default()
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

/// Delay to use after another failed attempt.
///
/// Never above `max_delay` and never below [`MIN_RECONNECT_DELAY`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.multiplier)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
        .max(MIN_RECONNECT_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        assert_eq!(next_delay(Duration::from_secs(10), &config), Duration::from_secs(20));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig::default();
        assert_eq!(next_delay(Duration::from_secs(40), &config), Duration::from_secs(60));
        assert_eq!(next_delay(Duration::from_secs(60), &config), Duration::from_secs(60));
    }

    #[test]
    fn between_keeps_doubling_multiplier() {
        let config = ReconnectConfig::between(Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(config.multiplier, 2.0);
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        let expected = [10, 20, 40, 60, 60];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[test]
    fn zero_minimum_still_backs_off() {
        let config = ReconnectConfig::between(Duration::ZERO, Duration::from_secs(60));
        assert_eq!(config.initial_delay, MIN_RECONNECT_DELAY);

        let mut delay = config.initial_delay;
        for _ in 0..10 {
            delay = next_delay(delay, &config);
            assert!(delay >= MIN_RECONNECT_DELAY);
        }
        assert_eq!(delay, Duration::from_secs(60));
    }

    #[test]
    fn zero_delay_is_floored() {
        let config = ReconnectConfig {
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        };
        assert_eq!(next_delay(Duration::ZERO, &config), MIN_RECONNECT_DELAY);
    }

    #[test]
    fn inverted_bounds_collapse_to_minimum() {
        let config = ReconnectConfig::between(Duration::from_secs(30), Duration::from_secs(5));
        assert_eq!(config.max_delay, Duration::from_secs(30));
    }
}
