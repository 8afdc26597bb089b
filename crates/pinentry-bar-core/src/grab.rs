//! Exclusive input acquisition.
//!
//! Without sole ownership of keyboard input another client could observe the
//! keystrokes, so acquisition is retried for a bounded time and exhausting
//! the bound is fatal.

use std::time::Duration;

use tracing::{debug, error, trace};

use crate::traits::InputGrabber;

/// Default number of grab attempts.
pub const DEFAULT_GRAB_ATTEMPTS: u32 = 1000;

/// Default pause between grab attempts.
pub const DEFAULT_GRAB_INTERVAL: Duration = Duration::from_millis(1);

/// Error type for exclusive input acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrabError {
    /// Another client kept input for the whole retry window.
    #[error("cannot grab keyboard after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Bounded retry policy for [`acquire_exclusive_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabPolicy {
    /// Maximum number of attempts (at least one is always made).
    pub attempts: u32,
    /// Pause after each failed attempt.
    pub interval: Duration,
}

impl Default for GrabPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_GRAB_ATTEMPTS,
            interval: DEFAULT_GRAB_INTERVAL,
        }
    }
}

/// Acquire exclusive input, retrying per `policy`.
///
/// Blocks the calling thread between attempts; this only runs while the
/// prompt is being set up. Returns the number of attempts it took.
///
/// # Errors
///
/// Returns [`GrabError::Exhausted`] when every attempt failed. Callers must
/// not go on to read a secret in that case.
pub fn acquire_exclusive_input<G: InputGrabber + ?Sized>(
    grabber: &mut G,
    policy: &GrabPolicy,
) -> Result<u32, GrabError> {
    let attempts = policy.attempts.max(1);

    for attempt in 1..=attempts {
        if grabber.try_grab() {
            debug!(attempt, "Exclusive input acquired");
            return Ok(attempt);
        }
        trace!(attempt, "Input grab failed, retrying");
        if attempt < attempts && !policy.interval.is_zero() {
            std::thread::sleep(policy.interval);
        }
    }

    error!(attempts, "Cannot acquire exclusive input");
    Err(GrabError::Exhausted { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGrabber;

    fn fast_policy(attempts: u32) -> GrabPolicy {
        GrabPolicy {
            attempts,
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn immediate_success_takes_one_attempt() {
        let mut grabber = MockGrabber::succeed_after(0);
        let used = acquire_exclusive_input(&mut grabber, &fast_policy(10)).unwrap();
        assert_eq!(used, 1);
        assert_eq!(grabber.attempts(), 1);
        assert!(grabber.is_grabbed());
    }

    #[test]
    fn retries_until_grab_succeeds() {
        let mut grabber = MockGrabber::succeed_after(5);
        let used = acquire_exclusive_input(&mut grabber, &fast_policy(10)).unwrap();
        assert_eq!(used, 6);
        assert_eq!(grabber.attempts(), 6);
    }

    #[test]
    fn exhausting_the_bound_is_an_error() {
        let mut grabber = MockGrabber::never();
        let result = acquire_exclusive_input(&mut grabber, &fast_policy(1000));
        assert_eq!(result, Err(GrabError::Exhausted { attempts: 1000 }));
        assert_eq!(grabber.attempts(), 1000);
        assert!(!grabber.is_grabbed());
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut grabber = MockGrabber::never();
        let result = acquire_exclusive_input(&mut grabber, &fast_policy(0));
        assert_eq!(result, Err(GrabError::Exhausted { attempts: 1 }));
        assert_eq!(grabber.attempts(), 1);
    }

    #[test]
    fn waits_between_attempts() {
        use std::time::Instant;

        let mut grabber = MockGrabber::succeed_after(3);
        let policy = GrabPolicy {
            attempts: 10,
            interval: Duration::from_millis(5),
        };
        let start = Instant::now();
        acquire_exclusive_input(&mut grabber, &policy).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn default_policy_is_about_one_second() {
        let policy = GrabPolicy::default();
        assert_eq!(policy.attempts, 1000);
        assert_eq!(policy.interval, Duration::from_millis(1));
    }

    #[test]
    fn grab_error_display() {
        assert_eq!(
            GrabError::Exhausted { attempts: 1000 }.to_string(),
            "cannot grab keyboard after 1000 attempts"
        );
    }
}
