//! Result hand-off to the protocol handler.
//!
//! A finished [`InputSession`](crate::session::InputSession) yields an
//! [`Outcome`]. The protocol handler that started the prompt keeps a
//! [`ResponseSlot`]; [`ResponseSlot::deliver`] fills it in and produces the
//! status code the handler reports back to its caller.

use std::fmt;

use secrecy::SecretString;

/// Status code: the user entered a PIN or answered "yes".
pub const STATUS_OK: i32 = 1;

/// Status code: cancelled, refused, or timed out.
pub const STATUS_NOT_OK: i32 = 0;

/// How a session ended.
pub enum Outcome {
    /// Password mode, accepted. The secret moves to the caller.
    Pin(SecretString),
    /// Confirm mode, answered.
    Confirmed(bool),
    /// Escape, end of input, or a session dropped while active.
    Canceled,
    /// The watchdog fired first.
    TimedOut,
}

impl Outcome {
    /// Whether the caller got what it asked for.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Pin(_) | Outcome::Confirmed(true))
    }
}

// Manual Debug implementation to avoid exposing the PIN
impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pin(_) => f.write_str("Pin([REDACTED])"),
            Outcome::Confirmed(answer) => f.debug_tuple("Confirmed").field(answer).finish(),
            Outcome::Canceled => f.write_str("Canceled"),
            Outcome::TimedOut => f.write_str("TimedOut"),
        }
    }
}

/// Where the protocol handler reads the session result from.
#[derive(Default)]
pub struct ResponseSlot {
    /// The secret, set only when a PIN was accepted.
    pub pin: Option<SecretString>,
    /// Whether a confirmation was answered with yes.
    pub confirmed: bool,
    /// The session was cancelled (also set on timeout).
    pub canceled: bool,
    /// The watchdog fired.
    pub timed_out: bool,
}

impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `outcome` and return the status code for the caller.
    ///
    /// Returns [`STATUS_OK`] for an accepted PIN or a "yes" answer and
    /// [`STATUS_NOT_OK`] for everything else.
    pub fn deliver(&mut self, outcome: Outcome) -> i32 {
        let status = if outcome.is_success() {
            STATUS_OK
        } else {
            STATUS_NOT_OK
        };

        match outcome {
            Outcome::Pin(secret) => self.pin = Some(secret),
            Outcome::Confirmed(answer) => self.confirmed = answer,
            Outcome::Canceled => self.canceled = true,
            Outcome::TimedOut => {
                self.canceled = true;
                self.timed_out = true;
            }
        }
        status
    }
}

// Manual Debug implementation to avoid exposing the PIN
impl fmt::Debug for ResponseSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSlot")
            .field("pin", &self.pin.as_ref().map(|_| "[REDACTED]"))
            .field("confirmed", &self.confirmed)
            .field("canceled", &self.canceled)
            .field("timed_out", &self.timed_out)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn pin_is_delivered() {
        let mut slot = ResponseSlot::new();
        let status = slot.deliver(Outcome::Pin(SecretString::from("1234".to_string())));

        assert_eq!(status, STATUS_OK);
        assert_eq!(slot.pin.as_ref().unwrap().expose_secret(), "1234");
        assert!(!slot.canceled);
    }

    #[test]
    fn confirmation_answers() {
        let mut yes = ResponseSlot::new();
        assert_eq!(yes.deliver(Outcome::Confirmed(true)), STATUS_OK);
        assert!(yes.confirmed);

        let mut no = ResponseSlot::new();
        assert_eq!(no.deliver(Outcome::Confirmed(false)), STATUS_NOT_OK);
        assert!(!no.confirmed);
        assert!(!no.canceled);
    }

    #[test]
    fn cancel_and_timeout_are_distinguishable() {
        let mut canceled = ResponseSlot::new();
        assert_eq!(canceled.deliver(Outcome::Canceled), STATUS_NOT_OK);
        assert!(canceled.canceled);
        assert!(!canceled.timed_out);

        let mut timed_out = ResponseSlot::new();
        assert_eq!(timed_out.deliver(Outcome::TimedOut), STATUS_NOT_OK);
        assert!(timed_out.canceled);
        assert!(timed_out.timed_out);
        assert!(timed_out.pin.is_none());
    }

    #[test]
    fn debug_is_redacted() {
        let mut slot = ResponseSlot::new();
        slot.deliver(Outcome::Pin(SecretString::from("hunter2".to_string())));
        let debug_output = format!("{:?}", slot);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));

        let outcome = Outcome::Pin(SecretString::from("hunter2".to_string()));
        assert!(!format!("{:?}", outcome).contains("hunter2"));
    }
}
