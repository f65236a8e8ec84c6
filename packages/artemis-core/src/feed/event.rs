//! A single message received from the game server.

use std::fmt;

/// One parsed `(timestamp, message, value)` unit from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    timestamp: f64,
    message: String,
    value: i64,
}

impl Event {
    pub fn new(timestamp: f64, message: impl Into<String>, value: i64) -> Self {
        Self {
            timestamp,
            message: message.into(),
            value,
        }
    }

    /// Game clock timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Message name, e.g. `RED_ALERT`
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({}, {}, {})", self.timestamp, self.message, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let event = Event::new(1.5, "RED_ALERT", 1);
        assert_eq!(event.to_string(), "Event(1.5, RED_ALERT, 1)");
    }

    #[test]
    fn test_accessors() {
        let event = Event::new(0.0, "BEAM_FIRED", -3);
        assert_eq!(event.timestamp(), 0.0);
        assert_eq!(event.message(), "BEAM_FIRED");
        assert_eq!(event.value(), -3);
    }
}
