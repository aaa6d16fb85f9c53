//! Formatted chat lines relayed to room members.

use std::fmt;

use chrono::{DateTime, Local};

/// Display name used for senders that never registered.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Timestamp layout, brackets included.
const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";

/// One chat line as rendered to recipients: `[timestamp] sender: text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    pub timestamp: DateTime<Local>,
    pub sender: String,
    pub text: String,
}

impl ChatLine {
    /// Creates a line stamped with the current local time.
    ///
    /// A missing sender name falls back to [`UNKNOWN_SENDER`].
    pub fn now(sender: Option<&str>, text: impl Into<String>) -> Self {
        Self::at(Local::now(), sender, text)
    }

    /// Creates a line with an explicit timestamp.
    pub fn at(timestamp: DateTime<Local>, sender: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            sender: sender.unwrap_or(UNKNOWN_SENDER).to_string(),
            text: text.into(),
        }
    }
}

impl fmt::Display for ChatLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.sender,
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .unwrap()
    }

    #[test]
    fn test_chat_line_format() {
        let line = ChatLine::at(fixed_time(), Some("bob"), "hi");
        assert_eq!(line.to_string(), "[2024-03-09 14:05:07] bob: hi");
    }

    #[test]
    fn test_unknown_sender_fallback() {
        let line = ChatLine::at(fixed_time(), None, "hello");
        assert_eq!(line.sender, UNKNOWN_SENDER);
        assert_eq!(line.to_string(), "[2024-03-09 14:05:07] Unknown: hello");
    }

    #[test]
    fn test_now_stamps_current_time() {
        let before = Local::now();
        let line = ChatLine::now(Some("alice"), "x");
        assert!(line.timestamp >= before);
        assert!(line.to_string().ends_with("] alice: x"));
    }
}
