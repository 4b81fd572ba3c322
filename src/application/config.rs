use chrono::{FixedOffset, Offset, Utc};
use thiserror::Error;

/// Runtime settings for the account services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Offset used to decide which calendar day an operation belongs to
    pub utc_offset: FixedOffset,
}

impl Default for Config {
    fn default() -> Self {
        Self { utc_offset: utc() }
    }
}

impl Config {
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid UTC offset '{0}', expected a value like '-03:00' or 'Z'")]
pub struct ParseOffsetError(String);

/// Parse a UTC offset such as "+05:30", "-03:00", "-0300", "Z" or "UTC".
pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, ParseOffsetError> {
    let trimmed = input.trim();
    let invalid = || ParseOffsetError(trimmed.to_string());

    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(utc());
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };

    if hours.is_empty() || !hours.chars().all(|c| c.is_ascii_digit())
        || minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn utc() -> FixedOffset {
    Utc.fix()
}
