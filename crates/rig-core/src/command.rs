use std::marker::PhantomData;
use thiserror::Error;

pub const MIN_COMMAND_RPM: i64 = 100;
pub const MAX_COMMAND_RPM: i64 = 1200;

#[derive(Debug, Clone, Copy)]
pub struct Unvalidated;

#[derive(Debug, Clone, Copy)]
pub struct Validated;

/// Speed command as received from the host, in motor RPM.
#[derive(Debug, Clone, Copy)]
pub struct SpeedCommand<State = Unvalidated> {
    rpm: i64,
    _state: PhantomData<State>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandRejection {
    #[error("no integer in command input")]
    NotANumber,
    #[error("speed {requested} outside [{min}, {max}]")]
    OutOfRange { requested: i64, min: i64, max: i64 },
}

impl SpeedCommand<Unvalidated> {
    pub fn new(rpm: i64) -> Self {
        Self {
            rpm,
            _state: PhantomData,
        }
    }

    /// Pull the first integer out of raw serial input.
    pub fn parse(raw: &str) -> Result<Self, CommandRejection> {
        parse_leading_int(raw)
            .map(Self::new)
            .ok_or(CommandRejection::NotANumber)
    }

    pub fn validate(self) -> Result<SpeedCommand<Validated>, CommandRejection> {
        if !(MIN_COMMAND_RPM..=MAX_COMMAND_RPM).contains(&self.rpm) {
            return Err(CommandRejection::OutOfRange {
                requested: self.rpm,
                min: MIN_COMMAND_RPM,
                max: MAX_COMMAND_RPM,
            });
        }
        Ok(SpeedCommand {
            rpm: self.rpm,
            _state: PhantomData,
        })
    }
}

impl SpeedCommand<Validated> {
    pub fn rpm(&self) -> u32 {
        // Range check guarantees this fits.
        self.rpm as u32
    }
}

/// Skips bytes until a digit or minus sign, then reads one signed integer.
/// Returns `None` when no digits follow.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let bytes = raw.as_bytes();
    let start = bytes
        .iter()
        .position(|b| b.is_ascii_digit() || *b == b'-')?;

    let mut negative = false;
    let mut idx = start;
    if bytes[idx] == b'-' {
        negative = true;
        idx += 1;
    }

    let mut value: i64 = 0;
    let mut digits = 0usize;
    while let Some(b) = bytes.get(idx).filter(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
        digits += 1;
        idx += 1;
    }

    if digits == 0 {
        return None;
    }
    Some(if negative { -value } else { value })
}
