use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Mastery strictly below this value marks a weak topic.
pub const WEAKNESS_THRESHOLD: u8 = 60;

/// Mastery at or above this value marks a strong topic.
pub const STRENGTH_THRESHOLD: u8 = 80;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MasteryError {
    #[error("mastery must be within 0..=100, got {0}")]
    OutOfRange(u32),
}

/// Proficiency in a topic, as an integer percentage in `0..=100`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u8")]
pub struct Mastery(u8);

impl Mastery {
    pub const ZERO: Self = Self(0);
    pub const FULL: Self = Self(100);

    /// # Errors
    ///
    /// Returns `MasteryError::OutOfRange` for values above 100.
    pub fn new(value: u32) -> Result<Self, MasteryError> {
        match u8::try_from(value) {
            Ok(v) if v <= 100 => Ok(Self(v)),
            _ => Err(MasteryError::OutOfRange(value)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::FULL
    }

    #[must_use]
    pub fn is_weak(self) -> bool {
        self.0 < WEAKNESS_THRESHOLD
    }

    #[must_use]
    pub fn is_strong(self) -> bool {
        self.0 >= STRENGTH_THRESHOLD
    }

    /// Percentage of correct answers, rounded half up.
    ///
    /// `correct` is capped at `total`; an empty quiz scores zero.
    #[must_use]
    pub fn from_score(correct: usize, total: usize) -> Self {
        if total == 0 {
            return Self::ZERO;
        }
        let correct = correct.min(total) as u128;
        let total = total as u128;
        Self(round_half_up(correct * 100, total))
    }

    /// Rounded arithmetic mean; zero for an empty input.
    #[must_use]
    pub fn mean<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Mastery>,
    {
        let (sum, count) = values
            .into_iter()
            .fold((0_u128, 0_u128), |(sum, count), m| {
                (sum + u128::from(m.0), count + 1)
            });
        if count == 0 {
            return Self::ZERO;
        }
        Self(round_half_up(sum, count))
    }
}

// numerator / denominator <= 100 for every caller
#[allow(clippy::cast_possible_truncation)]
fn round_half_up(numerator: u128, denominator: u128) -> u8 {
    ((2 * numerator + denominator) / (2 * denominator)) as u8
}

impl TryFrom<u32> for Mastery {
    type Error = MasteryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Mastery> for u8 {
    fn from(value: Mastery) -> Self {
        value.0
    }
}

impl fmt::Display for Mastery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
