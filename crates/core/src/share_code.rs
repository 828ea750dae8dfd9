//! Short codes used to hand a quiz to other learners out of band.

use std::fmt;
use thiserror::Error;

use crate::model::QuizId;

pub const SHARE_CODE_LEN: usize = 6;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const STRIDE: u64 = 17;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShareCodeError {
    #[error("share code must be 6 characters, got {0}")]
    InvalidLength(usize),

    #[error("share code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShareCode(String);

impl ShareCode {
    /// Derive the code for `quiz_id`.
    ///
    /// The seed is the quiz id's leading decimal digits. Ids without a
    /// non-zero numeric prefix (UUIDs starting with a letter, for example)
    /// use `fallback_seed` instead, typically the creation time in millis.
    #[must_use]
    pub fn derive(quiz_id: &QuizId, fallback_seed: u64) -> Self {
        let seed = numeric_prefix(quiz_id.as_str())
            .filter(|seed| *seed != 0)
            .unwrap_or(fallback_seed);

        let code = (0..SHARE_CODE_LEN as u64)
            .map(|i| {
                let idx = seed.wrapping_add(i * STRIDE) % ALPHABET.len() as u64;
                char::from(ALPHABET[idx as usize])
            })
            .collect();
        Self(code)
    }

    /// Parse user input, ignoring surrounding whitespace and case.
    ///
    /// # Errors
    ///
    /// Returns `ShareCodeError` if the input is not six alphanumeric characters.
    pub fn parse(raw: &str) -> Result<Self, ShareCodeError> {
        let code = raw.trim().to_ascii_uppercase();
        let len = code.chars().count();
        if len != SHARE_CODE_LEN {
            return Err(ShareCodeError::InvalidLength(len));
        }
        if let Some(bad) = code.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(ShareCodeError::InvalidCharacter(bad));
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn numeric_prefix(s: &str) -> Option<u64> {
    let digits: Vec<u64> = s
        .trim_start()
        .chars()
        .map_while(|c| c.to_digit(10))
        .map(u64::from)
        .collect();
    if digits.is_empty() {
        return None;
    }
    Some(
        digits
            .into_iter()
            .fold(0_u64, |acc, d| acc.wrapping_mul(10).wrapping_add(d)),
    )
}
