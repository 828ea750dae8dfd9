use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Wire value for a question that has not been answered yet.
pub const UNANSWERED: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerSheetError {
    #[error("invalid answer value {value} at position {index}")]
    InvalidWireValue { index: usize, value: i64 },
}

/// One answer slot per question, in question order.
///
/// A slot is `None` until the learner picks an option. Selecting again
/// overwrites the previous choice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSheet {
    slots: Vec<Option<usize>>,
}

impl AnswerSheet {
    /// Creates a sheet with `len` unanswered slots.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Selected option for the question at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten()
    }

    /// Record `option` for the question at `index`.
    ///
    /// Returns `false` (and changes nothing) if `index` is out of range.
    pub fn set(&mut self, index: usize, option: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(option);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.slots.len() - self.unanswered_count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Positions of questions still unanswered.
    #[must_use]
    pub fn unanswered_positions(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_none().then_some(i))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.slots.iter().copied()
    }

    /// Integer form used in persisted progress (`-1` for unanswered).
    #[must_use]
    pub fn to_wire(&self) -> Vec<i64> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Some(option) => i64::try_from(*option).unwrap_or(i64::MAX),
                None => UNANSWERED,
            })
            .collect()
    }

    /// Parse the integer form.
    ///
    /// # Errors
    ///
    /// Returns `AnswerSheetError::InvalidWireValue` for any value below `-1`.
    pub fn from_wire(values: &[i64]) -> Result<Self, AnswerSheetError> {
        let slots = values
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if value == UNANSWERED {
                    Ok(None)
                } else {
                    usize::try_from(value)
                        .map(Some)
                        .map_err(|_| AnswerSheetError::InvalidWireValue { index, value })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slots })
    }
}

impl Serialize for AnswerSheet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnswerSheet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<i64>::deserialize(deserializer)?;
        AnswerSheet::from_wire(&values).map_err(serde::de::Error::custom)
    }
}
