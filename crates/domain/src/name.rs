use derive_more::{AsRef, Display};

use crate::ValidationError;

/// Trimmed, non-empty display name of a user, exercise or training plan.
#[derive(AsRef, Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    pub fn new(name: &str) -> Result<Self, NameError> {
        let trimmed_name = name.trim();

        if trimmed_name.is_empty() {
            return Err(NameError::Empty);
        }

        let len = trimmed_name.chars().count();

        if len > 64 {
            return Err(NameError::TooLong(len));
        }

        Ok(Name(trimmed_name.to_string()))
    }

    /// Validate `name` as the value of the form field `field`.
    pub fn parse(field: &str, name: &str) -> Result<Self, ValidationError> {
        Name::new(name).map_err(|err| match err {
            NameError::Empty => ValidationError::Empty(field.to_string()),
            NameError::TooLong(_) => ValidationError::invalid(field, err),
        })
    }

    /// Case-insensitive substring match, an empty search matches everything.
    #[must_use]
    pub fn contains(&self, search: &str) -> bool {
        self.0.to_lowercase().contains(&search.trim().to_lowercase())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum NameError {
    #[error("Name must not be empty")]
    Empty,
    #[error("Name must be 64 characters or fewer ({0} > 64)")]
    TooLong(usize),
}
