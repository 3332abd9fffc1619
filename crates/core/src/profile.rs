//! The birth profile a user supplies when a session starts.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Language the assistant answers in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "hi")]
    Hindi,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
        }
    }
}

/// Birth details of the person being read for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,

    /// `YYYY-MM-DD`
    pub birth_date: String,

    /// `HH:MM`, 24-hour clock
    pub birth_time: String,

    /// Free text, resolved by the geocoder
    pub birth_place: String,

    #[serde(default, alias = "preffered_language")]
    pub preferred_language: Language,
}

impl UserProfile {
    /// Check every field; returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if self.birth_place.trim().is_empty() {
            return Err(ValidationError::EmptyField("birth_place"));
        }
        self.parsed_date()?;
        self.parsed_time()?;
        Ok(())
    }

    pub fn parsed_date(&self) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(self.birth_date.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::BirthDate(self.birth_date.clone()))
    }

    pub fn parsed_time(&self) -> Result<NaiveTime, ValidationError> {
        NaiveTime::parse_from_str(self.birth_time.trim(), "%H:%M")
            .map_err(|_| ValidationError::BirthTime(self.birth_time.clone()))
    }
}
