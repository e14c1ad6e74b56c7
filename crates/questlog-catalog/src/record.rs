//! Game record model

use crate::{CatalogError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Highest rating a game can receive
pub const MAX_RATING: u8 = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A game in the catalog
///
/// Serialized with camelCase keys; this is both the export format and the
/// shape accepted on import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: i64,
    pub title: String,
    /// Normalized cover art as a `data:` URI
    pub cover: String,
    /// Completion date, `None` while the game is unfinished
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub play_date: Option<NaiveDate>,
    pub release_date: NaiveDate,
    pub platform: String,
    #[serde(deserialize_with = "deserialize_rating")]
    pub rating: u8,
    #[serde(default)]
    pub review: String,
}

impl GameRecord {
    /// Whether the game has a completion date
    pub fn is_finished(&self) -> bool {
        self.play_date.is_some()
    }

    /// Year the game was completed
    pub fn completion_year(&self) -> Option<i32> {
        self.play_date.map(|date| date.year())
    }
}

/// User-editable fields of a record, as entered
///
/// Dates are `YYYY-MM-DD` strings; an empty `play_date` marks the game as
/// unfinished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFields {
    pub title: String,
    pub platform: String,
    pub release_date: String,
    pub play_date: String,
    pub rating: i64,
    pub review: String,
}

impl GameFields {
    /// Fields pre-filled from an existing record, for editing
    pub fn from_record(record: &GameRecord) -> Self {
        Self {
            title: record.title.clone(),
            platform: record.platform.clone(),
            release_date: record.release_date.format(DATE_FORMAT).to_string(),
            play_date: record
                .play_date
                .map(|date| date.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            rating: i64::from(record.rating),
            review: record.review.clone(),
        }
    }

    /// Check required fields and parse dates
    pub(crate) fn validate(&self) -> Result<ValidFields> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(CatalogError::Validation("title is required".to_string()));
        }

        let platform = self.platform.trim();
        if platform.is_empty() {
            return Err(CatalogError::Validation("platform is required".to_string()));
        }

        if self.release_date.trim().is_empty() {
            return Err(CatalogError::Validation("release date is required".to_string()));
        }
        let release_date = parse_date("release date", &self.release_date)?;

        let play_date = if self.play_date.trim().is_empty() {
            None
        } else {
            Some(parse_date("play date", &self.play_date)?)
        };

        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|rating| *rating <= MAX_RATING)
            .ok_or_else(|| {
                CatalogError::Validation(format!(
                    "rating must be between 0 and {MAX_RATING}, got {}",
                    self.rating
                ))
            })?;

        Ok(ValidFields {
            title: title.to_string(),
            platform: platform.to_string(),
            release_date,
            play_date,
            rating,
            review: self.review.clone(),
        })
    }
}

/// Fields that passed validation
#[derive(Debug, Clone)]
pub(crate) struct ValidFields {
    title: String,
    platform: String,
    release_date: NaiveDate,
    play_date: Option<NaiveDate>,
    rating: u8,
    review: String,
}

impl ValidFields {
    pub(crate) fn into_record(self, id: i64, cover: String) -> GameRecord {
        GameRecord {
            id,
            title: self.title,
            cover,
            play_date: self.play_date,
            release_date: self.release_date,
            platform: self.platform,
            rating: self.rating,
            review: self.review,
        }
    }

    /// Overwrite every mutable field except the cover
    pub(crate) fn apply_to(self, record: &mut GameRecord) {
        record.title = self.title;
        record.platform = self.platform;
        record.release_date = self.release_date;
        record.play_date = self.play_date;
        record.rating = self.rating;
        record.review = self.review;
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        CatalogError::Validation(format!("{field} must be a YYYY-MM-DD date, got {value:?}"))
    })
}

/// Accepts a date string, `""` or `null`
fn deserialize_optional_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(value) if !value.trim().is_empty() => NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Accepts a number or a numeric string; older exports stored ratings as text
fn deserialize_rating<'de, D>(deserializer: D) -> std::result::Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Rating {
        Number(u8),
        Text(String),
    }

    match Rating::deserialize(deserializer)? {
        Rating::Number(rating) => Ok(rating),
        Rating::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid rating {text:?}"))),
    }
}
