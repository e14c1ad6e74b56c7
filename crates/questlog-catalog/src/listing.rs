//! Filtering, ordering and filter options for record listings

use crate::GameRecord;
use std::collections::BTreeSet;

/// Listing filter
///
/// `None` for `year` or `platform` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Completion year
    pub year: Option<i32>,
    pub platform: Option<String>,
    /// Include games without a completion date
    pub show_unfinished: bool,
}

impl ListFilter {
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_unfinished(mut self, show_unfinished: bool) -> Self {
        self.show_unfinished = show_unfinished;
        self
    }

    /// Whether `record` belongs in the listing
    ///
    /// Unfinished games ignore the year filter and only appear when
    /// `show_unfinished` is set.
    pub fn matches(&self, record: &GameRecord) -> bool {
        let platform_match = self
            .platform
            .as_deref()
            .is_none_or(|platform| record.platform == platform);

        let date_match = match record.completion_year() {
            Some(year) => self.year.is_none_or(|selected| selected == year),
            None => self.show_unfinished,
        };

        platform_match && date_match
    }
}

/// Keep matching records, unfinished games last
pub fn apply_filter(records: Vec<GameRecord>, filter: &ListFilter) -> Vec<GameRecord> {
    let mut filtered: Vec<GameRecord> = records
        .into_iter()
        .filter(|record| filter.matches(record))
        .collect();
    sort_unfinished_last(&mut filtered);
    filtered
}

/// Stable sort moving records without a completion date to the end
pub fn sort_unfinished_last(records: &mut [GameRecord]) {
    records.sort_by_key(|record| !record.is_finished());
}

/// Values available to populate listing filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub years: Vec<i32>,
    pub platforms: Vec<String>,
}

impl FilterOptions {
    pub fn from_records(records: &[GameRecord]) -> Self {
        Self {
            years: distinct_years(records),
            platforms: distinct_platforms(records),
        }
    }
}

/// Completion years present in `records`, newest first
pub fn distinct_years(records: &[GameRecord]) -> Vec<i32> {
    let years: BTreeSet<i32> = records.iter().filter_map(GameRecord::completion_year).collect();
    years.into_iter().rev().collect()
}

/// Platforms present in `records`, sorted
pub fn distinct_platforms(records: &[GameRecord]) -> Vec<String> {
    let platforms: BTreeSet<&str> = records.iter().map(|record| record.platform.as_str()).collect();
    platforms.into_iter().map(str::to_string).collect()
}
