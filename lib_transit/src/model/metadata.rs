use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Dataset-wide information shipped alongside the transit graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// When the dataset was produced by the importer.
    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,
    /// First day covered by the timetable.
    pub start_date: NaiveDate,
    /// Last day covered by the timetable (inclusive).
    pub end_date: NaiveDate,
    /// Free-form label of the feed the dataset was built from.
    #[serde(default)]
    pub dataset_source: String,
}

impl Metadata {
    /// Production period as a half-open UTC range `[start 00:00, end+1 00:00)`.
    pub fn production_period(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let begin = self.start_date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = self
            .end_date
            .succ_opt()
            .unwrap_or(self.end_date)
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        (begin, end)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            publication_date: None,
            start_date: NaiveDate::MIN,
            end_date: NaiveDate::MAX,
            dataset_source: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_period_includes_the_whole_last_day() {
        let meta = Metadata {
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            ..Default::default()
        };
        let (begin, end) = meta.production_period();
        assert_eq!(begin.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }
}
