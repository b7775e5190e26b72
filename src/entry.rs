use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One journal record: free text plus an optional photo and its metadata.
///
/// `date` is the user-assigned entry date (back-datable); `created_at` is
/// when the record itself was made. `remote_record_id` / `remote_change_tag`
/// are only ever present when they arrive through a decode of previously
/// stored data; the push path does not write them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub synced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub created_at: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_change_tag: Option<String>,
    pub date: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl JournalEntry {
    pub fn new(id: Uuid, note: Option<String>, date: DateTime<Local>) -> Self {
        JournalEntry {
            id,
            synced: false,
            note,
            image_path: None,
            created_at: Local::now(),
            remote_record_id: None,
            remote_change_tag: None,
            date,
            latitude: None,
            longitude: None,
            tags: None,
        }
    }

    /// Calendar-day comparison; time of day is irrelevant.
    pub fn is_on_day(&self, day: NaiveDate) -> bool {
        self.date.date_naive() == day
    }

    /// Grouping key for the month list, e.g. "May 2023".
    pub fn month_key(&self) -> String {
        self.date.format("%B %Y").to_string()
    }
}
