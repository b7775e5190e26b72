use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use color_eyre::Result;
use tracing::{info, warn};

use crate::entry::JournalEntry;
use crate::photos;

pub const JOURNAL_FILE: &str = "journal.json";

/// The authoritative in-memory collection of entries plus its disk mirror.
///
/// The file is a single JSON array rewritten wholesale on every `save`; the
/// write is deliberately not transactional. All mutation happens on the main
/// task, so there is no interior locking.
pub struct JournalStore {
    entries: Vec<JournalEntry>,
    data_dir: PathBuf,
}

impl JournalStore {
    /// Read the journal file if it exists; an absent file starts an empty
    /// collection, while a file that cannot be decoded is a hard error with
    /// no recovery path.
    pub fn load(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let path = data_dir.join(JOURNAL_FILE);
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)?
        } else {
            Vec::new()
        };
        Ok(JournalStore { entries, data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(JOURNAL_FILE)
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Append to the end of the collection. Ids are generated by the caller
    /// and are not checked for collisions.
    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Serialize the whole collection over the journal file.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let serialized = serde_json::to_string(&self.entries)?;
        fs::write(self.journal_path(), serialized)?;
        Ok(())
    }

    /// Remove the journal file, sweep the photo files, and clear the
    /// in-memory collection. Partial failure is logged, not rolled back, and
    /// a repeat call on an already-empty store succeeds.
    pub fn delete_all(&mut self) {
        let path = self.journal_path();
        match fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "journal file deleted"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not remove journal file");
            }
        }
        photos::delete_photos(&self.data_dir);
        self.entries.clear();
    }

    /// Case-insensitive substring match on the note text.
    // TODO: Add ability to filter by the `tags` field as well.
    pub fn search(&self, query: &str) -> Vec<JournalEntry> {
        let needle = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                entry
                    .note
                    .as_ref()
                    .is_some_and(|note| note.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub fn entries_on_day(&self, day: NaiveDate) -> Vec<JournalEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.is_on_day(day))
            .cloned()
            .collect()
    }

    /// Entries grouped by month, newest first. Sorting by date descending
    /// makes each month's entries contiguous, so one pass collects them into
    /// sections ordered by each section's most recent entry.
    pub fn monthly_sections(&self) -> Vec<(String, Vec<JournalEntry>)> {
        let mut sorted = self.entries.clone();
        sorted.sort_by(|a, b| b.date.cmp(&a.date));

        let mut sections: Vec<(String, Vec<JournalEntry>)> = Vec::new();
        for entry in sorted {
            let month = entry.month_key();
            match sections.last_mut() {
                Some((current, items)) if *current == month => items.push(entry),
                _ => sections.push((month, vec![entry])),
            }
        }
        sections
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;

    fn entry(note: &str, y: i32, m: u32, d: u32, h: u32) -> JournalEntry {
        let date = Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap();
        JournalEntry::new(Uuid::new_v4(), Some(note.to_string()), date)
    }

    #[test]
    fn load_without_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::load(dir.path()).unwrap();
        assert!(store.entries().is_empty());
    }

    #[test]
    fn load_rejects_an_undecodable_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(JOURNAL_FILE), "not json at all {").unwrap();
        assert!(JournalStore::load(dir.path()).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        let mut first = entry("coffee with sam", 2023, 5, 2, 9);
        first.tags = Some(vec!["friends".to_string()]);
        first.latitude = Some(40.0);
        first.longitude = Some(-105.0);
        store.append(first);
        store.append(entry("quiet day", 2023, 5, 3, 20));
        store.save().unwrap();

        let reloaded = JournalStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.entries(), store.entries());
    }

    #[test]
    fn empty_collection_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::load(dir.path()).unwrap();
        store.save().unwrap();

        let reloaded = JournalStore::load(dir.path()).unwrap();
        assert!(reloaded.entries().is_empty());
    }

    #[test]
    fn save_rewrites_the_file_wholesale() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("one", 2023, 5, 2, 9));
        store.save().unwrap();
        store.append(entry("two", 2023, 5, 2, 10));
        store.save().unwrap();

        let raw = fs::read_to_string(store.journal_path()).unwrap();
        let parsed: Vec<JournalEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn delete_all_clears_file_photos_and_memory() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        let id = Uuid::new_v4();
        let mut with_photo = entry("beach", 2023, 7, 4, 12);
        with_photo.image_path = Some(crate::photos::photo_name(id));
        store.append(with_photo);
        store.save().unwrap();
        fs::write(dir.path().join(crate::photos::photo_name(id)), b"x").unwrap();

        store.delete_all();

        assert!(store.entries().is_empty());
        assert!(!store.journal_path().exists());
        assert!(!dir.path().join(crate::photos::photo_name(id)).exists());
    }

    #[test]
    fn delete_all_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("soon gone", 2023, 5, 2, 9));
        store.save().unwrap();

        store.delete_all();
        store.delete_all();

        assert!(store.entries().is_empty());
        assert!(!store.journal_path().exists());
    }

    #[test]
    fn search_matches_note_substring_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("Hiked the Flatirons", 2023, 5, 2, 9));
        store.append(entry("groceries", 2023, 5, 3, 9));
        let mut no_note = entry("", 2023, 5, 4, 9);
        no_note.note = None;
        store.append(no_note);

        let hits = store.search("flatirons");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].note.as_deref(), Some("Hiked the Flatirons"));
        assert!(store.search("FLAT").len() == 1);
        assert!(store.search("nothing like this").is_empty());
    }

    #[test]
    fn entries_on_day_ignores_time_of_day() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("early", 2023, 5, 2, 0));
        store.append(entry("late", 2023, 5, 2, 23));
        store.append(entry("before", 2023, 5, 1, 23));
        store.append(entry("after", 2023, 5, 3, 0));

        let day = NaiveDate::from_ymd_opt(2023, 5, 2).unwrap();
        let hits = store.entries_on_day(day);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn monthly_sections_place_each_entry_once_newest_first() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("april walk", 2023, 4, 10, 9));
        store.append(entry("late may", 2023, 5, 28, 9));
        store.append(entry("early may", 2023, 5, 2, 9));
        store.append(entry("march", 2023, 3, 15, 9));

        let sections = store.monthly_sections();
        let titles: Vec<&str> = sections.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(titles, vec!["May 2023", "April 2023", "March 2023"]);
        assert_eq!(sections[0].1.len(), 2);
        assert_eq!(sections[0].1[0].note.as_deref(), Some("late may"));

        let total: usize = sections.iter().map(|(_, items)| items.len()).sum();
        assert_eq!(total, store.entries().len());
    }

    #[test]
    fn months_in_different_years_are_separate_sections() {
        let dir = TempDir::new().unwrap();
        let mut store = JournalStore::load(dir.path()).unwrap();
        store.append(entry("this year", 2024, 5, 2, 9));
        store.append(entry("last year", 2023, 5, 2, 9));

        let sections = store.monthly_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "May 2024");
        assert_eq!(sections[1].0, "May 2023");
    }
}
