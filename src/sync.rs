use futures::future::join_all;
use tracing::{error, info};
use uuid::Uuid;

use crate::entry::JournalEntry;
use crate::remote::{RecordData, RecordLocation, RecordSubscription, RemoteError, RemoteStore, RECORD_TYPE};
use crate::store::JournalStore;

/// Outcome of one push pass. `attempted` counts every entry whose `synced`
/// flag was false, whether or not the remote accepted it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    pub attempted: usize,
    pub uploaded: usize,
    pub failed: usize,
}

/// Reconciles the local store with the remote record store. Holds the remote
/// behind [`RemoteStore`] so tests can inject a double.
pub struct SyncBridge<R: RemoteStore> {
    remote: R,
}

impl<R: RemoteStore> SyncBridge<R> {
    pub fn new(remote: R) -> Self {
        SyncBridge { remote }
    }

    /// Map an entry onto the remote record shape: identifier, date in string
    /// form, note, and a location only when both coordinates are present.
    pub fn record_for(entry: &JournalEntry) -> RecordData {
        RecordData {
            uuid: entry.id.to_string(),
            date: entry.date.to_rfc3339(),
            note: entry.note.clone(),
            location: match (entry.latitude, entry.longitude) {
                (Some(latitude), Some(longitude)) => {
                    Some(RecordLocation { latitude, longitude })
                }
                _ => None,
            },
        }
    }

    /// Submit every unsynced entry concurrently. Per-entry failures are
    /// logged and dropped; the entry stays unsynced and is resubmitted on the
    /// next pass.
    pub async fn push_unsynced(&self, store: &JournalStore) -> PushReport {
        let unsynced: Vec<&JournalEntry> =
            store.entries().iter().filter(|entry| !entry.synced).collect();
        let mut report = PushReport {
            attempted: unsynced.len(),
            ..PushReport::default()
        };

        let results = join_all(unsynced.into_iter().map(|entry| {
            let record = Self::record_for(entry);
            async move { (entry.id, self.remote.save_record(&record).await) }
        }))
        .await;

        for (id, result) in results {
            match result {
                Ok(saved) => {
                    info!(entry = %id, record = %saved.record_name, "journal record uploaded");
                    // TODO: write record_name/change_tag back onto the entry
                    // and flip `synced`; until then every pass re-uploads the
                    // whole journal.
                    report.uploaded += 1;
                }
                Err(err) => {
                    error!(entry = %id, error = %err, "upload failed; entry stays unsynced");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Query every remote record and report how many exist. The fetched
    /// records are logged, not merged into the local store.
    pub async fn pull_all(&self) -> usize {
        match self.remote.query_records(None).await {
            Ok(records) => {
                for record in &records {
                    info!(record = %record.record_name, "remote record available");
                }
                // TODO: construct local entries from the fetched records and
                // merge them into the store.
                records.len()
            }
            Err(err) => {
                error!(error = %err, "could not query remote records");
                0
            }
        }
    }

    /// Delete every remote record attributed to `owner`, then optionally the
    /// local journal too. Per-record failures are logged; there is no batch
    /// atomicity. Returns the number of records actually deleted.
    pub async fn delete_all_remote(
        &self,
        owner: &str,
        and_local: Option<&mut JournalStore>,
    ) -> usize {
        let records = match self.remote.query_records(Some(owner)).await {
            Ok(records) => records,
            Err(err) => {
                error!(owner, error = %err, "could not list records for deletion");
                return 0;
            }
        };

        let results = join_all(records.iter().map(|record| {
            let name = record.record_name.clone();
            async move { (name.clone(), self.remote.delete_record(&name).await) }
        }))
        .await;

        let mut deleted = 0;
        for (name, result) in results {
            match result {
                Ok(()) => {
                    info!(record = %name, "remote record deleted");
                    deleted += 1;
                }
                Err(err) => error!(record = %name, error = %err, "remote delete failed"),
            }
        }

        if let Some(store) = and_local {
            store.delete_all();
        }
        deleted
    }

    /// Install the standing create/update/delete subscription on journal
    /// records. Registration only; the silent notifications it produces are
    /// consumed elsewhere.
    pub async fn register_subscription(&self) {
        let subscription = RecordSubscription {
            id: format!("{}-journal", Uuid::new_v4()),
            record_type: RECORD_TYPE.to_string(),
            fires_on: vec![
                "create".to_string(),
                "update".to_string(),
                "delete".to_string(),
            ],
            content_available: true,
            desired_keys: vec!["note".to_string()],
        };
        match self.remote.save_subscription(&subscription).await {
            Ok(()) => info!(id = %subscription.id, "journal subscription set up"),
            Err(err) => error!(error = %err, "journal subscription failed"),
        }
    }

    pub async fn user_record_id(&self) -> Result<String, RemoteError> {
        self.remote.user_record_id().await
    }
}
