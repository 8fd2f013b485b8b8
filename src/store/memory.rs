use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::{NewRecord, RecordId, RecordStorage, StoreError};

struct StoredRecord {
    email: String,
    expires_at: DateTime<Utc>,
}

/// In-process record storage keyed by token hash.
///
/// Nothing survives a restart. Conditional removal happens under the shard
/// lock, which keeps `take_live` single-use across threads.
pub struct MemoryStorage {
    records: DashMap<String, StoredRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Records held, expired ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStorage for MemoryStorage {
    async fn insert(&self, record: NewRecord) -> Result<RecordId, StoreError> {
        let stored = StoredRecord {
            email: record.email,
            expires_at: record.expires_at,
        };
        match self.records.entry(record.token_hash) {
            // An expired record no longer holds its token, swept or not.
            Entry::Occupied(mut slot) if slot.get().expires_at <= record.created_at => {
                slot.insert(stored);
                Ok(record.id)
            }
            Entry::Occupied(_) => Err(StoreError::DuplicateToken),
            Entry::Vacant(slot) => {
                slot.insert(stored);
                Ok(record.id)
            }
        }
    }

    async fn take_live(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .records
            .remove_if(token_hash, |_, record| record.expires_at > now)
            .map(|(_, record)| record.email))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut removed = 0u64;
        self.records.retain(|_, record| {
            let live = record.expires_at > now;
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(hash: &str, expires_at: DateTime<Utc>) -> NewRecord {
        NewRecord {
            id: RecordId(Uuid::now_v7()),
            email: "a@x.com".to_string(),
            token_hash: hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn expired_record_stays_put_until_deleted() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        storage
            .insert(record("h1", now - Duration::seconds(1)))
            .await
            .unwrap();

        assert_eq!(storage.take_live("h1", now).await.unwrap(), None);
        assert_eq!(storage.len(), 1);

        assert_eq!(storage.delete_expired(now).await.unwrap(), 1);
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn expiry_boundary_is_exclusive() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        storage.insert(record("h1", now)).await.unwrap();

        assert_eq!(storage.take_live("h1", now).await.unwrap(), None);
        assert_eq!(storage.delete_expired(now).await.unwrap(), 1);
    }
}
