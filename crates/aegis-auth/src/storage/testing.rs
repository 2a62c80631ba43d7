//! In-memory storage doubles for unit tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::TokenRecordStorage;
use crate::types::TokenRecord;

/// Map-backed token record storage with direct manipulation helpers.
pub struct MemoryRecords {
    records: RwLock<HashMap<Uuid, TokenRecord>>,
}

impl MemoryRecords {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_records(records: Vec<TokenRecord>) -> Self {
        let storage = Self::new();
        {
            let mut map = storage.records.write().unwrap();
            for record in records {
                map.insert(record.id, record);
            }
        }
        storage
    }

    /// Fetches a record synchronously, panicking if absent.
    pub fn get(&self, id: Uuid) -> TokenRecord {
        self.records.read().unwrap().get(&id).unwrap().clone()
    }

    /// Pushes a record's horizon into the past.
    pub fn expire_secret(&self, secret: &str) {
        let mut map = self.records.write().unwrap();
        let record = map
            .values_mut()
            .find(|r| r.refresh_secret == secret)
            .expect("no record for secret");
        record.expires_at = record.issued_at - 1;
    }
}

#[async_trait]
impl TokenRecordStorage for MemoryRecords {
    async fn create(&self, record: &TokenRecord) -> AuthResult<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> AuthResult<Option<TokenRecord>> {
        Ok(self.records.read().unwrap().get(&id).cloned())
    }

    async fn get_by_secret(&self, secret: &str) -> AuthResult<Option<TokenRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .find(|r| r.refresh_secret == secret)
            .cloned())
    }

    async fn get_by_subject(&self, subject: &str) -> AuthResult<Vec<TokenRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.subject == subject)
            .cloned()
            .collect())
    }

    async fn set_access_block(&self, id: Uuid, blocked: bool) -> AuthResult<()> {
        self.update(id, |r| r.is_blocked_access = blocked)
    }

    async fn set_full_block(&self, id: Uuid) -> AuthResult<()> {
        self.update(id, |r| {
            r.is_full_block = true;
            r.is_blocked_access = true;
        })
    }

    async fn mark_superseded(&self, id: Uuid) -> AuthResult<()> {
        self.update(id, |r| r.superseded = true)
    }

    async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.records.write().unwrap().remove(&id);
        Ok(())
    }

    async fn delete_by_subject(&self, subject: &str) -> AuthResult<u64> {
        let mut map = self.records.write().unwrap();
        let before = map.len();
        map.retain(|_, r| r.subject != subject);
        Ok((before - map.len()) as u64)
    }
}

impl MemoryRecords {
    fn update(&self, id: Uuid, apply: impl FnOnce(&mut TokenRecord)) -> AuthResult<()> {
        let mut map = self.records.write().unwrap();
        let record = map
            .get_mut(&id)
            .ok_or_else(|| AuthError::storage("record not found"))?;
        apply(record);
        Ok(())
    }
}
