use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zap_types::{ShortCode, Zap, ZapId};

use crate::error::{StoreError, StoreResult};
use crate::traits::ZapRepository;

#[derive(Default)]
struct Tables {
    zaps: HashMap<ZapId, Zap>,
    by_code: HashMap<ShortCode, ZapId>,
}

/// In-memory, HashMap-based zap repository.
///
/// Intended for tests and single-process deployments. The short-code index
/// and the compare-and-swap counter are both maintained under one write lock.
pub struct InMemoryZapRepository {
    tables: RwLock<Tables>,
}

impl InMemoryZapRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.tables.read().expect("lock poisoned").zaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch by internal id (test and diagnostics helper).
    pub fn get(&self, id: ZapId) -> Option<Zap> {
        self.tables.read().expect("lock poisoned").zaps.get(&id).cloned()
    }
}

impl Default for InMemoryZapRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ZapRepository for InMemoryZapRepository {
    async fn create(&self, zap: &Zap) -> StoreResult<Zap> {
        let mut tables = self.tables.write().expect("lock poisoned");
        if tables.by_code.contains_key(&zap.short_code) {
            return Err(StoreError::DuplicateKey {
                field: "short_code",
                value: zap.short_code.to_string(),
            });
        }
        if tables.zaps.contains_key(&zap.id) {
            return Err(StoreError::DuplicateKey {
                field: "id",
                value: zap.id.to_string(),
            });
        }
        tables.by_code.insert(zap.short_code.clone(), zap.id);
        tables.zaps.insert(zap.id, zap.clone());
        Ok(zap.clone())
    }

    async fn find_by_short_code(&self, code: &ShortCode) -> StoreResult<Option<Zap>> {
        let tables = self.tables.read().expect("lock poisoned");
        Ok(tables
            .by_code
            .get(code)
            .and_then(|id| tables.zaps.get(id))
            .cloned())
    }

    async fn increment_view_count(&self, id: ZapId, expected_current: u32) -> StoreResult<Zap> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let zap = tables.zaps.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if zap.view_count != expected_current {
            return Err(StoreError::Conflict {
                id,
                expected: expected_current,
            });
        }
        zap.view_count = zap.view_count.saturating_add(1);
        Ok(zap.clone())
    }

    async fn delete(&self, id: ZapId) -> StoreResult<bool> {
        let mut tables = self.tables.write().expect("lock poisoned");
        match tables.zaps.remove(&id) {
            Some(zap) => {
                tables.by_code.remove(&zap.short_code);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Zap>> {
        let mut tables = self.tables.write().expect("lock poisoned");
        let expired: Vec<ZapId> = tables
            .zaps
            .values()
            .filter(|z| z.is_expired_at(now))
            .map(|z| z.id)
            .collect();
        let mut removed = Vec::with_capacity(expired.len());
        for id in expired {
            if let Some(zap) = tables.zaps.remove(&id) {
                tables.by_code.remove(&zap.short_code);
                removed.push(zap);
            }
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for InMemoryZapRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryZapRepository")
            .field("zap_count", &self.len())
            .finish()
    }
}
