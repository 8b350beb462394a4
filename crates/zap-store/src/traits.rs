use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zap_types::{ShortCode, Zap, ZapId};

use crate::error::StoreResult;

/// Durable keyed storage for zap records.
///
/// All implementations must satisfy these invariants:
/// - `short_code` is unique across live records; `create` fails with
///   `DuplicateKey` instead of overwriting.
/// - `increment_view_count` is atomic with respect to other increments on the
///   same record: two callers passing the same `expected_current` can never
///   both succeed.
/// - `view_count` is never decreased.
#[async_trait]
pub trait ZapRepository: Send + Sync {
    /// Persist a new record and return it as stored.
    async fn create(&self, zap: &Zap) -> StoreResult<Zap>;

    /// Look up a record by its public short code.
    ///
    /// Returns `Ok(None)` if no such record exists.
    async fn find_by_short_code(&self, code: &ShortCode) -> StoreResult<Option<Zap>>;

    /// Advance the view counter by one if it still equals `expected_current`.
    ///
    /// Returns the updated record. Fails with `Conflict` when the stored
    /// count differs and with `NotFound` when the record is gone.
    async fn increment_view_count(&self, id: ZapId, expected_current: u32) -> StoreResult<Zap>;

    /// Delete a record. Returns `true` if it existed.
    async fn delete(&self, id: ZapId) -> StoreResult<bool>;

    /// Delete every record whose expiry lies strictly before `now` and return
    /// the removed records.
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Zap>>;
}
