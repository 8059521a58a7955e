//! The `KvBackend` trait implemented by every store backend.

use std::collections::HashMap;

use crossbeam_channel::Receiver;

use crate::StoreResult;

/// Field map of one hash key.
pub type Hash = HashMap<String, String>;

/// A Redis-shaped key-value backend: hashes, capped lists and pub/sub.
///
/// Implementations must serialize concurrent writers to the same key
/// (per-key mutual exclusion); unrelated keys may proceed in parallel.
pub trait KvBackend: Send + Sync + 'static {
    /// One hash field, or `None` if the key or field is missing.
    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Every field of a hash; empty if the key is missing.
    fn hgetall(&self, key: &str) -> StoreResult<Hash>;

    /// Set several hash fields at once, creating the key if needed.
    fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()>;

    /// Atomic read-modify-write of a whole hash.
    ///
    /// `f` runs while the key is locked.  If it returns an error, none of its
    /// changes are kept.
    fn hupdate(
        &self,
        key: &str,
        f:   &mut dyn FnMut(&mut Hash) -> StoreResult<()>,
    ) -> StoreResult<()>;

    /// Append to a list, evicting from the front beyond `cap` entries.
    /// Returns the list length after the push.
    fn rpush_capped(&self, key: &str, value: String, cap: usize) -> StoreResult<usize>;

    /// The last `n` list entries, oldest first.
    fn lrange_tail(&self, key: &str, n: usize) -> StoreResult<Vec<String>>;

    /// Fan `message` out to every live subscriber of `channel`.  Returns how
    /// many subscribers received it.
    fn publish(&self, channel: &str, message: String) -> StoreResult<usize>;

    /// Register a new subscriber.  Dropping the receiver unsubscribes.
    fn subscribe(&self, channel: &str) -> StoreResult<Receiver<String>>;

    /// Remove a key.  Returns `true` if it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Remove every key.  Subscriptions survive.
    fn flush(&self) -> StoreResult<()>;
}
