//! In-process backend: a sharded concurrent map plus fan-out channels.
//!
//! Volatile by construction; everything is gone when the process exits.

use std::collections::{HashMap, VecDeque};

use crossbeam_channel::{Receiver, Sender, unbounded};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::backend::{Hash, KvBackend};
use crate::{StoreError, StoreResult};

/// A stored value.
enum Value {
    Hash(Hash),
    List(VecDeque<String>),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
        }
    }
}

fn wrong_type(key: &str, expected: &'static str, value: &Value) -> StoreError {
    StoreError::WrongType { key: key.to_owned(), expected, actual: value.kind() }
}

/// [`KvBackend`] over a [`DashMap`].
///
/// Each key lives in one shard; holding a shard's write guard for the
/// duration of an operation gives per-key mutual exclusion without a global
/// lock.
#[derive(Default)]
pub struct MemoryBackend {
    data:        DashMap<String, Value>,
    subscribers: Mutex<HashMap<String, Vec<Sender<String>>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(entry) => match entry.value() {
                Value::Hash(h) => Ok(h.get(field).cloned()),
                other => Err(wrong_type(key, "hash", other)),
            },
        }
    }

    fn hgetall(&self, key: &str) -> StoreResult<Hash> {
        match self.data.get(key) {
            None => Ok(Hash::new()),
            Some(entry) => match entry.value() {
                Value::Hash(h) => Ok(h.clone()),
                other => Err(wrong_type(key, "hash", other)),
            },
        }
    }

    fn hset(&self, key: &str, fields: &[(&str, String)]) -> StoreResult<()> {
        let mut entry = self
            .data
            .entry(key.to_owned())
            .or_insert_with(|| Value::Hash(Hash::new()));
        match entry.value_mut() {
            Value::Hash(h) => {
                for (field, value) in fields {
                    h.insert((*field).to_owned(), value.clone());
                }
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    fn hupdate(
        &self,
        key: &str,
        f:   &mut dyn FnMut(&mut Hash) -> StoreResult<()>,
    ) -> StoreResult<()> {
        let mut entry = self
            .data
            .entry(key.to_owned())
            .or_insert_with(|| Value::Hash(Hash::new()));
        match entry.value_mut() {
            Value::Hash(h) => {
                // Mutate a copy so a failing closure leaves the record intact.
                let mut draft = h.clone();
                f(&mut draft)?;
                *h = draft;
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    fn rpush_capped(&self, key: &str, value: String, cap: usize) -> StoreResult<usize> {
        let mut entry = self
            .data
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(VecDeque::new()));
        match entry.value_mut() {
            Value::List(list) => {
                list.push_back(value);
                while list.len() > cap {
                    list.pop_front();
                }
                Ok(list.len())
            }
            other => Err(wrong_type(key, "list", other)),
        }
    }

    fn lrange_tail(&self, key: &str, n: usize) -> StoreResult<Vec<String>> {
        match self.data.get(key) {
            None => Ok(Vec::new()),
            Some(entry) => match entry.value() {
                Value::List(list) => {
                    let skip = list.len().saturating_sub(n);
                    Ok(list.iter().skip(skip).cloned().collect())
                }
                other => Err(wrong_type(key, "list", other)),
            },
        }
    }

    fn publish(&self, channel: &str, message: String) -> StoreResult<usize> {
        let mut subscribers = self.subscribers.lock();
        let Some(senders) = subscribers.get_mut(channel) else {
            return Ok(0);
        };
        // Sending fails only when the receiver was dropped: unsubscribe it.
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        Ok(senders.len())
    }

    fn subscribe(&self, channel: &str) -> StoreResult<Receiver<String>> {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .entry(channel.to_owned())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.data.remove(key).is_some())
    }

    fn flush(&self) -> StoreResult<()> {
        self.data.clear();
        Ok(())
    }
}
