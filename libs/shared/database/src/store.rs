use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use serde_json::{Map, Value};

use crate::error::StoreError;

const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

/// A remote JSON tree addressed by slash-separated paths.
///
/// Reads return an immutable snapshot of the subtree at `path` (`None` when
/// nothing is stored there). Writes are last-write-wins per path; the store
/// offers no conditional writes, so callers that read-then-write get no
/// isolation from concurrent writers.
#[async_trait]
pub trait HierarchicalStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the subtree at `path`. Writing `Value::Null` removes it.
    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    /// Multi-path update. Each key of `values` is a path relative to `path`
    /// and is written as a whole; all entries land in one request.
    async fn update(&self, path: &str, values: Map<String, Value>) -> Result<(), StoreError>;

    /// Fresh child key, chronologically ordered and unique per call.
    fn push_key(&self) -> String {
        generate_push_key()
    }
}

/// Generate a 20 character push key: 8 characters of millisecond timestamp
/// followed by 12 random characters.
pub fn generate_push_key() -> String {
    let mut now = Utc::now().timestamp_millis().max(0) as u64;
    let mut time_chars = [0u8; 8];
    for slot in time_chars.iter_mut().rev() {
        *slot = PUSH_CHARS[(now % 64) as usize];
        now /= 64;
    }

    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(20);
    key.extend(time_chars.iter().map(|c| *c as char));
    for _ in 0..12 {
        key.push(PUSH_CHARS[rng.gen_range(0..64)] as char);
    }
    key
}

/// Split a path into its segments, rejecting empty or forbidden keys.
pub fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    trimmed
        .split('/')
        .map(|segment| {
            if segment.is_empty() {
                Err(StoreError::InvalidPath(format!("empty segment in '{}'", path)))
            } else if segment.contains(FORBIDDEN_KEY_CHARS) {
                Err(StoreError::InvalidPath(format!(
                    "segment '{}' contains a forbidden character",
                    segment
                )))
            } else {
                Ok(segment)
            }
        })
        .collect()
}

pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim_matches('/'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Iterate the object children of a snapshot as `(key, value)` pairs.
pub fn children(snapshot: &Value) -> impl Iterator<Item = (&String, &Value)> {
    snapshot.as_object().into_iter().flat_map(|map| map.iter())
}
