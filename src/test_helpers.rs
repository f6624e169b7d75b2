//! Shared test utilities for the sitedeploy test suite.
//!
//! The centerpiece is [`MockStore`], an [`ObjectStore`] that records every
//! successful put (key, headers, body bytes) and can be told to fail the next
//! N attempts for a given key — enough to exercise retry, exhaustion, and
//! partial-failure aggregation without a network.

use crate::store::{ObjectStore, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

/// One successful upload as seen by the store.
#[derive(Debug, Clone)]
pub(crate) struct RecordedPut {
    pub key: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// In-memory [`ObjectStore`] with scriptable failures.
#[derive(Default)]
pub(crate) struct MockStore {
    puts: Mutex<Vec<RecordedPut>>,
    failures: Mutex<BTreeMap<String, u32>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `times` put attempts for `key` fail with a transport
    /// error before succeeding. `u32::MAX` means "always fail".
    pub fn fail_next(&self, key: &str, times: u32) {
        self.failures.lock().unwrap().insert(key.to_string(), times);
    }

    /// The recorded put for `key`, if it ever succeeded.
    pub fn put_for(&self, key: &str) -> Option<RecordedPut> {
        self.puts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.key == key)
            .cloned()
    }

    /// Number of successful puts across all keys.
    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn put_object(
        &self,
        key: &str,
        source: &Path,
        headers: &BTreeMap<String, String>,
    ) -> Result<u64, StoreError> {
        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(key) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(StoreError::Transport(format!(
                        "simulated transport failure for {key}"
                    )));
                }
            }
        }

        let body = std::fs::read(source)
            .map_err(|e| StoreError::Io(source.display().to_string(), e))?;
        let bytes = body.len() as u64;
        self.puts.lock().unwrap().push(RecordedPut {
            key: key.to_string(),
            headers: headers.clone(),
            body,
        });
        Ok(bytes)
    }
}
