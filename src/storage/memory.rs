//! In-memory [`ObjectStore`] used by tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use super::{ObjectStore, Result, StorageError};

/// How the conversion function behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Writes a `.jpg` sibling and answers with its path.
    ToJpeg,
    Fail,
}

pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    invocations: Mutex<Vec<(String, Value)>>,
    conversion: Conversion,
    fail_uploads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_conversion(Conversion::ToJpeg)
    }

    pub fn with_conversion(conversion: Conversion) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            invocations: Mutex::new(Vec::new()),
            conversion,
            fail_uploads: AtomicBool::new(false),
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn invocations(&self) -> Vec<(String, Value)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn upload(&self, path: &str, data: Bytes, _content_type: &str) -> Result<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Api {
                status: 503,
                message: "storage unavailable".to_string(),
            });
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::Api {
                status: 409,
                message: "The resource already exists".to_string(),
            });
        }
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/storage/v1/object/public/images/{}", path)
    }

    async fn invoke(&self, function: &str, body: Value) -> Result<Value> {
        self.invocations
            .lock()
            .unwrap()
            .push((function.to_string(), body.clone()));

        match self.conversion {
            Conversion::Fail => Err(StorageError::Function {
                name: function.to_string(),
                message: "conversion crashed".to_string(),
            }),
            Conversion::ToJpeg => {
                let source = body["path"].as_str().unwrap_or_default().to_string();
                let stem = source.rsplit_once('.').map(|(s, _)| s).unwrap_or(&source);
                let target = format!("{}.jpg", stem);
                let data = self
                    .objects
                    .lock()
                    .unwrap()
                    .get(&source)
                    .cloned()
                    .unwrap_or_default();
                self.objects.lock().unwrap().insert(target.clone(), data);
                Ok(json!({ "path": target }))
            }
        }
    }
}
