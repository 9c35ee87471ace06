//! 文档持久化
//!
//! 以名称读写整个 JSON 文档，后写覆盖先写。文件后端先写入临时文件再原子
//! 重命名，读者不会看到写了一半的文档。

use crate::error::StoreError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

pub const APP_CONFIG_DOCUMENT: &str = "app-config";
pub const DEVICE_MAPPINGS_DOCUMENT: &str = "device-mappings";
pub const MINING_MAPPINGS_DOCUMENT: &str = "mining-mappings";

/// 文档存储接口
pub trait DocumentStore: Send + Sync {
    /// 读取文档，不存在时返回 `None`
    fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError>;

    /// 整体覆盖写入文档
    fn write_document(&self, name: &str, document: &Value) -> Result<(), StoreError>;
}

/// 基于目录的 JSON 文件存储，每个文档对应 `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    directory: PathBuf,
}

impl FileDocumentStore {
    /// 打开存储目录，不存在时创建
    pub fn open(directory: impl AsRef<Path>) -> Result<Self, StoreError> {
        let directory = directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&directory).map_err(|e| StoreError::Persistence {
            name: directory.display().to_string(),
            error: e.to_string(),
        })?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.json", name))
    }
}

impl DocumentStore for FileDocumentStore {
    fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(name);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Persistence {
                    name: name.to_string(),
                    error: e.to_string(),
                })
            }
        };

        let document = serde_json::from_str(&content).map_err(|e| StoreError::Persistence {
            name: name.to_string(),
            error: format!("invalid JSON in {}: {}", path.display(), e),
        })?;
        Ok(Some(document))
    }

    fn write_document(&self, name: &str, document: &Value) -> Result<(), StoreError> {
        let persistence_error = |error: String| StoreError::Persistence {
            name: name.to_string(),
            error,
        };

        let content = serde_json::to_string_pretty(document).map_err(|e| persistence_error(e.to_string()))?;
        let path = self.path_for(name);
        let temp_path = self.directory.join(format!(".{}.json.tmp", name));

        std::fs::write(&temp_path, content).map_err(|e| persistence_error(e.to_string()))?;
        std::fs::rename(&temp_path, &path).map_err(|e| persistence_error(e.to_string()))?;

        debug!("Persisted document {} to {}", name, path.display());
        Ok(())
    }
}

/// 内存存储，用于测试与临时运行
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, name: &str, document: Value) -> Self {
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(name.to_string(), document);
        }
        self
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn read_document(&self, name: &str) -> Result<Option<Value>, StoreError> {
        let documents = self.documents.read().map_err(|e| StoreError::Persistence {
            name: name.to_string(),
            error: e.to_string(),
        })?;
        Ok(documents.get(name).cloned())
    }

    fn write_document(&self, name: &str, document: &Value) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|e| StoreError::Persistence {
            name: name.to_string(),
            error: e.to_string(),
        })?;
        documents.insert(name.to_string(), document.clone());
        Ok(())
    }
}
