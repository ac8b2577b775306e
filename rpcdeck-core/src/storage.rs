//! # Saved Protos
//!
//! A small JSON-file repository remembering the descriptor sets an operator has loaded, the host
//! each one talks to, and the edited state of every method (request body and metadata).
//!
//! Every mutating operation reads the file, applies the change and writes it back, so the last
//! write wins.
use crate::metadata::MetadataEntry;
use crate::schema::MethodStub;
use crate::session::{CallMode, MethodId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to access '{path}': '{source}'")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed repository file '{path}': '{source}'")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A loaded descriptor set and its methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoRecord {
    pub name: String,
    /// Where the descriptor set was read from. Records are keyed by this path.
    pub path: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub methods: Vec<SavedMethod>,
}

impl ProtoRecord {
    pub fn method(&self, service_name: &str, name: &str) -> Option<&SavedMethod> {
        self.methods
            .iter()
            .find(|m| m.service_name == service_name && m.name == name)
    }
}

/// A method stub together with whatever the operator edited on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedMethod {
    pub id: MethodId,
    pub namespace: String,
    pub service_name: String,
    pub name: String,
    pub mode: CallMode,
    pub request_body: Value,
    #[serde(default)]
    pub request_metadata: Vec<MetadataEntry>,
    #[serde(default)]
    pub response_metadata: Vec<MetadataEntry>,
}

impl From<MethodStub> for SavedMethod {
    fn from(stub: MethodStub) -> Self {
        Self {
            id: stub.id,
            namespace: stub.namespace,
            service_name: stub.service_name,
            name: stub.name,
            mode: stub.mode,
            request_body: stub.request_body,
            request_metadata: vec![],
            response_metadata: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Contents {
    #[serde(default)]
    protos: Vec<ProtoRecord>,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
}

/// JSON-file backed store of [`ProtoRecord`]s and include directories.
#[derive(Debug, Clone)]
pub struct ProtoRepository {
    path: PathBuf,
}

impl ProtoRepository {
    /// Opens the repository stored at `path`, creating its parent directory. The file itself is
    /// only written on the first change.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, path: &str) -> Result<Option<ProtoRecord>, StorageError> {
        Ok(self.load()?.protos.into_iter().find(|p| p.path == path))
    }

    pub fn list(&self) -> Result<Vec<ProtoRecord>, StorageError> {
        Ok(self.load()?.protos)
    }

    /// Stores `record`, replacing any record with the same path. The record moves to the end.
    pub fn add(&self, record: ProtoRecord) -> Result<(), StorageError> {
        self.add_all(vec![record])
    }

    pub fn add_all(&self, records: Vec<ProtoRecord>) -> Result<(), StorageError> {
        self.update(|contents| {
            for record in records {
                contents.protos.retain(|p| p.path != record.path);
                contents.protos.push(record);
            }
        })
    }

    pub fn remove(&self, path: &str) -> Result<(), StorageError> {
        self.update(|contents| contents.protos.retain(|p| p.path != path))
    }

    /// Replaces stored records with freshly parsed ones while keeping the operator's work.
    ///
    /// For each record already stored under the same path, the host is kept. Methods that still
    /// exist (same service and name) keep their id and metadata, and every top-level key of the new
    /// sample body takes the previously saved value when that value is not `null`. Records that
    /// were never stored are ignored.
    pub fn reload(&self, records: Vec<ProtoRecord>) -> Result<(), StorageError> {
        self.update(|contents| {
            for record in records {
                let Some(index) = contents.protos.iter().position(|p| p.path == record.path) else {
                    tracing::debug!(path = %record.path, "Skipping reload of unknown proto");
                    continue;
                };

                let original = contents.protos.remove(index);
                contents.protos.push(merge(original, record));
            }
        })
    }

    /// Saves the edited state of one method and the host of its proto.
    pub fn save_method(
        &self,
        path: &str,
        host: &str,
        method: SavedMethod,
    ) -> Result<(), StorageError> {
        self.update(|contents| {
            let Some(record) = contents.protos.iter_mut().find(|p| p.path == path) else {
                tracing::warn!(path, "Cannot save method of unknown proto");
                return;
            };

            record.host = host.to_string();
            match record
                .methods
                .iter_mut()
                .find(|m| m.service_name == method.service_name && m.name == method.name)
            {
                Some(slot) => *slot = method,
                None => record.methods.push(method),
            }
        })
    }

    pub fn list_include_dirs(&self) -> Result<Vec<PathBuf>, StorageError> {
        Ok(self.load()?.include_dirs)
    }

    /// Adds an include directory. A directory that is already listed moves to the end.
    pub fn add_include_dir(&self, dir: impl Into<PathBuf>) -> Result<(), StorageError> {
        let dir = dir.into();
        self.update(|contents| {
            contents.include_dirs.retain(|d| *d != dir);
            contents.include_dirs.push(dir);
        })
    }

    pub fn remove_include_dir(&self, dir: &Path) -> Result<(), StorageError> {
        self.update(|contents| contents.include_dirs.retain(|d| d != dir))
    }

    /// Resolves `name` to an existing file. Absolute or directly reachable paths win, then the
    /// include directories are tried in order.
    pub fn lookup_file(&self, name: &Path) -> Result<Option<PathBuf>, StorageError> {
        if name.is_file() {
            return Ok(Some(name.to_path_buf()));
        }

        if name.is_absolute() {
            return Ok(None);
        }

        Ok(self
            .list_include_dirs()?
            .into_iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file()))
    }

    fn load(&self) -> Result<Contents, StorageError> {
        if !self.path.exists() {
            return Ok(Contents::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn update(&self, change: impl FnOnce(&mut Contents)) -> Result<(), StorageError> {
        let mut contents = self.load()?;
        change(&mut contents);

        let content = serde_json::to_string_pretty(&contents).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;

        fs::write(&self.path, content).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn merge(original: ProtoRecord, mut fresh: ProtoRecord) -> ProtoRecord {
    fresh.host = original.host.clone();

    for method in &mut fresh.methods {
        let Some(saved) = original.method(&method.service_name, &method.name) else {
            continue;
        };

        method.id = saved.id.clone();
        method.request_metadata = saved.request_metadata.clone();
        method.response_metadata = saved.response_metadata.clone();

        if let (Value::Object(body), Value::Object(saved_body)) =
            (&mut method.request_body, &saved.request_body)
        {
            for (key, value) in body.iter_mut() {
                if let Some(previous) = saved_body.get(key).filter(|v| !v.is_null()) {
                    *value = previous.clone();
                }
            }
        }
    }

    fresh
}
