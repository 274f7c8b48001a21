//! Pushes the current token out to every place that mirrors it.
//!
//! The store is the single source of truth; nothing here is read back into it
//! after initialisation. Each side effect is attempted independently and a
//! failure in one never blocks the others.

mod atomic_io;
mod location;
mod parent;
mod storage;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use location::Location;
pub use parent::{JsonLineParent, RecordingParent};
pub use storage::{FileTokenStorage, MemoryTokenStorage};

/// Storage key the token is persisted under.
pub const STORAGE_KEY: &str = "shadowScout.roomsHash";
/// Discriminator of the message sent to an embedding parent.
pub const HASH_UPDATE_MESSAGE_TYPE: &str = "shadowScoutHashUpdate";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to read stored token at {path}: {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write stored token at {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid storage key '{key}'")]
    InvalidStorageKey { key: String },
    #[error("failed to encode parent message: {0}")]
    EncodeMessage(#[source] serde_json::Error),
    #[error("failed to deliver parent message: {0}")]
    Deliver(#[source] std::io::Error),
}

/// Durable key-value storage holding at most one token per key.
pub trait TokenStorage {
    fn load(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn store(&mut self, key: &str, token: &str) -> Result<(), SyncError>;
    fn remove(&mut self, key: &str) -> Result<(), SyncError>;
}

/// The navigable address whose fragment mirrors the token.
pub trait AddressBar {
    fn href(&self) -> String;
    fn fragment(&self) -> Option<&str>;
    /// Replaces the fragment in place without adding history. `None` drops the
    /// fragment entirely.
    fn replace_fragment(&mut self, fragment: Option<&str>);
}

/// An embedding context interested in token changes.
pub trait ParentContext {
    fn post_message(&mut self, message: &HashUpdateMessage) -> Result<(), SyncError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashUpdateMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: String,
}

impl HashUpdateMessage {
    pub fn new(token: &str) -> Self {
        Self {
            kind: HASH_UPDATE_MESSAGE_TYPE.to_string(),
            hash: token.to_string(),
        }
    }
}

/// Which side effects succeeded for one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub storage_ok: bool,
    pub parent: ParentDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentDelivery {
    NotEmbedded,
    Delivered,
    Failed,
}

pub struct SyncBridge {
    storage_key: String,
    storage: Box<dyn TokenStorage>,
    address: Box<dyn AddressBar>,
    parent: Option<Box<dyn ParentContext>>,
    last_published: Option<String>,
}

impl SyncBridge {
    pub fn new(storage: Box<dyn TokenStorage>, address: Box<dyn AddressBar>) -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            storage,
            address,
            parent: None,
            last_published: None,
        }
    }

    pub fn with_parent(mut self, parent: Box<dyn ParentContext>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn address(&self) -> &dyn AddressBar {
        self.address.as_ref()
    }

    pub fn last_published(&self) -> Option<&str> {
        self.last_published.as_deref()
    }

    /// Token to start from: an explicit fragment wins over the stored value.
    pub fn initial_token(&self) -> String {
        if let Some(fragment) = self.address.fragment().filter(|f| !f.is_empty()) {
            return fragment.to_string();
        }
        match self.storage.load(&self.storage_key) {
            Ok(stored) => stored.unwrap_or_default(),
            Err(error) => {
                warn!(error = %error, "sync_storage_read_failed");
                String::new()
            }
        }
    }

    pub fn publish(&mut self, token: &str) -> SyncReport {
        let stored = if token.is_empty() {
            self.storage.remove(&self.storage_key)
        } else {
            self.storage.store(&self.storage_key, token)
        };
        let storage_ok = match stored {
            Ok(()) => true,
            Err(error) => {
                warn!(error = %error, key = %self.storage_key, "sync_storage_write_failed");
                false
            }
        };

        self.address
            .replace_fragment(Some(token).filter(|t| !t.is_empty()));

        let parent = match self.parent.as_mut() {
            None => ParentDelivery::NotEmbedded,
            Some(parent) => match parent.post_message(&HashUpdateMessage::new(token)) {
                Ok(()) => ParentDelivery::Delivered,
                Err(error) => {
                    warn!(error = %error, "sync_parent_message_failed");
                    ParentDelivery::Failed
                }
            },
        };

        debug!(token, storage_ok, parent = ?parent, "token_published");
        self.last_published = Some(token.to_string());
        SyncReport { storage_ok, parent }
    }
}
