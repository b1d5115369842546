//! Configuration for documents and the relay server.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::crdt::format::MarkSchema;

/// Per-document settings.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Id passed to the initial-state source
    pub document_id: String,
    /// Author that mints this replica's ids
    pub author_id: String,
    /// Mark types the projector renders
    pub schema: MarkSchema,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            document_id: "default".to_string(),
            author_id: "local".to_string(),
            schema: MarkSchema::default(),
        }
    }
}

impl DocumentConfig {
    pub fn new(document_id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            author_id: author_id.into(),
            ..Self::default()
        }
    }
}

/// Settings for the relay binary, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `RICHTEXT_BIND`
    pub bind_addr: SocketAddr,
    /// `RICHTEXT_DOCUMENT` and `RICHTEXT_AUTHOR`
    pub document: DocumentConfig,
    /// `RICHTEXT_STATE_DIR`; bootstrap is disabled when unset
    pub state_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            document: DocumentConfig::new("default", "server"),
            state_dir: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = lookup("RICHTEXT_BIND")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(defaults.bind_addr);
        let document_id =
            lookup("RICHTEXT_DOCUMENT").unwrap_or(defaults.document.document_id);
        let author_id = lookup("RICHTEXT_AUTHOR").unwrap_or(defaults.document.author_id);
        let state_dir = lookup("RICHTEXT_STATE_DIR").map(PathBuf::from);

        Self {
            bind_addr,
            document: DocumentConfig::new(document_id, author_id),
            state_dir,
        }
    }
}
