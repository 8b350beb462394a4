use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zap_core::ZapConfig;
use zap_crypto::{DEFAULT_CODE_LEN, DEFAULT_ROUNDS};

use crate::error::{ServerError, ServerResult};

/// Top-level server configuration, loaded from TOML.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Upper bound on request bodies, uploads included.
    pub max_upload_bytes: usize,
    pub cors_permissive: bool,
    pub code_length: usize,
    pub hash_rounds: u32,
    pub zap: ZapConfig,
    pub repository: RepositoryConfig,
    pub content: ContentConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_upload_bytes: 50 * 1024 * 1024,
            cors_permissive: false,
            code_length: DEFAULT_CODE_LEN,
            hash_rounds: DEFAULT_ROUNDS,
            zap: ZapConfig::default(),
            repository: RepositoryConfig::default(),
            content: ContentConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }
}

/// Where zap records live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum RepositoryConfig {
    #[default]
    Memory,
    Sqlite { path: PathBuf },
}

/// Where uploaded files live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ContentConfig {
    #[default]
    Memory,
    Filesystem {
        root: PathBuf,
        /// URL prefix the server exposes `root` under.
        #[serde(default = "default_files_url")]
        public_base_url: String,
        #[serde(default = "default_folder")]
        folder: String,
    },
}

fn default_files_url() -> String {
    "http://localhost:8080/files".into()
}

fn default_folder() -> String {
    zap_store::UploadRouting::default().folder
}

impl RepositoryConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite { .. } => "sqlite",
        }
    }
}

impl ContentConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Filesystem { .. } => "filesystem",
        }
    }
}
