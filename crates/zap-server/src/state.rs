use std::sync::Arc;

use zap_core::{Collaborators, PngQrRenderer, ZapController};
use zap_crypto::{RandomCodeGenerator, SaltedBlake3Hasher};
use zap_store::{
    ContentStore, FilesystemContentStore, InMemoryContentStore, InMemoryZapRepository,
    SqliteZapRepository, UploadRouting, ZapRepository,
};

use crate::config::{ContentConfig, RepositoryConfig, ServerConfig};
use crate::error::ServerResult;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub controller: Arc<ZapController>,
}

impl AppState {
    pub fn new(config: ServerConfig, controller: ZapController) -> Self {
        Self {
            config: Arc::new(config),
            controller: Arc::new(controller),
        }
    }

    /// Wire up the backends named in `config`.
    pub async fn from_config(config: ServerConfig) -> ServerResult<Self> {
        let controller = ZapController::new(config.zap.clone(), collaborators(&config).await?);
        Ok(Self::new(config, controller))
    }
}

async fn collaborators(config: &ServerConfig) -> ServerResult<Collaborators> {
    let repository: Arc<dyn ZapRepository> = match &config.repository {
        RepositoryConfig::Memory => Arc::new(InMemoryZapRepository::new()),
        RepositoryConfig::Sqlite { path } => Arc::new(SqliteZapRepository::open(path).await?),
    };

    let content: Arc<dyn ContentStore> = match &config.content {
        ContentConfig::Memory => Arc::new(InMemoryContentStore::default()),
        ContentConfig::Filesystem {
            root,
            public_base_url,
            folder,
        } => {
            tokio::fs::create_dir_all(root).await?;
            let routing = UploadRouting {
                folder: folder.clone(),
            };
            Arc::new(
                FilesystemContentStore::new(root.clone(), public_base_url.as_str())
                    .with_routing(routing),
            )
        }
    };

    tracing::info!(
        repository = config.repository.backend_name(),
        content = config.content.backend_name(),
        "backends ready"
    );

    Ok(Collaborators {
        repository,
        content,
        hasher: Arc::new(SaltedBlake3Hasher::new(config.hash_rounds)?),
        qr: Arc::new(PngQrRenderer::default()),
        codes: Arc::new(RandomCodeGenerator::new(config.code_length)?),
    })
}
