//! Composition layer: builds exactly one concrete implementation per
//! collaborator from the configuration and hands them out behind trait
//! objects. Nothing below this layer chooses implementations.

use std::sync::Arc;
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::db::{
    DatabaseService, FailoverDatabaseService, InMemoryDatabaseService, MongoDatabaseService,
};
use crate::images::{
    CloudinaryImageHosting, ImageHosting, ImageSearch, LocalImageHosting, MockImageSearch,
    PixabayImageSearch,
};

pub struct Container {
    pub database: Arc<dyn DatabaseService>,
    pub image_hosting: Arc<dyn ImageHosting>,
    pub image_search: Arc<dyn ImageSearch>,
    pub config: Arc<Config>,
}

impl Container {
    /// Wires the services the configuration asks for. Hosted backends may
    /// come up degraded; the container is still returned so the app can run
    /// on the mirror.
    pub async fn build(config: Config) -> Self {
        let database: Arc<dyn DatabaseService> = match config.backend {
            BackendKind::Memory => Arc::new(InMemoryDatabaseService::new()),
            BackendKind::Hosted => Arc::new(MongoDatabaseService::connect(&config.mongo).await),
            BackendKind::Failover => {
                let primary = Arc::new(MongoDatabaseService::connect(&config.mongo).await);
                Arc::new(FailoverDatabaseService::new(primary))
            }
        };

        let (image_hosting, image_search): (Arc<dyn ImageHosting>, Arc<dyn ImageSearch>) =
            if config.use_mock_collaborators {
                (
                    Arc::new(LocalImageHosting::new()),
                    Arc::new(MockImageSearch::new()),
                )
            } else {
                (
                    Arc::new(CloudinaryImageHosting::new(&config.cloudinary)),
                    Arc::new(PixabayImageSearch::new(config.pixabay.api_key.clone())),
                )
            };

        info!(
            backend = ?config.backend,
            mocks = config.use_mock_collaborators,
            available = database.is_available(),
            "container assembled"
        );

        Self {
            database,
            image_hosting,
            image_search,
            config: Arc::new(config),
        }
    }

    /// In-memory database plus local/mock image services; fully offline.
    pub fn for_tests() -> Self {
        let config = Config {
            backend: BackendKind::Memory,
            use_mock_collaborators: true,
            ..Config::default()
        };
        Self {
            database: Arc::new(InMemoryDatabaseService::new()),
            image_hosting: Arc::new(LocalImageHosting::new()),
            image_search: Arc::new(MockImageSearch::new()),
            config: Arc::new(config),
        }
    }
}
