use std::sync::Arc;

use lexa_service::LexaService;
use lexa_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<LexaService>,
}
impl AppState {
	pub async fn new(config: lexa_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = LexaService::new(config, db, qdrant);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: LexaService) -> Self {
		Self { service: Arc::new(service) }
	}
}
