use std::sync::Arc;

use procedio_service::ProcedioService;
use procedio_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<ProcedioService>,
}
impl AppState {
	pub async fn new(config: procedio_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema(config.storage.vector_dim).await?;

		Ok(Self::from_service(ProcedioService::new(config, db)))
	}

	pub fn from_service(service: ProcedioService) -> Self {
		Self { service: Arc::new(service) }
	}
}
