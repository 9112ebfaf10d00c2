pub mod copilot;
pub mod escalation;
pub mod postgres;
pub mod progress;
pub mod quiz;
pub mod time_serde;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use copilot::{Citation, DocumentGroup, ResponseMode, RouteRequest, SuggestedChunk};
pub use error::{Error, Result};
pub use escalation::{
	EscalateRequest, Escalation, EscalationList, EscalationReceipt, EscalationStatus,
	ListEscalationsRequest,
};
pub use procedio_providers::chat::ChatRequest;
pub use progress::{
	AwardOutcome, AwardRequest, CelebrationOutcome, ObserveRequest, ProgressSnapshot, SetXpRequest,
};
pub use quiz::{Quiz, QuizQuestion, QuizRequest};

use postgres::PostgresStore;
use procedio_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use procedio_providers::{chat, embedding};
use procedio_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		req: &'a ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Nearest-neighbour access to ingested document chunks.
pub trait ChunkIndex
where
	Self: Send + Sync,
{
	/// Up to `k` chunks, best similarity first.
	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		k: u32,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RetrievalChunk>>>;

	/// Chunk contents of one document in reading order.
	fn chunks_for_document<'a>(
		&'a self,
		document_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>>;
}

pub trait ProfileStore
where
	Self: Send + Sync,
{
	/// `None` when the user has no profile.
	fn get_xp<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<i64>>>;

	fn set_xp<'a>(&'a self, user_id: &'a str, xp: i64) -> BoxFuture<'a, Result<()>>;

	/// Atomic increment. Returns XP before and after.
	fn add_xp<'a>(&'a self, user_id: &'a str, delta: i64) -> BoxFuture<'a, Result<(i64, i64)>>;
}

pub trait EscalationStore
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, escalation: &'a Escalation) -> BoxFuture<'a, Result<()>>;

	fn list<'a>(
		&'a self,
		status: Option<EscalationStatus>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Escalation>>>;

	fn resolve<'a>(
		&'a self,
		escalation_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Escalation>>;
}

/// One search hit. The embedding itself stays in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalChunk {
	pub content: String,
	pub similarity: f32,
	pub title: String,
	pub storage_path: Option<String>,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, chat: Arc<dyn ChatProvider>) -> Self {
		Self { embedding, chat }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), chat: provider }
	}
}

#[derive(Clone)]
pub struct Stores {
	pub chunks: Arc<dyn ChunkIndex>,
	pub profiles: Arc<dyn ProfileStore>,
	pub escalations: Arc<dyn EscalationStore>,
}
impl Stores {
	pub fn new(
		chunks: Arc<dyn ChunkIndex>,
		profiles: Arc<dyn ProfileStore>,
		escalations: Arc<dyn EscalationStore>,
	) -> Self {
		Self { chunks, profiles, escalations }
	}

	pub fn postgres(db: Db) -> Self {
		let store = Arc::new(PostgresStore::new(db));

		Self { chunks: store.clone(), profiles: store.clone(), escalations: store }
	}
}

pub struct ProcedioService {
	pub cfg: Config,
	pub providers: Providers,
	pub stores: Stores,
}
impl ProcedioService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, providers: Providers::default(), stores: Stores::postgres(db) }
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		Self { cfg, providers, stores: Stores::postgres(db) }
	}

	pub fn with_stores(cfg: Config, providers: Providers, stores: Stores) -> Self {
		Self { cfg, providers, stores }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		req: &'a ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(chat::complete(cfg, req))
	}
}

/// Resolves `fut` unless `cancel` fires first.
pub(crate) async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	tokio::select! {
		biased;
		_ = cancel.cancelled() => Err(Error::Cancelled),
		result = fut => result,
	}
}
