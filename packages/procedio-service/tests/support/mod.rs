#![allow(dead_code)]

use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use color_eyre::eyre;
use serde_json::Map;
use time::OffsetDateTime;
use uuid::Uuid;

use procedio_config::{
	Config, Copilot, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers as ProviderCfg,
	Quiz, Security, Service, Storage,
};
use procedio_service::{
	BoxFuture, ChatProvider, ChatRequest, ChunkIndex, EmbeddingProvider, Error, Escalation,
	EscalationStatus, EscalationStore, ProcedioService, ProfileStore, Providers, Result,
	RetrievalChunk, Stores,
};

pub const VECTOR_DIM: u32 = 3;

pub fn test_config() -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres {
				dsn: "postgres://procedio@127.0.0.1/procedio".to_string(),
				pool_max_conns: 1,
			},
			vector_dim: VECTOR_DIM,
		},
		providers: ProviderCfg {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			chat: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-chat".to_string(),
				temperature: 0.7,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		copilot: Copilot::default(),
		quiz: Quiz::default(),
		security: Security { bind_localhost_only: true },
	}
}

pub fn chunk(title: &str, content: &str, similarity: f32) -> RetrievalChunk {
	RetrievalChunk {
		content: content.to_string(),
		similarity,
		title: title.to_string(),
		storage_path: Some(format!("procedures/{}.pdf", title.to_lowercase().replace(' ', "-"))),
	}
}

pub struct SpyEmbedding {
	pub calls: AtomicUsize,
	pub vector_dim: usize,
	pub pending: bool,
}
impl SpyEmbedding {
	pub fn new() -> Self {
		Self { calls: AtomicUsize::new(0), vector_dim: VECTOR_DIM as usize, pending: false }
	}

	pub fn with_dim(vector_dim: usize) -> Self {
		Self { vector_dim, ..Self::new() }
	}

	/// Never resolves.
	pub fn pending() -> Self {
		Self { pending: true, ..Self::new() }
	}
}
impl EmbeddingProvider for SpyEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if self.pending {
				std::future::pending::<()>().await;
			}

			Ok(texts.iter().map(|_| vec![0.1; self.vector_dim]).collect())
		})
	}
}

pub struct SpyChat {
	pub reply: color_eyre::Result<String>,
	pub requests: Mutex<Vec<ChatRequest>>,
}
impl SpyChat {
	pub fn replying(reply: &str) -> Self {
		Self { reply: Ok(reply.to_string()), requests: Mutex::new(Vec::new()) }
	}

	pub fn failing(message: &str) -> Self {
		Self { reply: Err(eyre::eyre!("{message}")), requests: Mutex::new(Vec::new()) }
	}

	pub fn calls(&self) -> usize {
		self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
	}

	pub fn last_request(&self) -> ChatRequest {
		self.requests
			.lock()
			.expect("Chat spy lock poisoned.")
			.last()
			.cloned()
			.expect("Expected a chat call.")
	}
}
impl ChatProvider for SpyChat {
	fn complete<'a>(
		&'a self,
		_: &'a LlmProviderConfig,
		req: &'a ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.requests.lock().expect("Chat spy lock poisoned.").push(req.clone());

		let reply = match &self.reply {
			Ok(text) => Ok(text.clone()),
			Err(err) => Err(eyre::eyre!("{err}")),
		};

		Box::pin(async move { reply })
	}
}

#[derive(Default)]
pub struct StaticIndex {
	pub hits: Vec<RetrievalChunk>,
	pub documents: HashMap<String, Vec<String>>,
	pub delay: Option<Duration>,
	pub last_filter: Mutex<Option<String>>,
	pub last_k: AtomicUsize,
}
impl StaticIndex {
	pub fn with_hits(hits: Vec<RetrievalChunk>) -> Self {
		Self { hits, ..Self::default() }
	}
}
impl ChunkIndex for StaticIndex {
	fn search<'a>(
		&'a self,
		_: &'a [f32],
		k: u32,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RetrievalChunk>>> {
		*self.last_filter.lock().expect("Index lock poisoned.") = document_id.map(str::to_string);
		self.last_k.store(k as usize, Ordering::SeqCst);

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			Ok(self.hits.iter().take(k as usize).cloned().collect())
		})
	}

	fn chunks_for_document<'a>(
		&'a self,
		document_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		let chunks = self
			.documents
			.get(document_id)
			.map(|chunks| chunks.iter().take(limit as usize).cloned().collect())
			.unwrap_or_default();

		Box::pin(async move { Ok(chunks) })
	}
}

#[derive(Default)]
pub struct MemoryProfiles {
	pub xp: Mutex<HashMap<String, i64>>,
}
impl MemoryProfiles {
	pub fn with_user(user_id: &str, xp: i64) -> Self {
		let profiles = Self::default();

		profiles.xp.lock().expect("Profile lock poisoned.").insert(user_id.to_string(), xp);

		profiles
	}
}
impl ProfileStore for MemoryProfiles {
	fn get_xp<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<i64>>> {
		let xp = self.xp.lock().expect("Profile lock poisoned.").get(user_id).copied();

		Box::pin(async move { Ok(xp) })
	}

	fn set_xp<'a>(&'a self, user_id: &'a str, xp: i64) -> BoxFuture<'a, Result<()>> {
		self.xp.lock().expect("Profile lock poisoned.").insert(user_id.to_string(), xp.max(0));

		Box::pin(async move { Ok(()) })
	}

	fn add_xp<'a>(&'a self, user_id: &'a str, delta: i64) -> BoxFuture<'a, Result<(i64, i64)>> {
		let mut xp = self.xp.lock().expect("Profile lock poisoned.");
		let entry = xp.entry(user_id.to_string()).or_insert(0);
		let before = *entry;
		let after = procedio_domain::rewards::apply_delta(before, delta);

		*entry = after;

		Box::pin(async move { Ok((before, after)) })
	}
}

#[derive(Default)]
pub struct MemoryEscalations {
	pub rows: Mutex<Vec<Escalation>>,
}
impl EscalationStore for MemoryEscalations {
	fn record<'a>(&'a self, escalation: &'a Escalation) -> BoxFuture<'a, Result<()>> {
		self.rows.lock().expect("Escalation lock poisoned.").push(escalation.clone());

		Box::pin(async move { Ok(()) })
	}

	fn list<'a>(
		&'a self,
		status: Option<EscalationStatus>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Escalation>>> {
		let mut rows = self
			.rows
			.lock()
			.expect("Escalation lock poisoned.")
			.iter()
			.filter(|row| status.is_none_or(|status| row.status == status))
			.cloned()
			.collect::<Vec<_>>();

		rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		rows.truncate(limit as usize);

		Box::pin(async move { Ok(rows) })
	}

	fn resolve<'a>(
		&'a self,
		escalation_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Escalation>> {
		let mut rows = self.rows.lock().expect("Escalation lock poisoned.");
		let result = match rows.iter_mut().find(|row| row.escalation_id == escalation_id) {
			Some(row) => {
				if row.status == EscalationStatus::Open {
					row.status = EscalationStatus::Resolved;
					row.resolved_at = Some(now);
				}

				Ok(row.clone())
			},
			None => Err(Error::NotFound { message: format!("Escalation {escalation_id}.") }),
		};

		Box::pin(async move { result })
	}
}

pub struct Harness {
	pub service: ProcedioService,
	pub embedding: Arc<SpyEmbedding>,
	pub chat: Arc<SpyChat>,
	pub index: Arc<StaticIndex>,
	pub profiles: Arc<MemoryProfiles>,
	pub escalations: Arc<MemoryEscalations>,
}

pub fn harness(embedding: SpyEmbedding, chat: SpyChat, index: StaticIndex) -> Harness {
	harness_with(test_config(), embedding, chat, index, MemoryProfiles::default())
}

pub fn harness_with(
	cfg: Config,
	embedding: SpyEmbedding,
	chat: SpyChat,
	index: StaticIndex,
	profiles: MemoryProfiles,
) -> Harness {
	let embedding = Arc::new(embedding);
	let chat = Arc::new(chat);
	let index = Arc::new(index);
	let profiles = Arc::new(profiles);
	let escalations = Arc::new(MemoryEscalations::default());
	let providers = Providers::new(embedding.clone(), chat.clone());
	let stores = Stores::new(index.clone(), profiles.clone(), escalations.clone());
	let service = ProcedioService::with_stores(cfg, providers, stores);

	Harness { service, embedding, chat, index, profiles, escalations }
}
