use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ChunkMatch {
	pub chunk_id: Uuid,
	pub document_id: String,
	pub content: String,
	pub metadata: Value,
	pub similarity: f32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct DocumentChunk {
	pub chunk_id: Uuid,
	pub document_id: String,
	pub chunk_index: i32,
	pub content: String,
	pub metadata: Value,
}

#[derive(Debug, sqlx::FromRow)]
pub struct UserProfile {
	pub user_id: String,
	pub xp_points: i64,
	pub level: i32,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Escalation {
	pub escalation_id: Uuid,
	pub user_id: String,
	pub requester_name: String,
	pub question: String,
	pub status: String,
	pub created_at: OffsetDateTime,
	pub resolved_at: Option<OffsetDateTime>,
}
