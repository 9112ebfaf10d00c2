use serde_json::Value;
use uuid::Uuid;

use crate::{
	Error, Result,
	db::Db,
	models::{ChunkMatch, DocumentChunk},
};

/// Nearest chunks by cosine similarity, best first.
pub async fn match_chunks(
	db: &Db,
	embedding: &[f32],
	match_count: u32,
	document_id: Option<&str>,
) -> Result<Vec<ChunkMatch>> {
	if embedding.is_empty() {
		return Err(Error::InvalidArgument("Query embedding must not be empty.".to_string()));
	}

	let vec_text = vector_to_pg(embedding);
	let rows = sqlx::query_as::<_, ChunkMatch>(
		"\
SELECT
	chunk_id,
	document_id,
	content,
	metadata,
	(1 - (embedding <=> $1::text::vector))::real AS similarity
FROM document_chunks
WHERE $2::text IS NULL OR document_id = $2
ORDER BY embedding <=> $1::text::vector
LIMIT $3",
	)
	.bind(vec_text.as_str())
	.bind(document_id)
	.bind(i64::from(match_count))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn chunks_for_document(
	db: &Db,
	document_id: &str,
	limit: u32,
) -> Result<Vec<DocumentChunk>> {
	let rows = sqlx::query_as::<_, DocumentChunk>(
		"\
SELECT chunk_id, document_id, chunk_index, content, metadata
FROM document_chunks
WHERE document_id = $1
ORDER BY chunk_index ASC, created_at ASC
LIMIT $2",
	)
	.bind(document_id)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Writes one pre-embedded chunk. Used by ingestion jobs and fixtures.
pub async fn insert_chunk(
	db: &Db,
	document_id: &str,
	chunk_index: i32,
	content: &str,
	embedding: &[f32],
	metadata: &Value,
) -> Result<Uuid> {
	let chunk_id = Uuid::new_v4();
	let vec_text = vector_to_pg(embedding);

	sqlx::query(
		"\
INSERT INTO document_chunks (chunk_id, document_id, chunk_index, content, embedding, metadata)
VALUES ($1, $2, $3, $4, $5::text::vector, $6)",
	)
	.bind(chunk_id)
	.bind(document_id)
	.bind(chunk_index)
	.bind(content)
	.bind(vec_text.as_str())
	.bind(metadata)
	.execute(&db.pool)
	.await?;

	Ok(chunk_id)
}

pub fn vector_to_pg(vec: &[f32]) -> String {
	let mut out = String::with_capacity(vec.len() * 8);

	out.push('[');

	for (i, value) in vec.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}

		out.push_str(&value.to_string());
	}

	out.push(']');

	out
}
