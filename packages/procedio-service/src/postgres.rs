//! Postgres + pgvector implementations of the service collaborators.

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use procedio_storage::{
	chunks, db::Db, escalations, models::Escalation as EscalationRow, profiles,
};

use crate::{
	BoxFuture, ChunkIndex, Error, EscalationStore, ProfileStore, Result, RetrievalChunk,
	copilot::DEFAULT_DOCUMENT_TITLE,
	escalation::{Escalation, EscalationStatus},
};

pub struct PostgresStore {
	db: Db,
}
impl PostgresStore {
	pub fn new(db: Db) -> Self {
		Self { db }
	}
}

impl ChunkIndex for PostgresStore {
	fn search<'a>(
		&'a self,
		embedding: &'a [f32],
		k: u32,
		document_id: Option<&'a str>,
	) -> BoxFuture<'a, Result<Vec<RetrievalChunk>>> {
		Box::pin(async move {
			let rows = chunks::match_chunks(&self.db, embedding, k, document_id).await?;

			Ok(rows
				.into_iter()
				.map(|row| RetrievalChunk {
					title: metadata_text(&row.metadata, "title")
						.unwrap_or_else(|| DEFAULT_DOCUMENT_TITLE.to_string()),
					storage_path: metadata_text(&row.metadata, "storage_path"),
					content: row.content,
					similarity: row.similarity,
				})
				.collect())
		})
	}

	fn chunks_for_document<'a>(
		&'a self,
		document_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let rows = chunks::chunks_for_document(&self.db, document_id, limit).await?;

			Ok(rows.into_iter().map(|row| row.content).collect())
		})
	}
}

impl ProfileStore for PostgresStore {
	fn get_xp<'a>(&'a self, user_id: &'a str) -> BoxFuture<'a, Result<Option<i64>>> {
		Box::pin(async move {
			let profile = profiles::get_profile(&self.db, user_id).await?;

			Ok(profile.map(|profile| profile.xp_points))
		})
	}

	fn set_xp<'a>(&'a self, user_id: &'a str, xp: i64) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			profiles::set_xp(&self.db, user_id, xp).await?;

			Ok(())
		})
	}

	fn add_xp<'a>(&'a self, user_id: &'a str, delta: i64) -> BoxFuture<'a, Result<(i64, i64)>> {
		Box::pin(async move { Ok(profiles::add_xp(&self.db, user_id, delta).await?) })
	}
}

impl EscalationStore for PostgresStore {
	fn record<'a>(&'a self, escalation: &'a Escalation) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let row = EscalationRow {
				escalation_id: escalation.escalation_id,
				user_id: escalation.user_id.clone(),
				requester_name: escalation.requester_name.clone(),
				question: escalation.question.clone(),
				status: escalation.status.as_str().to_string(),
				created_at: escalation.created_at,
				resolved_at: escalation.resolved_at,
			};

			escalations::insert_escalation(&self.db, &row).await?;

			Ok(())
		})
	}

	fn list<'a>(
		&'a self,
		status: Option<EscalationStatus>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<Escalation>>> {
		Box::pin(async move {
			let rows = escalations::list_escalations(
				&self.db,
				status.map(EscalationStatus::as_str),
				limit,
			)
			.await?;

			rows.into_iter().map(escalation_from_row).collect()
		})
	}

	fn resolve<'a>(
		&'a self,
		escalation_id: Uuid,
		now: OffsetDateTime,
	) -> BoxFuture<'a, Result<Escalation>> {
		Box::pin(async move {
			let row = escalations::resolve_escalation(&self.db, escalation_id, now).await?;

			escalation_from_row(row)
		})
	}
}

fn escalation_from_row(row: EscalationRow) -> Result<Escalation> {
	let Some(status) = EscalationStatus::parse(&row.status) else {
		return Err(Error::Storage {
			message: format!(
				"Escalation {} has unknown status {:?}.",
				row.escalation_id, row.status
			),
		});
	};

	Ok(Escalation {
		escalation_id: row.escalation_id,
		user_id: row.user_id,
		requester_name: row.requester_name,
		question: row.question,
		status,
		created_at: row.created_at,
		resolved_at: row.resolved_at,
	})
}

fn metadata_text(metadata: &Value, key: &str) -> Option<String> {
	metadata
		.get(key)
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string)
}
