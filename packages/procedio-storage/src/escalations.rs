use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, db::Db, models::Escalation};

pub const STATUS_OPEN: &str = "open";
pub const STATUS_RESOLVED: &str = "resolved";

pub async fn insert_escalation(db: &Db, escalation: &Escalation) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO escalations (
	escalation_id,
	user_id,
	requester_name,
	question,
	status,
	created_at,
	resolved_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
	)
	.bind(escalation.escalation_id)
	.bind(escalation.user_id.as_str())
	.bind(escalation.requester_name.as_str())
	.bind(escalation.question.as_str())
	.bind(escalation.status.as_str())
	.bind(escalation.created_at)
	.bind(escalation.resolved_at)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Newest first.
pub async fn list_escalations(
	db: &Db,
	status: Option<&str>,
	limit: u32,
) -> Result<Vec<Escalation>> {
	match status {
		None | Some(STATUS_OPEN) | Some(STATUS_RESOLVED) => {},
		Some(other) =>
			return Err(Error::InvalidArgument(format!("Unknown escalation status {other:?}."))),
	}

	let rows = sqlx::query_as::<_, Escalation>(
		"\
SELECT escalation_id, user_id, requester_name, question, status, created_at, resolved_at
FROM escalations
WHERE $1::text IS NULL OR status = $1
ORDER BY created_at DESC
LIMIT $2",
	)
	.bind(status)
	.bind(i64::from(limit))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Marks an escalation resolved. Resolving an already resolved row returns it unchanged.
pub async fn resolve_escalation(
	db: &Db,
	escalation_id: Uuid,
	now: OffsetDateTime,
) -> Result<Escalation> {
	let row = sqlx::query_as::<_, Escalation>(
		"\
UPDATE escalations
SET
	status = $2,
	resolved_at = COALESCE(resolved_at, $3)
WHERE escalation_id = $1
RETURNING escalation_id, user_id, requester_name, question, status, created_at, resolved_at",
	)
	.bind(escalation_id)
	.bind(STATUS_RESOLVED)
	.bind(now)
	.fetch_optional(&db.pool)
	.await?;

	row.ok_or_else(|| Error::NotFound(format!("Escalation {escalation_id} does not exist.")))
}
