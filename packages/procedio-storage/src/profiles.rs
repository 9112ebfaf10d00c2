use procedio_domain::{rewards, xp};

use crate::{Result, db::Db, models::UserProfile};

pub async fn get_profile(db: &Db, user_id: &str) -> Result<Option<UserProfile>> {
	let row = sqlx::query_as::<_, UserProfile>(
		"\
SELECT user_id, xp_points, level, updated_at
FROM user_profiles
WHERE user_id = $1",
	)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Stores `xp_points` and the level derived from it.
pub async fn set_xp(db: &Db, user_id: &str, xp_points: i64) -> Result<UserProfile> {
	let xp_points = xp_points.max(0);
	let level = stored_level(xp_points);
	let row = sqlx::query_as::<_, UserProfile>(
		"\
INSERT INTO user_profiles (user_id, xp_points, level, updated_at)
VALUES ($1, $2, $3, now())
ON CONFLICT (user_id) DO UPDATE
SET xp_points = EXCLUDED.xp_points, level = EXCLUDED.level, updated_at = now()
RETURNING user_id, xp_points, level, updated_at",
	)
	.bind(user_id)
	.bind(xp_points)
	.bind(level)
	.fetch_one(&db.pool)
	.await?;

	Ok(row)
}

/// Applies `delta` atomically and returns XP before and after. Creates the profile at 0 XP.
pub async fn add_xp(db: &Db, user_id: &str, delta: i64) -> Result<(i64, i64)> {
	let mut tx = db.pool.begin().await?;

	sqlx::query(
		"\
INSERT INTO user_profiles (user_id, xp_points, level)
VALUES ($1, 0, 1)
ON CONFLICT (user_id) DO NOTHING",
	)
	.bind(user_id)
	.execute(&mut *tx)
	.await?;

	let before: i64 =
		sqlx::query_scalar("SELECT xp_points FROM user_profiles WHERE user_id = $1 FOR UPDATE")
			.bind(user_id)
			.fetch_one(&mut *tx)
			.await?;
	let after = rewards::apply_delta(before, delta);

	sqlx::query(
		"\
UPDATE user_profiles
SET xp_points = $2, level = $3, updated_at = now()
WHERE user_id = $1",
	)
	.bind(user_id)
	.bind(after)
	.bind(stored_level(after))
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	Ok((before, after))
}

fn stored_level(xp_points: i64) -> i32 {
	i32::try_from(xp::level_for_xp(xp_points)).unwrap_or(i32::MAX)
}
