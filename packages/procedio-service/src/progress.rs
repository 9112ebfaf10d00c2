use serde::{Deserialize, Serialize};

use procedio_domain::{
	celebration::{self, Celebrations, SeenProgressMarker},
	rewards::{RewardRejection, XpAction},
	xp,
};

use crate::{Error, ProcedioService, Result};

/// Everything a gamification surface shows for one XP total.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
	pub user_id: String,
	pub xp: i64,
	pub level: u32,
	pub title: String,
	pub next_title: String,
	pub floor: i64,
	pub ceiling: i64,
	pub within_level: i64,
	pub span: i64,
	pub fraction: f64,
	pub percent: f64,
	pub remaining: i64,
}
impl ProgressSnapshot {
	pub fn from_xp(user_id: &str, xp_points: i64) -> Self {
		let info = xp::describe(xp_points);

		Self {
			user_id: user_id.to_string(),
			xp: info.xp,
			level: info.level,
			title: info.title,
			next_title: info.next_title,
			floor: info.window.floor,
			ceiling: info.window.ceiling,
			within_level: info.window.within_level,
			span: info.window.span,
			fraction: info.window.fraction,
			percent: info.window.percent(),
			remaining: info.window.remaining(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardRequest {
	pub user_id: String,
	pub action: XpAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetXpRequest {
	pub user_id: String,
	pub xp: i64,
}

/// Before and after snapshots drive the reward animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardOutcome {
	pub before: ProgressSnapshot,
	pub after: ProgressSnapshot,
	pub leveled_up: bool,
}
impl AwardOutcome {
	fn new(user_id: &str, before_xp: i64, after_xp: i64) -> Self {
		let before = ProgressSnapshot::from_xp(user_id, before_xp);
		let after = ProgressSnapshot::from_xp(user_id, after_xp);
		let leveled_up = after.level > before.level;

		Self { before, after, leveled_up }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserveRequest {
	pub marker: SeenProgressMarker,
	pub level: u32,
	pub badge_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CelebrationOutcome {
	pub celebrations: Celebrations,
	pub marker: SeenProgressMarker,
}

impl ProcedioService {
	pub async fn progress(&self, user_id: &str) -> Result<ProgressSnapshot> {
		let user_id = required_user_id(user_id)?;
		let Some(xp_points) = self.stores.profiles.get_xp(user_id).await? else {
			return Err(Error::NotFound { message: format!("No profile for user {user_id:?}.") });
		};

		Ok(ProgressSnapshot::from_xp(user_id, xp_points))
	}

	pub async fn award_xp(&self, req: AwardRequest) -> Result<AwardOutcome> {
		let user_id = required_user_id(&req.user_id)?;
		let delta = req.action.delta().map_err(|rejection| match rejection {
			RewardRejection::NegativeReward => Error::InvalidRequest {
				message: format!("{} rewards must be non-negative.", req.action.as_str()),
			},
		})?;
		let (before_xp, after_xp) = self.stores.profiles.add_xp(user_id, delta).await?;
		let outcome = AwardOutcome::new(user_id, before_xp, after_xp);

		tracing::info!(
			user_id,
			action = req.action.as_str(),
			delta,
			before_xp,
			after_xp,
			leveled_up = outcome.leveled_up,
			"XP awarded."
		);

		Ok(outcome)
	}

	/// Manager override of a user's total.
	pub async fn set_xp(&self, req: SetXpRequest) -> Result<AwardOutcome> {
		let user_id = required_user_id(&req.user_id)?;

		if req.xp < 0 {
			return Err(Error::InvalidRequest { message: "xp must be non-negative.".to_string() });
		}

		let before_xp = self.stores.profiles.get_xp(user_id).await?.unwrap_or(0);

		self.stores.profiles.set_xp(user_id, req.xp).await?;

		tracing::info!(user_id, before_xp, after_xp = req.xp, "XP set.");

		Ok(AwardOutcome::new(user_id, before_xp, req.xp))
	}
}

/// Pure comparison against the caller's marker. The caller stores the returned marker.
pub fn observe_celebrations(req: ObserveRequest) -> Result<CelebrationOutcome> {
	if req.level == 0 {
		return Err(Error::InvalidRequest { message: "level must be at least 1.".to_string() });
	}

	let (celebrations, marker) = celebration::observe(&req.marker, req.level, req.badge_count);

	Ok(CelebrationOutcome { celebrations, marker })
}

fn required_user_id(user_id: &str) -> Result<&str> {
	let trimmed = user_id.trim();

	if trimmed.is_empty() {
		return Err(Error::InvalidRequest { message: "user_id must be non-empty.".to_string() });
	}

	Ok(trimmed)
}
