use serde::{Deserialize, Serialize};

pub const READ_PROCEDURE_XP: i64 = 5;
pub const READ_FLASH_NOTE_XP: i64 = 5;
pub const SUGGESTION_APPROVED_XP: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XpAction {
	ReadProcedure,
	ReadFlashNote,
	SuggestionApproved,
	MissionCompleted { xp: i64 },
	BadgeUnlocked { xp_reward: i64 },
	/// Manager correction. May be negative.
	Adjustment { delta: i64 },
}
impl XpAction {
	pub fn delta(&self) -> Result<i64, RewardRejection> {
		match *self {
			Self::ReadProcedure => Ok(READ_PROCEDURE_XP),
			Self::ReadFlashNote => Ok(READ_FLASH_NOTE_XP),
			Self::SuggestionApproved => Ok(SUGGESTION_APPROVED_XP),
			Self::MissionCompleted { xp } if xp < 0 => Err(RewardRejection::NegativeReward),
			Self::MissionCompleted { xp } => Ok(xp),
			Self::BadgeUnlocked { xp_reward } if xp_reward < 0 =>
				Err(RewardRejection::NegativeReward),
			Self::BadgeUnlocked { xp_reward } => Ok(xp_reward),
			Self::Adjustment { delta } => Ok(delta),
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ReadProcedure => "read_procedure",
			Self::ReadFlashNote => "read_flash_note",
			Self::SuggestionApproved => "suggestion_approved",
			Self::MissionCompleted { .. } => "mission_completed",
			Self::BadgeUnlocked { .. } => "badge_unlocked",
			Self::Adjustment { .. } => "adjustment",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardRejection {
	NegativeReward,
}

/// XP after applying `delta`. Never below zero.
pub fn apply_delta(xp: i64, delta: i64) -> i64 {
	xp.max(0).saturating_add(delta).max(0)
}
