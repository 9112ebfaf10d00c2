//! One-time celebrations (level-up, badge unlock) for a client session.
//!
//! The client owns a [`SeenProgressMarker`] and passes it in with every observation; nothing here
//! keeps state between calls.

use serde::{Deserialize, Serialize};

use crate::xp;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenProgressMarker {
	pub user_id: String,
	/// Zero until the first observation has been recorded.
	pub last_seen_level: u32,
	pub last_seen_badge_count: u32,
}
impl SeenProgressMarker {
	pub fn new(user_id: impl Into<String>) -> Self {
		Self { user_id: user_id.into(), last_seen_level: 0, last_seen_badge_count: 0 }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUp {
	pub level: u32,
	pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Celebrations {
	pub level_up: Option<LevelUp>,
	pub new_badges: u32,
}
impl Celebrations {
	pub fn is_empty(&self) -> bool {
		self.level_up.is_none() && self.new_badges == 0
	}
}

/// Compares the current level and badge count with what the client last celebrated.
///
/// Returns the celebrations to show and the marker to store in their place. A marker whose
/// `last_seen_level` is zero has never been observed and only records the current values. Levels
/// start at 1, so a zero badge count is an ordinary observation.
pub fn observe(
	marker: &SeenProgressMarker,
	level: u32,
	badge_count: u32,
) -> (Celebrations, SeenProgressMarker) {
	let observed = marker.last_seen_level != 0;
	let level_up = (observed && level > marker.last_seen_level)
		.then(|| LevelUp { level, title: xp::rank_title(level).to_string() });
	let new_badges =
		if observed { badge_count.saturating_sub(marker.last_seen_badge_count) } else { 0 };
	let next = SeenProgressMarker {
		user_id: marker.user_id.clone(),
		last_seen_level: level,
		last_seen_badge_count: badge_count,
	};

	(Celebrations { level_up, new_badges }, next)
}
