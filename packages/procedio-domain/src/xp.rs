//! Experience curve, levels, and rank titles.
//!
//! XP is the only authoritative value. Levels, titles, and progress windows are always derived
//! from it and are never read back from storage.

use serde::{Deserialize, Serialize};

/// Minimum XP of each level, indexed by `level - 1`.
pub const XP_THRESHOLDS: [i64; 10] =
	[0, 200, 800, 2_400, 6_000, 15_000, 30_000, 60_000, 120_000, 250_000];

pub const MAX_DEFINED_LEVEL: u32 = XP_THRESHOLDS.len() as u32;

const RANK_TITLES: [&str; 10] = [
	"Vagabond",
	"Apprenti",
	"Intervenant",
	"Confirmé",
	"Référent",
	"Expert",
	"Spécialiste",
	"Maître d'Armes",
	"Consultant Élite",
	"Légende Vivante",
];
const OVERFLOW_TITLE: &str = "Dieu de la Machine";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressWindow {
	pub floor: i64,
	pub ceiling: i64,
	pub within_level: i64,
	pub span: i64,
	pub fraction: f64,
}
impl ProgressWindow {
	pub fn new(xp: i64, level: u32) -> Self {
		let xp = xp.max(0);
		let floor = floor_xp_for_level(level);
		let ceiling = ceiling_xp_for_level(level);
		let within_level = xp - floor;
		let span = (ceiling - floor).max(1);
		let fraction = (within_level as f64 / span as f64).clamp(0.0, 1.0);

		Self { floor, ceiling, within_level, span, fraction }
	}

	pub fn percent(&self) -> f64 {
		(self.fraction * 100.0).clamp(0.0, 100.0)
	}

	/// XP still missing before the ceiling is reached.
	pub fn remaining(&self) -> i64 {
		(self.span - self.within_level).max(0)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
	pub xp: i64,
	pub level: u32,
	pub title: String,
	pub next_title: String,
	pub window: ProgressWindow,
}

pub fn level_for_xp(xp: i64) -> u32 {
	let xp = xp.max(0);

	for (index, threshold) in XP_THRESHOLDS.iter().enumerate().rev() {
		if xp >= *threshold {
			return index as u32 + 1;
		}
	}

	1
}

pub fn floor_xp_for_level(level: u32) -> i64 {
	if level <= 1 {
		return 0;
	}

	XP_THRESHOLDS
		.get(level as usize - 1)
		.copied()
		.unwrap_or(XP_THRESHOLDS[XP_THRESHOLDS.len() - 1])
}

/// Start of the next level. At and beyond the last defined level the curve has no next floor, so
/// a soft cap of 1.5x the last threshold keeps the span non-zero.
pub fn ceiling_xp_for_level(level: u32) -> i64 {
	let level = level.max(1);

	match XP_THRESHOLDS.get(level as usize) {
		Some(next_floor) => *next_floor,
		None => XP_THRESHOLDS[XP_THRESHOLDS.len() - 1] * 3 / 2,
	}
}

pub fn rank_title(level: u32) -> &'static str {
	if level > MAX_DEFINED_LEVEL {
		return OVERFLOW_TITLE;
	}

	RANK_TITLES[level.max(1) as usize - 1]
}

pub fn describe(xp: i64) -> LevelInfo {
	let xp = xp.max(0);
	let level = level_for_xp(xp);

	LevelInfo {
		xp,
		level,
		title: rank_title(level).to_string(),
		next_title: rank_title(level + 1).to_string(),
		window: ProgressWindow::new(xp, level),
	}
}
