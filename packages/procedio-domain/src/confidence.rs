use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
	Expert,
	Explorer,
	Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
	pub high: f32,
	pub low: f32,
}
impl ConfidenceThresholds {
	pub const fn new(high: f32, low: f32) -> Self {
		Self { high, low }
	}

	/// `high` is exclusive for Expert, `low` is inclusive for Explorer. A NaN score never clears
	/// either bound.
	pub fn classify(&self, top_score: f32) -> ConfidenceTier {
		if top_score > self.high {
			ConfidenceTier::Expert
		} else if top_score >= self.low {
			ConfidenceTier::Explorer
		} else {
			ConfidenceTier::Uncertain
		}
	}
}
impl Default for ConfidenceThresholds {
	fn default() -> Self {
		Self::new(0.82, 0.50)
	}
}

/// Top score of a result list ordered by descending similarity. Empty lists score zero.
pub fn top_score(similarities: &[f32]) -> f32 {
	similarities.first().copied().filter(|score| score.is_finite()).unwrap_or(0.0)
}
