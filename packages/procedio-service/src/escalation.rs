use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, ProcedioService, Result};

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscalationStatus {
	Open,
	Resolved,
}
impl EscalationStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Open => procedio_storage::escalations::STATUS_OPEN,
			Self::Resolved => procedio_storage::escalations::STATUS_RESOLVED,
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			procedio_storage::escalations::STATUS_OPEN => Some(Self::Open),
			procedio_storage::escalations::STATUS_RESOLVED => Some(Self::Resolved),
			_ => None,
		}
	}
}

/// A question the copilot could not answer, forwarded to a manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
	pub escalation_id: Uuid,
	pub user_id: String,
	pub requester_name: String,
	pub question: String,
	pub status: EscalationStatus,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub resolved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateRequest {
	pub user_id: String,
	#[serde(default)]
	pub user_name: String,
	pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationReceipt {
	pub escalation_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEscalationsRequest {
	#[serde(default)]
	pub status: Option<EscalationStatus>,
	#[serde(default)]
	pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EscalationList {
	pub items: Vec<Escalation>,
}

impl ProcedioService {
	/// Records one escalation per call. Only an explicit client action reaches this.
	pub async fn escalate(&self, req: EscalateRequest) -> Result<EscalationReceipt> {
		let user_id = req.user_id.trim();
		let question = req.question.trim();

		if user_id.is_empty() {
			return Err(Error::InvalidRequest { message: "userId must be non-empty.".to_string() });
		}
		if question.is_empty() {
			return Err(Error::InvalidRequest {
				message: "question must be non-empty.".to_string(),
			});
		}

		let user_name = req.user_name.trim();
		let requester_name = if user_name.is_empty() {
			self.cfg.copilot.prompts.anonymous_requester.clone()
		} else {
			user_name.to_string()
		};
		let escalation = Escalation {
			escalation_id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			requester_name,
			question: question.to_string(),
			status: EscalationStatus::Open,
			created_at: OffsetDateTime::now_utc(),
			resolved_at: None,
		};

		self.stores.escalations.record(&escalation).await?;

		tracing::info!(
			escalation_id = %escalation.escalation_id,
			user_id = %escalation.user_id,
			"Copilot question escalated."
		);

		Ok(EscalationReceipt {
			escalation_id: escalation.escalation_id,
			created_at: escalation.created_at,
		})
	}

	pub async fn list_escalations(&self, req: ListEscalationsRequest) -> Result<EscalationList> {
		let limit = req.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
		let items = self.stores.escalations.list(req.status, limit).await?;

		Ok(EscalationList { items })
	}

	/// Resolving an already resolved escalation returns it unchanged.
	pub async fn resolve_escalation(&self, escalation_id: Uuid) -> Result<Escalation> {
		let escalation =
			self.stores.escalations.resolve(escalation_id, OffsetDateTime::now_utc()).await?;

		tracing::info!(escalation_id = %escalation_id, "Escalation resolved.");

		Ok(escalation)
	}
}
