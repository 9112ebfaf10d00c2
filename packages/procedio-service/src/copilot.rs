//! Confidence-tiered answering of copilot questions.
//!
//! One pass per question: embed, search, then branch on the best similarity. Above the high
//! threshold the chat model answers from the retrieved context (Expert). Between the thresholds
//! the chunks are returned grouped by document with model-written labels (Explorer). Below the low
//! threshold, or with no results at all, the caller is offered an escalation (Uncertain).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use procedio_domain::confidence::{self, ConfidenceThresholds, ConfidenceTier};
use procedio_providers::chat;

use crate::{ChatRequest, Error, ProcedioService, Result, RetrievalChunk, until_cancelled};

pub const DEFAULT_DOCUMENT_TITLE: &str = "Document";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
	pub question: String,
	#[serde(default)]
	pub user_name: String,
	#[serde(default)]
	pub user_id: String,
	/// Restricts the search to one document.
	#[serde(default)]
	pub document_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
	#[serde(rename = "source")]
	pub title: String,
	#[serde(rename = "sourcePath")]
	pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResponseMode {
	Expert {
		#[serde(rename = "output")]
		answer_text: String,
		score: f32,
		#[serde(flatten)]
		citation: Citation,
	},
	Explorer {
		#[serde(rename = "output")]
		summary_text: String,
		#[serde(rename = "groupedSuggestions")]
		groups: Vec<DocumentGroup>,
	},
	Uncertain {
		#[serde(rename = "output")]
		prompt_text: String,
		score: f32,
		#[serde(rename = "escalationAvailable")]
		escalation_available: bool,
	},
}
impl ResponseMode {
	pub fn tier(&self) -> ConfidenceTier {
		match self {
			Self::Expert { .. } => ConfidenceTier::Expert,
			Self::Explorer { .. } => ConfidenceTier::Explorer,
			Self::Uncertain { .. } => ConfidenceTier::Uncertain,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentGroup {
	pub title: String,
	pub path: Option<String>,
	pub chunks: Vec<SuggestedChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedChunk {
	pub label: String,
	pub content: String,
	pub score: f32,
}

#[derive(Debug, Default, PartialEq)]
struct ExplorerOutput {
	summary: Option<String>,
	labels: Vec<Option<String>>,
}

impl ProcedioService {
	pub async fn route(
		&self,
		req: RouteRequest,
		cancel: &CancellationToken,
	) -> Result<ResponseMode> {
		let question = req.question.trim();

		if question.is_empty() {
			return Err(Error::InvalidRequest {
				message: "question must be non-empty.".to_string(),
			});
		}

		let document_id = req.document_id.as_deref().map(str::trim).filter(|id| !id.is_empty());
		let embedding = self.embed_question(question, cancel).await?;
		let chunks = self.search_chunks(&embedding, document_id, cancel).await?;
		let copilot = &self.cfg.copilot;
		let thresholds = ConfidenceThresholds::new(copilot.high_threshold, copilot.low_threshold);
		let similarities = chunks.iter().map(|chunk| chunk.similarity).collect::<Vec<_>>();
		let top_score = confidence::top_score(&similarities);
		let tier = if chunks.is_empty() {
			ConfidenceTier::Uncertain
		} else {
			thresholds.classify(top_score)
		};

		tracing::info!(
			user_id = %req.user_id,
			results = chunks.len(),
			top_score,
			tier = ?tier,
			"Copilot question routed."
		);

		match tier {
			ConfidenceTier::Expert =>
				self.answer_expert(question, &req.user_name, &chunks, top_score, cancel).await,
			ConfidenceTier::Explorer =>
				self.suggest_explorer(question, &req.user_name, &chunks, cancel).await,
			ConfidenceTier::Uncertain => Ok(ResponseMode::Uncertain {
				prompt_text: copilot.prompts.uncertain_message.clone(),
				score: top_score,
				escalation_available: true,
			}),
		}
	}

	async fn embed_question(&self, question: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
		let texts = [question.to_string()];
		let embeddings = until_cancelled(cancel, async {
			self.providers
				.embedding
				.embed(&self.cfg.providers.embedding, &texts)
				.await
				.map_err(Error::from)
		})
		.await?;
		let Some(vector) = embeddings.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let expected = self.cfg.storage.vector_dim as usize;

		if vector.len() != expected {
			return Err(Error::Provider {
				message: format!(
					"Embedding vector dimension mismatch: expected {expected}, got {}.",
					vector.len()
				),
			});
		}

		Ok(vector)
	}

	async fn search_chunks(
		&self,
		embedding: &[f32],
		document_id: Option<&str>,
		cancel: &CancellationToken,
	) -> Result<Vec<RetrievalChunk>> {
		let timeout_ms = self.cfg.copilot.search_timeout_ms;
		let search =
			self.stores.chunks.search(embedding, self.cfg.copilot.match_count, document_id);

		until_cancelled(cancel, async {
			tokio::time::timeout(Duration::from_millis(timeout_ms), search).await.map_err(|_| {
				Error::Storage {
					message: format!("Vector search timed out after {timeout_ms} ms."),
				}
			})?
		})
		.await
	}

	async fn answer_expert(
		&self,
		question: &str,
		user_name: &str,
		chunks: &[RetrievalChunk],
		top_score: f32,
		cancel: &CancellationToken,
	) -> Result<ResponseMode> {
		let prompts = &self.cfg.copilot.prompts;
		let context = chunks.iter().map(|chunk| chunk.content.as_str()).collect::<Vec<_>>();
		let req = ChatRequest {
			system: render_prompt(
				&prompts.expert_system,
				requester_name(user_name, &prompts.anonymous_requester),
				question,
			),
			user: format!("CONTEXTE:\n{}\n\nQUESTION: {question}", context.join("\n\n")),
			temperature: Some(self.cfg.copilot.expert_temperature),
			json_mode: false,
		};
		let answer_text = self.complete_chat(&req, cancel).await?;
		let citation = chunks
			.first()
			.map(|top| Citation {
				title: document_title(top).to_string(),
				path: top.storage_path.clone(),
			})
			.unwrap_or_else(|| Citation { title: DEFAULT_DOCUMENT_TITLE.to_string(), path: None });

		Ok(ResponseMode::Expert { answer_text, score: top_score, citation })
	}

	async fn suggest_explorer(
		&self,
		question: &str,
		user_name: &str,
		chunks: &[RetrievalChunk],
		cancel: &CancellationToken,
	) -> Result<ResponseMode> {
		let copilot = &self.cfg.copilot;
		let prompts = &copilot.prompts;
		let excerpt_chars = copilot.explorer_excerpt_chars as usize;
		let excerpts = chunks
			.iter()
			.enumerate()
			.map(|(index, chunk)| {
				format!("[{index}] {}", truncate_chars(&chunk.content, excerpt_chars))
			})
			.collect::<Vec<_>>();
		let req = ChatRequest {
			system: render_prompt(
				&prompts.explorer_system,
				requester_name(user_name, &prompts.anonymous_requester),
				question,
			),
			user: excerpts.join("\n"),
			temperature: Some(copilot.explorer_temperature),
			json_mode: true,
		};
		let raw = self.complete_chat(&req, cancel).await?;
		let output = parse_explorer_output(&raw)?;
		let missing_labels = chunks.len().saturating_sub(
			output.labels.iter().take(chunks.len()).filter(|label| label.is_some()).count(),
		);

		if missing_labels > 0 {
			tracing::debug!(missing_labels, "Explorer output is missing labels.");
		}

		Ok(ResponseMode::Explorer {
			summary_text: output.summary.unwrap_or_else(|| prompts.default_summary.clone()),
			groups: group_by_document(chunks, &output.labels, &prompts.default_label),
		})
	}

	pub(crate) async fn complete_chat(
		&self,
		req: &ChatRequest,
		cancel: &CancellationToken,
	) -> Result<String> {
		until_cancelled(cancel, async {
			self.providers.chat.complete(&self.cfg.providers.chat, req).await.map_err(Error::from)
		})
		.await
	}
}

/// Groups chunks by document title in first-seen order, keeping chunk order inside each group.
pub fn group_by_document(
	chunks: &[RetrievalChunk],
	labels: &[Option<String>],
	default_label: &str,
) -> Vec<DocumentGroup> {
	let mut groups: Vec<DocumentGroup> = Vec::new();

	for (index, chunk) in chunks.iter().enumerate() {
		let title = document_title(chunk);
		let label = labels
			.get(index)
			.and_then(|label| label.clone())
			.unwrap_or_else(|| default_label.to_string());
		let suggestion =
			SuggestedChunk { label, content: chunk.content.clone(), score: chunk.similarity };

		match groups.iter_mut().find(|group| group.title == title) {
			Some(group) => group.chunks.push(suggestion),
			None => groups.push(DocumentGroup {
				title: title.to_string(),
				path: chunk.storage_path.clone(),
				chunks: vec![suggestion],
			}),
		}
	}

	groups
}

/// Substitutes `{user_name}` and `{question}` in one pass. Inserted text is never rescanned.
pub(crate) fn render_prompt(template: &str, user_name: &str, question: &str) -> String {
	let mut out = String::with_capacity(template.len() + user_name.len() + question.len());
	let mut rest = template;

	while let Some(start) = rest.find('{') {
		out.push_str(&rest[..start]);

		let tail = &rest[start..];
		let (value, placeholder_len) = if tail.starts_with("{user_name}") {
			(user_name, "{user_name}".len())
		} else if tail.starts_with("{question}") {
			(question, "{question}".len())
		} else {
			("{", 1)
		};

		out.push_str(value);

		rest = &tail[placeholder_len..];
	}

	out.push_str(rest);

	out
}

fn requester_name<'a>(user_name: &'a str, anonymous: &'a str) -> &'a str {
	let trimmed = user_name.trim();

	if trimmed.is_empty() { anonymous } else { trimmed }
}

fn document_title(chunk: &RetrievalChunk) -> &str {
	let trimmed = chunk.title.trim();

	if trimmed.is_empty() { DEFAULT_DOCUMENT_TITLE } else { trimmed }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((byte_index, _)) => &text[..byte_index],
		None => text,
	}
}

/// Output that is not a JSON object fails closed. Missing or blank fields inside a valid object
/// are left to the configured defaults.
fn parse_explorer_output(raw: &str) -> Result<ExplorerOutput> {
	let value: Value = serde_json::from_str(chat::json_payload(raw)).map_err(|err| {
		Error::MalformedModelOutput {
			message: format!("Explorer output is not valid JSON: {err}."),
		}
	})?;
	let Value::Object(map) = value else {
		return Err(Error::MalformedModelOutput {
			message: "Explorer output must be a JSON object.".to_string(),
		});
	};
	let summary = map.get("summary").and_then(non_blank);
	let labels = match map.get("labels") {
		Some(Value::Array(items)) => items.iter().map(non_blank).collect(),
		_ => Vec::new(),
	};

	Ok(ExplorerOutput { summary, labels })
}

fn non_blank(value: &Value) -> Option<String> {
	value.as_str().map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}
