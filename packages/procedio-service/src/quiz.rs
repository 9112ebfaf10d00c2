//! Mastery quizzes generated from a document's own chunks.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use procedio_providers::chat;

use crate::{ChatRequest, Error, ProcedioService, Result, until_cancelled};

pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
	pub document_id: String,
	/// Used as source text when the document has no indexed chunks.
	#[serde(default)]
	pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
	pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
	pub q: String,
	pub options: Vec<String>,
	pub correct: usize,
	#[serde(default)]
	pub explanation: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuizPayload {
	Wrapped { questions: Vec<QuizQuestion> },
	Bare(Vec<QuizQuestion>),
}

impl ProcedioService {
	pub async fn generate_quiz(
		&self,
		req: QuizRequest,
		cancel: &CancellationToken,
	) -> Result<Quiz> {
		let document_id = req.document_id.trim();

		if document_id.is_empty() {
			return Err(Error::InvalidRequest {
				message: "documentId must be non-empty.".to_string(),
			});
		}

		let cfg = &self.cfg.quiz;
		let chunks = until_cancelled(
			cancel,
			self.stores.chunks.chunks_for_document(document_id, cfg.max_source_chunks),
		)
		.await?;
		let source = if !chunks.is_empty() {
			chunks.join("\n\n")
		} else {
			match req.title.as_deref().map(str::trim).filter(|title| !title.is_empty()) {
				Some(title) => {
					tracing::warn!(document_id, "No chunks indexed; quiz falls back to the title.");

					format!("Titre: {title}")
				},
				None =>
					return Err(Error::NotFound {
						message: format!("Document {document_id:?} has no indexed content."),
					}),
			}
		};
		let chat_req = ChatRequest {
			system: cfg.system_prompt.replace("{count}", &cfg.question_count.to_string()),
			user: format!("PROCÉDURE SOURCE :\n{source}"),
			temperature: Some(cfg.temperature),
			json_mode: true,
		};
		let raw = self.complete_chat(&chat_req, cancel).await?;
		let quiz = parse_quiz(&raw, cfg.question_count as usize)?;

		tracing::info!(document_id, questions = quiz.questions.len(), "Quiz generated.");

		Ok(quiz)
	}
}

/// Accepts `{"questions": [...]}` or a bare array. Keeps at most `max_questions`.
pub fn parse_quiz(raw: &str, max_questions: usize) -> Result<Quiz> {
	let payload: QuizPayload = serde_json::from_str(chat::json_payload(raw)).map_err(|err| {
		Error::MalformedModelOutput {
			message: format!("Quiz output is not a question list: {err}."),
		}
	})?;
	let mut questions = match payload {
		QuizPayload::Wrapped { questions } | QuizPayload::Bare(questions) => questions,
	};

	if questions.is_empty() {
		return Err(Error::MalformedModelOutput {
			message: "Quiz output contains no questions.".to_string(),
		});
	}

	for (index, question) in questions.iter().enumerate() {
		validate_question(index, question)?;
	}

	questions.truncate(max_questions.max(1));

	Ok(Quiz { questions })
}

fn validate_question(index: usize, question: &QuizQuestion) -> Result<()> {
	let malformed = |detail: &str| Error::MalformedModelOutput {
		message: format!("Quiz question {index} {detail}."),
	};

	if question.q.trim().is_empty() {
		return Err(malformed("has no text"));
	}
	if question.options.len() != OPTIONS_PER_QUESTION {
		return Err(malformed(&format!(
			"has {} options instead of {OPTIONS_PER_QUESTION}",
			question.options.len()
		)));
	}
	if question.options.iter().any(|option| option.trim().is_empty()) {
		return Err(malformed("has a blank option"));
	}
	if question.correct >= question.options.len() {
		return Err(malformed("points to a missing answer"));
	}

	Ok(())
}
