use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
	data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
	index: Option<usize>,
	embedding: Vec<f32>,
}

/// Embeds `texts` in one request. Vectors come back in input order.
pub async fn embed(
	cfg: &procedio_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"encoding_format": "float",
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let res = crate::ensure_success("Embedding", res).await?;
	let bytes = res.bytes().await?;

	tracing::debug!(
		provider = %cfg.provider_id,
		inputs = texts.len(),
		"Embedding response received."
	);

	parse_embedding_response(&bytes, texts.len())
}

fn parse_embedding_response(bytes: &[u8], expected: usize) -> Result<Vec<Vec<f32>>> {
	let parsed: EmbeddingResponse = serde_json::from_slice(bytes)
		.map_err(|err| eyre::eyre!("Embedding response is malformed: {err}"))?;

	if parsed.data.len() != expected {
		return Err(eyre::eyre!(
			"Embedding response has {} vectors for {expected} inputs.",
			parsed.data.len()
		));
	}

	let mut indexed = parsed
		.data
		.into_iter()
		.enumerate()
		.map(|(position, item)| (item.index.unwrap_or(position), item.embedding))
		.collect::<Vec<_>>();

	indexed.sort_by_key(|(index, _)| *index);

	if indexed.iter().any(|(_, vector)| vector.is_empty()) {
		return Err(eyre::eyre!("Embedding response contains an empty vector."));
	}

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}
