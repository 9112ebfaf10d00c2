mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Copilot, EmbeddingProviderConfig, LlmProviderConfig, Postgres, PromptSet, Providers,
	Quiz, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.vector_dim.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("chat", &cfg.providers.chat.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("embedding", cfg.providers.embedding.timeout_ms),
		("chat", cfg.providers.chat.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	validate_copilot(&cfg.copilot)?;
	validate_quiz(&cfg.quiz)?;

	Ok(())
}

fn validate_copilot(copilot: &Copilot) -> Result<()> {
	for (label, value) in [
		("copilot.high_threshold", copilot.high_threshold),
		("copilot.low_threshold", copilot.low_threshold),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if copilot.low_threshold > copilot.high_threshold {
		return Err(Error::Validation {
			message: "copilot.low_threshold must be less than or equal to copilot.high_threshold."
				.to_string(),
		});
	}
	if copilot.match_count == 0 {
		return Err(Error::Validation {
			message: "copilot.match_count must be greater than zero.".to_string(),
		});
	}
	if copilot.explorer_excerpt_chars == 0 {
		return Err(Error::Validation {
			message: "copilot.explorer_excerpt_chars must be greater than zero.".to_string(),
		});
	}
	if copilot.search_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "copilot.search_timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("copilot.expert_temperature", copilot.expert_temperature),
		("copilot.explorer_temperature", copilot.explorer_temperature),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number, zero or greater."),
			});
		}
	}

	Ok(())
}

fn validate_quiz(quiz: &Quiz) -> Result<()> {
	if quiz.question_count == 0 {
		return Err(Error::Validation {
			message: "quiz.question_count must be greater than zero.".to_string(),
		});
	}
	if quiz.max_source_chunks == 0 {
		return Err(Error::Validation {
			message: "quiz.max_source_chunks must be greater than zero.".to_string(),
		});
	}
	if !quiz.temperature.is_finite() || quiz.temperature < 0.0 {
		return Err(Error::Validation {
			message: "quiz.temperature must be a finite number, zero or greater.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [&mut cfg.providers.embedding.api_base, &mut cfg.providers.chat.api_base] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	let defaults = PromptSet::default();
	let prompts = &mut cfg.copilot.prompts;

	for (value, fallback) in [
		(&mut prompts.expert_system, defaults.expert_system),
		(&mut prompts.explorer_system, defaults.explorer_system),
		(&mut prompts.uncertain_message, defaults.uncertain_message),
		(&mut prompts.default_label, defaults.default_label),
		(&mut prompts.default_summary, defaults.default_summary),
		(&mut prompts.anonymous_requester, defaults.anonymous_requester),
	] {
		if value.trim().is_empty() {
			*value = fallback;
		}
	}

	if cfg.quiz.system_prompt.trim().is_empty() {
		cfg.quiz.system_prompt = Quiz::default().system_prompt;
	}
}
