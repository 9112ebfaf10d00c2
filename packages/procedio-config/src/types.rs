use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub copilot: Copilot,
	#[serde(default)]
	pub quiz: Quiz,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	/// Dimension of the `document_chunks.embedding` column.
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub chat: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Confidence-tiered routing of copilot questions.
///
/// A top similarity strictly above `high_threshold` answers directly, one in
/// `[low_threshold, high_threshold]` lists grouped suggestions, anything lower offers an
/// escalation.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Copilot {
	pub high_threshold: f32,
	pub low_threshold: f32,
	pub match_count: u32,
	pub expert_temperature: f32,
	pub explorer_temperature: f32,
	pub explorer_excerpt_chars: u32,
	pub search_timeout_ms: u64,
	pub prompts: PromptSet,
}
impl Default for Copilot {
	fn default() -> Self {
		Self {
			high_threshold: 0.82,
			low_threshold: 0.50,
			match_count: 5,
			expert_temperature: 0.1,
			explorer_temperature: 0.2,
			explorer_excerpt_chars: 400,
			search_timeout_ms: 15_000,
			prompts: PromptSet::default(),
		}
	}
}

/// Prompt text for one calling context.
///
/// `{user_name}` and `{question}` placeholders are substituted at request time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptSet {
	pub expert_system: String,
	pub explorer_system: String,
	pub uncertain_message: String,
	pub default_label: String,
	pub default_summary: String,
	pub anonymous_requester: String,
}
impl Default for PromptSet {
	fn default() -> Self {
		Self {
			expert_system: "\
Tu es le Copilote Procedio AI. Aide {user_name}.
Tes réponses doivent être précises, professionnelles et directes.
Réponds uniquement à partir du contexte fourni. Si la réponse n'y figure pas, dis que tu ne sais pas."
				.to_string(),
			explorer_system: "\
Tu es le Copilote Procedio. Analyse ces extraits pour répondre à : \"{question}\".
RENVOIE UNIQUEMENT DU JSON :
{
  \"summary\": \"Une réponse de 30 à 45 mots qui explique pourquoi ces documents sont pertinents et ce qu'ils couvrent globalement.\",
  \"labels\": [\"Libellé court et explicite de l'extrait\", ...]
}
Fournis exactement un libellé par extrait, dans l'ordre des index."
				.to_string(),
			uncertain_message: "Désolé, je ne trouve pas de procédure spécifique pour cette demande dans la base actuelle. Souhaitez-vous que j'en informe un administrateur ?"
				.to_string(),
			default_label: "Détails essentiels".to_string(),
			default_summary: "J'ai identifié plusieurs passages dans la base de connaissance qui pourraient vous aider à résoudre votre problème."
				.to_string(),
			anonymous_requester: "l'utilisateur".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Quiz {
	pub question_count: u32,
	pub max_source_chunks: u32,
	pub temperature: f32,
	pub system_prompt: String,
}
impl Default for Quiz {
	fn default() -> Self {
		Self {
			question_count: 5,
			max_source_chunks: 8,
			temperature: 0.1,
			system_prompt: "\
Tu es un expert en formation technique et pédagogie.
Ta mission est de créer un examen de validation des acquis basé EXCLUSIVEMENT sur le texte fourni.
Génère {count} questions à choix multiples (QCM).

Format de sortie JSON ATTENDU :
{
  \"questions\": [
    {
      \"q\": \"L'intitulé de la question ?\",
      \"options\": [\"Choix A\", \"Choix B\", \"Choix C\", \"Choix D\"],
      \"correct\": 0,
      \"explanation\": \"Courte explication de la réponse.\"
    }
  ]
}

Règles :
- Une seule bonne réponse par question.
- 4 choix possibles par question.
- Langue : Français."
				.to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
