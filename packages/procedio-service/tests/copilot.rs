mod support;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use procedio_domain::confidence::ConfidenceTier;
use procedio_service::{Error, ResponseMode, RouteRequest};

use support::{SpyChat, SpyEmbedding, StaticIndex, chunk, harness};

const EXPLORER_REPLY: &str =
	r#"{"summary":"Ces procédures couvrent l'accès distant.","labels":["Connexion","Messagerie","Profil"]}"#;

fn question(text: &str) -> RouteRequest {
	RouteRequest {
		question: text.to_string(),
		user_name: "Alice".to_string(),
		user_id: "u-1".to_string(),
		document_id: None,
	}
}

#[tokio::test]
async fn confident_match_answers_with_citation() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying("Ouvrez le portail et cliquez sur « Mot de passe oublié »."),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Réinitialisation via le portail.", 0.9)]),
	);
	let mode = h
		.service
		.route(question("comment réinitialiser un mot de passe"), &CancellationToken::new())
		.await
		.expect("Route failed.");
	let ResponseMode::Expert { answer_text, score, citation } = mode else {
		panic!("Expected an expert answer, got {mode:?}.");
	};

	assert_eq!(citation.title, "Guide VPN");
	assert_eq!(citation.path.as_deref(), Some("procedures/guide-vpn.pdf"));
	assert_eq!(score, 0.9);
	assert!(answer_text.contains("Mot de passe oublié"));
	assert_eq!(h.chat.calls(), 1);

	let req = h.chat.last_request();

	assert_eq!(req.temperature, Some(0.1));
	assert!(!req.json_mode);
	assert!(req.system.contains("Alice"));
	assert!(req.user.contains("Réinitialisation via le portail."));
	assert!(req.user.ends_with("QUESTION: comment réinitialiser un mot de passe"));
}

#[tokio::test]
async fn expert_wire_format_matches_the_client_contract() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying("Réponse."),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Contenu.", 0.9)]),
	);
	let mode = h
		.service
		.route(question("comment réinitialiser un mot de passe"), &CancellationToken::new())
		.await
		.expect("Route failed.");
	let json = serde_json::to_value(&mode).expect("Failed to serialize response.");

	assert_eq!(json["type"], "expert");
	assert_eq!(json["source"], "Guide VPN");
	assert_eq!(json["sourcePath"], "procedures/guide-vpn.pdf");
	assert_eq!(json["output"], "Réponse.");
}

#[tokio::test]
async fn mid_confidence_groups_suggestions_in_order() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying(EXPLORER_REPLY),
		StaticIndex::with_hits(vec![
			chunk("Guide VPN", "Lancer le client.", 0.65),
			chunk("Messagerie", "Configurer Outlook.", 0.6),
			chunk("Guide VPN", "Saisir le jeton.", 0.55),
		]),
	);
	let mode = h
		.service
		.route(question("accès distant"), &CancellationToken::new())
		.await
		.expect("Route failed.");
	let ResponseMode::Explorer { summary_text, groups } = mode else {
		panic!("Expected explorer suggestions, got {mode:?}.");
	};

	assert_eq!(summary_text, "Ces procédures couvrent l'accès distant.");
	assert_eq!(groups.len(), 2);
	assert_eq!(groups[0].title, "Guide VPN");
	assert_eq!(
		groups[0].chunks.iter().map(|item| item.label.as_str()).collect::<Vec<_>>(),
		vec!["Connexion", "Profil"]
	);
	assert_eq!(groups[0].chunks[1].score, 0.55);
	assert_eq!(groups[1].title, "Messagerie");

	let req = h.chat.last_request();

	assert!(req.json_mode);
	assert_eq!(req.temperature, Some(0.2));
	assert!(req.user.starts_with("[0] Lancer le client."));
	assert!(req.user.contains("[2] Saisir le jeton."));
}

#[tokio::test]
async fn explorer_excerpts_are_truncated() {
	let long = "é".repeat(1_000);
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying(EXPLORER_REPLY),
		StaticIndex::with_hits(vec![chunk("Guide VPN", &long, 0.7)]),
	);

	h.service.route(question("accès"), &CancellationToken::new()).await.expect("Route failed.");

	let req = h.chat.last_request();

	assert_eq!(req.user.chars().count(), "[0] ".len() + 400);
}

#[tokio::test]
async fn low_confidence_offers_escalation_without_chat() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying("unused"),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Sans rapport.", 0.30)]),
	);
	let mode = h
		.service
		.route(question("commander un badge"), &CancellationToken::new())
		.await
		.expect("Route failed.");

	assert_eq!(h.chat.calls(), 0);

	let ResponseMode::Uncertain { prompt_text, score, escalation_available } = mode else {
		panic!("Expected an uncertain response, got {mode:?}.");
	};

	assert!(escalation_available);
	assert_eq!(score, 0.30);
	assert!(prompt_text.contains("informe un administrateur"));
}

#[tokio::test]
async fn thresholds_are_exclusive_high_and_inclusive_low() {
	for (score, expected) in [
		(0.95, ConfidenceTier::Expert),
		(0.82, ConfidenceTier::Explorer),
		(0.50, ConfidenceTier::Explorer),
		(0.49, ConfidenceTier::Uncertain),
	] {
		let h = harness(
			SpyEmbedding::new(),
			SpyChat::replying(EXPLORER_REPLY),
			StaticIndex::with_hits(vec![chunk("Guide VPN", "Contenu.", score)]),
		);
		let mode = h
			.service
			.route(question("vpn"), &CancellationToken::new())
			.await
			.expect("Route failed.");

		assert_eq!(mode.tier(), expected, "Score {score} routed to {:?}.", mode.tier());
	}
}

#[tokio::test]
async fn empty_results_are_uncertain() {
	let h = harness(SpyEmbedding::new(), SpyChat::replying("unused"), StaticIndex::default());
	let mode = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect("Route failed.");

	assert_eq!(
		mode,
		ResponseMode::Uncertain {
			prompt_text: h.service.cfg.copilot.prompts.uncertain_message.clone(),
			score: 0.0,
			escalation_available: true,
		}
	);
	assert_eq!(h.chat.calls(), 0);
}

#[tokio::test]
async fn non_json_explorer_output_fails_closed() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying("Voici quelques documents utiles."),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Contenu.", 0.7)]),
	);
	let err = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect_err("Expected malformed output.");

	assert!(matches!(err, Error::MalformedModelOutput { .. }), "Unexpected error: {err:?}.");
}

#[tokio::test]
async fn partial_explorer_output_uses_defaults() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::replying(r#"{"labels":["Connexion"]}"#),
		StaticIndex::with_hits(vec![
			chunk("Guide VPN", "Lancer le client.", 0.7),
			chunk("Guide VPN", "Saisir le jeton.", 0.6),
		]),
	);
	let mode = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect("Route failed.");
	let ResponseMode::Explorer { summary_text, groups } = mode else {
		panic!("Expected explorer suggestions, got {mode:?}.");
	};

	assert_eq!(summary_text, h.service.cfg.copilot.prompts.default_summary);
	assert_eq!(groups[0].chunks[0].label, "Connexion");
	assert_eq!(groups[0].chunks[1].label, "Détails essentiels");
}

#[tokio::test]
async fn chat_failure_is_a_provider_error() {
	let h = harness(
		SpyEmbedding::new(),
		SpyChat::failing("Chat request failed with status 503: overloaded"),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Contenu.", 0.9)]),
	);
	let err = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect_err("Expected a provider error.");

	assert!(matches!(err, Error::Provider { ref message } if message.contains("overloaded")));
}

#[tokio::test]
async fn blank_questions_are_rejected_before_embedding() {
	let h = harness(SpyEmbedding::new(), SpyChat::replying("unused"), StaticIndex::default());
	let err = h
		.service
		.route(question("   "), &CancellationToken::new())
		.await
		.expect_err("Expected an invalid request.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(h.embedding.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_embedding_dimension_is_a_provider_error() {
	let h = harness(
		SpyEmbedding::with_dim(8),
		SpyChat::replying("unused"),
		StaticIndex::with_hits(vec![chunk("Guide VPN", "Contenu.", 0.9)]),
	);
	let err = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect_err("Expected a provider error.");

	assert!(matches!(err, Error::Provider { ref message } if message.contains("dimension")));
}

#[tokio::test]
async fn document_filter_and_match_count_reach_the_index() {
	let h = harness(SpyEmbedding::new(), SpyChat::replying("unused"), StaticIndex::default());
	let mut req = question("vpn");

	req.document_id = Some(" doc-42 ".to_string());

	h.service.route(req, &CancellationToken::new()).await.expect("Route failed.");

	assert_eq!(
		h.index.last_filter.lock().expect("Index lock poisoned.").as_deref(),
		Some("doc-42")
	);
	assert_eq!(h.index.last_k.load(std::sync::atomic::Ordering::SeqCst), 5);
}

#[tokio::test]
async fn cancelled_requests_stop_before_completion() {
	let h = harness(SpyEmbedding::pending(), SpyChat::replying("unused"), StaticIndex::default());
	let cancel = CancellationToken::new();
	let trigger = cancel.clone();

	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(20)).await;
		trigger.cancel();
	});

	let err = h.service.route(question("vpn"), &cancel).await.expect_err("Expected cancellation.");

	assert!(matches!(err, Error::Cancelled));
	assert_eq!(h.chat.calls(), 0);
}

#[tokio::test]
async fn slow_search_times_out_as_storage_error() {
	let mut cfg = support::test_config();

	cfg.copilot.search_timeout_ms = 20;

	let index = StaticIndex {
		hits: vec![chunk("Guide VPN", "Contenu.", 0.9)],
		delay: Some(Duration::from_millis(500)),
		..StaticIndex::default()
	};
	let h = support::harness_with(
		cfg,
		SpyEmbedding::new(),
		SpyChat::replying("unused"),
		index,
		support::MemoryProfiles::default(),
	);
	let err = h
		.service
		.route(question("vpn"), &CancellationToken::new())
		.await
		.expect_err("Expected a timeout.");

	assert!(matches!(err, Error::Storage { ref message } if message.contains("timed out")));
}
