mod common;

use std::time::Duration;

use tendero_agent::replies;
use tendero_agent::{LlmError, MatchSource, ReplyBranch};
use tendero_core::FunnelState;

use common::{message, storefront, zapatos_with_sizes, Harness, SENDER};

#[tokio::test]
async fn quota_failure_with_si_buys_the_last_mentioned_product() {
    let harness = Harness::new(
        storefront(),
        vec![Err(LlmError::QuotaExceeded("RESOURCE_EXHAUSTED".to_owned()))],
    );
    harness.seed_context("Vendedor: la Camisa cuesta $50.000").await;
    harness.seed_context("Vendedor: los Zapatos cuestan $120.000").await;

    let reply = harness.say("si").await;

    assert_eq!(reply.branch, ReplyBranch::PurchaseStarted);
    let order = harness.pending().await.expect("order started");
    assert_eq!(order.product.name, "Zapatos");
    assert_eq!(order.state, FunnelState::AwaitingName);
}

#[tokio::test]
async fn heuristic_match_is_reported_as_such() {
    let harness = Harness::new(storefront(), vec![Err(LlmError::Timeout(Duration::from_secs(20)))]);

    let matched = harness
        .runtime
        .classifier()
        .match_purchase_intent("lo quiero", "Vendedor: la Gorra cuesta $25.000\n")
        .await
        .expect("fallback never errors")
        .expect("gorra resolved");

    assert_eq!(matched.product.name, "Gorra");
    assert_eq!(matched.source, MatchSource::Heuristic);
}

#[tokio::test]
async fn product_question_gets_the_product_card() {
    let harness = Harness::new(storefront(), vec![Ok("0".to_owned()), Ok("Camisa".to_owned())]);

    let reply = harness.say("que precio tiene la camisa?").await;

    assert_eq!(reply.branch, ReplyBranch::ProductCard);
    assert!(reply.text.contains("*Nombre:* Camisa"));
    assert!(reply.text.contains("$50.000"));
    assert!(reply.text.contains("contra-entrega"));
    assert!(harness.pending().await.is_none());
}

#[tokio::test]
async fn unmatched_messages_get_a_general_reply_with_store_persona() {
    let harness = Harness::new(
        storefront(),
        vec![
            Ok("0".to_owned()),
            Ok("ninguno".to_owned()),
            Ok("¡Hola! Soy Juan Manuel, ¿qué buscas hoy?".to_owned()),
        ],
    );

    let reply = harness.say("hola buenas").await;

    assert_eq!(reply.branch, ReplyBranch::GeneralReply);
    assert_eq!(reply.text, "¡Hola! Soy Juan Manuel, ¿qué buscas hoy?");
    let prompts = harness.llm.prompts().await;
    assert_eq!(prompts.len(), 3);
    assert!(prompts[2].contains("Juan Manuel"));
    assert!(prompts[2].contains("99envios"));
}

#[tokio::test]
async fn provider_errors_degrade_to_the_general_reply() {
    let harness = Harness::new(
        storefront(),
        vec![
            Err(LlmError::Provider("500 internal".to_owned())),
            Err(LlmError::Provider("500 internal".to_owned())),
        ],
    );

    let reply = harness.say("quiero algo bonito").await;

    assert_eq!(reply.branch, ReplyBranch::GeneralReply);
    assert!(reply.text.starts_with(replies::GENERAL_FALLBACK));
    assert!(reply.text.contains("Moda"));
}

#[tokio::test]
async fn help_commands_skip_classification() {
    let harness = Harness::new(storefront(), Vec::new());

    for command in ["/ayuda", "/help", "/start"] {
        let reply = harness.say(command).await;
        assert_eq!(reply.branch, ReplyBranch::Help, "{command}");
        assert!(reply.text.contains("99envios"));
    }
    assert!(harness.llm.prompts().await.is_empty());
}

#[tokio::test]
async fn info_command_describes_the_assistant_without_classification() {
    let harness = Harness::new(storefront(), Vec::new());

    let reply = harness.say("/info").await;

    assert_eq!(reply.branch, ReplyBranch::Info);
    assert!(reply.text.contains("Juan Manuel"));
    assert!(reply.text.contains("99envios"));
    assert!(harness.llm.prompts().await.is_empty());
}

#[tokio::test]
async fn pending_order_takes_precedence_over_help() {
    let harness = Harness::new(storefront(), vec![Ok("Camisa".to_owned())]);
    harness.say("quiero la Camisa").await;

    let reply = harness.say("/ayuda").await;

    assert_eq!(reply.branch, ReplyBranch::Funnel);
    let order = harness.pending().await.expect("order still live");
    assert_eq!(order.buyer.name.as_deref(), Some("/ayuda"));
}

#[tokio::test]
async fn products_with_variations_wait_for_a_choice() {
    let harness = Harness::new(
        vec![zapatos_with_sizes()],
        vec![Ok("Zapatos".to_owned()), Ok("Zapatos | 2".to_owned())],
    );

    let asked = harness.say("quiero los zapatos").await;
    assert_eq!(asked.branch, ReplyBranch::VariationRequired);
    assert!(asked.text.contains("Talla 38 / Color Negro"));
    assert!(harness.pending().await.is_none());

    let started = harness.say("los de talla 40").await;
    assert_eq!(started.branch, ReplyBranch::PurchaseStarted);
    let order = harness.pending().await.expect("order started");
    assert_eq!(order.variation.map(|variation| variation.id.0), Some(2));
}

#[tokio::test]
async fn size_named_with_a_purchase_keyword_during_quota_outage_picks_the_variation() {
    let quota = LlmError::QuotaExceeded("429".to_owned());
    let harness = Harness::new(vec![zapatos_with_sizes()], vec![Err(quota)]);
    harness.seed_context("Vendedor: los Zapatos vienen en talla 38 y 40").await;

    let reply = harness.say("los compro en talla 38").await;

    assert_eq!(reply.branch, ReplyBranch::PurchaseStarted);
    let order = harness.pending().await.expect("order started");
    assert_eq!(order.variation.map(|variation| variation.id.0), Some(1));
}

#[tokio::test]
async fn stock_question_during_quota_outage_does_not_start_an_order() {
    let quota = LlmError::QuotaExceeded("429".to_owned());
    let harness = Harness::new(vec![zapatos_with_sizes()], vec![Err(quota)]);
    harness.seed_context("Vendedor: los Zapatos vienen en talla 38 y 40").await;

    let reply = harness.say("¿tienen talla 40?").await;

    assert_ne!(reply.branch, ReplyBranch::PurchaseStarted);
    assert!(harness.pending().await.is_none());
}

#[tokio::test]
async fn near_name_model_answer_still_starts_the_purchase() {
    let harness = Harness::new(storefront(), vec![Ok("Camisa de algodón".to_owned())]);

    let reply = harness.say("quiero comprar la camisa").await;

    assert_eq!(reply.branch, ReplyBranch::PurchaseStarted);
    let order = harness.pending().await.expect("order started");
    assert_eq!(order.product.name, "Camisa");
}

#[tokio::test]
async fn near_name_model_answer_still_shows_the_product_card() {
    let harness =
        Harness::new(storefront(), vec![Ok("0".to_owned()), Ok("la Gorra negra".to_owned())]);

    let reply = harness.say("como es la gorra?").await;

    assert_eq!(reply.branch, ReplyBranch::ProductCard);
    assert!(reply.text.contains("*Nombre:* Gorra"));
    assert!(harness.pending().await.is_none());
}

#[tokio::test]
async fn every_turn_is_appended_to_the_transcript() {
    let harness = Harness::new(storefront(), Vec::new());

    harness.say("/ayuda").await;

    let transcript = harness.runtime.context().get(SENDER).await.expect("transcript");
    let lines = transcript.lines().collect::<Vec<_>>();
    assert_eq!(lines.first().copied(), Some("Cliente: /ayuda"));
    assert!(lines.iter().any(|line| line.starts_with("Vendedor: ¡Hola! Soy Juan Manuel")));
}

#[tokio::test]
async fn sender_without_digits_gets_the_apology() {
    let harness = Harness::new(storefront(), Vec::new());

    let reply = harness.runtime.handle_message(&message("status@broadcast", "hola")).await;

    assert_eq!(reply.branch, ReplyBranch::Apology);
    assert_eq!(reply.text, replies::APOLOGY);
    assert!(harness.llm.prompts().await.is_empty());
}

#[tokio::test]
async fn empty_catalog_answers_without_matching_products() {
    let harness = Harness::new(Vec::new(), vec![Ok("Pronto tendremos productos.".to_owned())]);

    let reply = harness.say("quiero comprar algo").await;

    assert_eq!(reply.branch, ReplyBranch::GeneralReply);
    assert_eq!(harness.llm.prompts().await.len(), 1);
}
