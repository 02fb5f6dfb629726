//! End-to-end tests for normalization and tree construction.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use docindex_outline::{
    BuildOptions, BuildStrategy, DocumentTree, HeadingNormalizer, MAX_DEPTH, NodeIndex, TreeError,
    build_tree, extract_text, normalize_headings,
};
use docindex_reasoning::{ReasoningProvider, ScriptedProvider, ScriptedReply};
use pretty_assertions::assert_eq;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    extract_text(&fixtures_dir().join(name)).unwrap()
}

fn ids(tree: &DocumentTree) -> Vec<String> {
    tree.iter().map(|(_, n)| n.node_id.clone()).collect()
}

fn assert_ids_unique_and_ordered(tree: &DocumentTree) {
    let pre_order = ids(tree);
    let unique: HashSet<&String> = pre_order.iter().collect();
    assert_eq!(unique.len(), pre_order.len(), "duplicate node ids");

    let mut sorted = pre_order.clone();
    sorted.sort();
    assert_eq!(sorted, pre_order, "lexicographic order differs from pre-order");
}

#[tokio::test]
async fn test_normalized_agreement_builds_expected_outline() {
    let raw = fixture("service_agreement.md");
    let normalized = HeadingNormalizer::default().normalize(&raw);
    assert_eq!(normalized.promoted, 6);

    let tree = build_tree(
        "service_agreement",
        &normalized.text,
        BuildStrategy::Structural,
        &BuildOptions::outline_only(),
        None,
    )
    .await
    .unwrap();

    let top: Vec<&str> = tree
        .structure()
        .iter()
        .map(|&r| tree.node(r).title.as_str())
        .collect();
    assert_eq!(
        top,
        vec![
            "Preamble",
            "Scope of Work",
            "Payment Terms",
            "Termination",
            "CONFIDENTIALITY & DATA"
        ]
    );

    let scope = tree.node(tree.structure()[1]);
    let subsections: Vec<&str> = scope
        .children()
        .iter()
        .map(|&r| tree.node(r).title.as_str())
        .collect();
    assert_eq!(subsections, vec!["Definitions", "Exclusions"]);

    // The prose-like bold line stays in the Payment Terms body.
    let payment = tree.node(tree.structure()[2]);
    assert!(
        payment
            .text
            .contains("**Just some bold emphasis, nothing special.**")
    );

    assert_eq!(tree.concatenated_text(), normalized.text);
    assert_ids_unique_and_ordered(&tree);
}

#[tokio::test]
async fn test_deep_headings_are_folded_not_dropped() {
    let text = fixture("handbook.md");
    let tree = build_tree(
        "handbook",
        &text,
        BuildStrategy::Structural,
        &BuildOptions::outline_only(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(tree.max_depth(), MAX_DEPTH);
    assert_eq!(tree.node_count(), 7);
    assert_eq!(tree.concatenated_text(), text);

    let damaged = tree
        .iter()
        .map(|(_, n)| n)
        .find(|n| n.title == "Damaged Goods")
        .unwrap();
    assert!(damaged.is_leaf());
    assert!(damaged.text.contains("##### Claims Procedure"));
    assert!(damaged.text.contains("Carrier, waybill number"));
}

#[tokio::test]
async fn test_thinning_collapses_small_documents() {
    let text = fixture("handbook.md");
    let options = BuildOptions::outline_only().with_min_token_threshold(10_000);

    let tree = build_tree("handbook", &text, BuildStrategy::Structural, &options, None)
        .await
        .unwrap();

    assert_eq!(tree.node_count(), 2);
    assert!(tree.iter().all(|(_, n)| n.is_leaf()));
    assert_eq!(tree.concatenated_text(), text);
}

#[tokio::test]
async fn test_structural_strategy_rejects_header_free_text() {
    let err = build_tree(
        "notes",
        &fixture("notes.txt"),
        BuildStrategy::Structural,
        &BuildOptions::default(),
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TreeError::NoStructureDetected { .. }));
    assert!(err.to_string().starts_with("structural strategy"));
}

#[tokio::test]
async fn test_structural_summaries_without_provider_are_extracted() {
    let tree = build_tree(
        "handbook",
        &fixture("handbook.md"),
        BuildStrategy::Structural,
        &BuildOptions::default(),
        None,
    )
    .await
    .unwrap();

    assert!(tree.iter().all(|(_, n)| !n.summary.is_empty()));
    assert!(tree.doc_description().starts_with("handbook is organized into 7 sections"));
}

#[tokio::test]
async fn test_structural_uses_provider_for_description() {
    let provider = Arc::new(
        ScriptedProvider::new().with_reply("An operations handbook for a freight depot."),
    );

    let tree = build_tree(
        "handbook",
        &fixture("handbook.md"),
        BuildStrategy::Structural,
        &BuildOptions::default(),
        Some(provider.clone() as Arc<dyn ReasoningProvider>),
    )
    .await
    .unwrap();

    assert_eq!(
        tree.doc_description(),
        "An operations handbook for a freight depot."
    );
    // Every section is short, so only the description needed a call.
    assert_eq!(provider.requests().len(), 1);
    // The outline sent for the description carries no section text.
    assert!(
        !provider.requests()[0].messages[1]
            .content
            .contains("\"text\"")
    );
}

#[tokio::test]
async fn test_options_can_drop_text_and_ids() {
    let options = BuildOptions {
        add_node_text: false,
        add_node_id: false,
        ..BuildOptions::outline_only()
    };
    let tree = build_tree(
        "handbook",
        &fixture("handbook.md"),
        BuildStrategy::Structural,
        &options,
        None,
    )
    .await
    .unwrap();

    assert!(tree.iter().all(|(_, n)| n.text.is_empty() && n.node_id.is_empty()));
    assert!(NodeIndex::from(tree).is_empty());
}

fn notes_reply() -> String {
    serde_json::json!({
        "doc_name": "guessed-name.txt",
        "doc_description": "Monthly depot notes covering volume, customers and staffing.",
        "structure": [
            {
                "title": "Volume",
                "node_id": "1",
                "summary": "Pallet volume for March.",
                "text": "The depot handled 1,200 pallets in March, up from 950 in February.",
                "line_num": 3,
                "children": [
                    {
                        "title": "Growth drivers",
                        "node_id": "7",
                        "summary": "New retail customers.",
                        "text": "Most of the growth came from two new retail customers in the Utrecht region.",
                        "line_num": 1,
                        "children": []
                    }
                ]
            },
            {
                "title": "Staffing",
                "node_id": "3",
                "summary": "Evening shift staffing.",
                "text": "Staffing will need to increase by three people on the evening shift before summer.",
                "line_num": 5
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_reasoning_strategy_outlines_header_free_text() {
    let text = fixture("notes.txt");
    let provider = Arc::new(ScriptedProvider::new().with_reply(notes_reply()));

    let tree = build_tree(
        "notes",
        &text,
        BuildStrategy::Reasoning,
        &BuildOptions::default(),
        Some(provider),
    )
    .await
    .unwrap();

    assert_eq!(tree.doc_name(), "notes");
    assert!(!tree.structure().is_empty());
    assert!(!tree.doc_description().is_empty());
    assert_eq!(ids(&tree), vec!["0001", "0002", "0003"]);

    // Leaves carry no children after the round trip either.
    let json: serde_json::Value = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
    assert!(json["structure"][0]["children"][0].get("children").is_none());

    // Line numbers are re-anchored to where the text occurs.
    let lines: Vec<usize> = tree.iter().map(|(_, n)| n.line_num).collect();
    assert_eq!(lines, vec![1, 3, 5]);

    // Every paragraph is owned by exactly one section.
    let paragraphs: Vec<&str> = text.split("\n\n").map(str::trim).collect();
    let owned: Vec<&str> = tree.iter().map(|(_, n)| n.text.trim()).collect();
    assert_eq!(owned, paragraphs);
}

#[tokio::test]
async fn test_reasoning_strategy_schema_violation_is_fatal() {
    let provider = Arc::new(
        ScriptedProvider::new().with_reply(r#"{"doc_name": "x", "structure": "not a list"}"#),
    );

    let err = build_tree(
        "notes",
        "text",
        BuildStrategy::Reasoning,
        &BuildOptions::default(),
        Some(provider),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TreeError::SchemaViolation {
            strategy: BuildStrategy::Reasoning,
            ..
        }
    ));
}

#[tokio::test]
async fn test_reasoning_strategy_transport_failure_names_strategy() {
    let provider = Arc::new(ScriptedProvider::new().with(ScriptedReply::Timeout));

    let err = build_tree(
        "notes",
        "text",
        BuildStrategy::Reasoning,
        &BuildOptions::default(),
        Some(provider),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, TreeError::ReasoningCall { .. }));
    assert!(err.to_string().contains("reasoning strategy"));
}

#[test]
fn test_normalize_headings_is_idempotent_on_fixtures() {
    for name in ["service_agreement.md", "handbook.md", "notes.txt"] {
        let once = normalize_headings(&fixture(name));
        assert_eq!(normalize_headings(&once), once, "fixture {name}");
    }
}

#[tokio::test]
async fn test_ten_thousand_sections_keep_ids_in_document_order() {
    let text: String = (0..10_000).map(|i| format!("# S{i}\nbody\n")).collect();

    let tree = build_tree(
        "large",
        &text,
        BuildStrategy::Structural,
        &BuildOptions::outline_only(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(tree.node_count(), 10_000);
    assert_ids_unique_and_ordered(&tree);
    let ids = ids(&tree);
    assert_eq!(ids[0], "00001");
    assert_eq!(ids[9_999], "10000");
    assert_eq!(tree.concatenated_text(), text);

    let index = NodeIndex::from(tree);
    assert!(index.contains("09999"));
    assert!(index.contains("10000"));
}
