mod common;

use serde_json::json;

use common::{comment, submission, FakeModel, FakeSource};
use threadsift::classify::{self, FieldSpec, FieldType, ResponseSchema};
use threadsift::sync::{self, RetryPolicy};
use threadsift::{Error, MetadataStore};

async fn synced_store() -> MetadataStore {
    let store = MetadataStore::open_in_memory().unwrap();
    seed(&store).await;
    store
}

async fn seed(store: &MetadataStore) {
    let source = FakeSource::default();
    source.set_listing(
        "LocalLLaMA",
        vec![
            submission("s1", "We summarise support tickets with an LLM"),
            submission("s2", "Which GPU should I buy?"),
        ],
    );
    source.set_comments(
        "s1",
        vec![
            comment("c1", "t3_s1", "alice", "How accurate is it?", 1),
            comment("c2", "t1_c1", "op", "Around 90 percent", 2),
        ],
    );
    sync::sync_all(
        store,
        &source,
        RetryPolicy::default(),
        &["LocalLLaMA".to_string()],
    )
    .await
    .unwrap();
}

fn use_case_schema() -> ResponseSchema {
    ResponseSchema::new(
        "UseCaseAnalysis",
        vec![
            FieldSpec::new("contains_llm_use_case_info", FieldType::Bool),
            FieldSpec::new("explanation", FieldType::Str),
        ],
    )
}

fn keyword_model() -> FakeModel {
    FakeModel::new(|_, input| {
        let found = input.contains("support tickets");
        Ok(json!({
            "contains_llm_use_case_info": found,
            "explanation": if found { "ticket summaries" } else { "hardware question" },
        }))
    })
}

#[tokio::test]
async fn test_records_a_verdict_per_pair() {
    let store = synced_store().await;
    let spec = store
        .create_detection_spec("Does the thread describe an LLM use case?", &use_case_schema())
        .unwrap();
    let model = keyword_model();

    let report = classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();

    assert_eq!(report.recorded, 2);
    assert_eq!(report.failed, 0);

    let results = store.list_detections(Some(spec), 10).unwrap();
    assert_eq!(results.len(), 2);
    let s1 = results.iter().find(|r| r.reddit_id == "s1").unwrap();
    assert_eq!(s1.verdict["contains_llm_use_case_info"], true);
    assert_eq!(s1.model.as_deref(), Some("fake-model"));
    let s2 = results.iter().find(|r| r.reddit_id == "s2").unwrap();
    assert_eq!(s2.verdict["contains_llm_use_case_info"], false);

    // The model saw the rendered thread
    let inputs = model.inputs.lock().unwrap();
    let s1_input = inputs.iter().find(|i| i.contains("support tickets")).unwrap();
    assert!(s1_input.contains("alice: How accurate is it?\n    op: Around 90 percent\n"));
}

#[tokio::test]
async fn test_failures_are_isolated_per_pair() {
    let store = synced_store().await;
    store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();
    let model = FakeModel::new(|_, input| {
        if input.contains("GPU") {
            Err(Error::Model("upstream exploded".to_string()))
        } else {
            Ok(json!({"contains_llm_use_case_info": true, "explanation": "ok"}))
        }
    });

    let report = classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();

    assert_eq!(report.recorded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(store.list_detections(None, 10).unwrap().len(), 1);
}

#[tokio::test]
async fn test_schema_mismatch_is_not_recorded() {
    let store = synced_store().await;
    store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();
    let model = FakeModel::new(|_, _| Ok(json!({"contains_llm_use_case_info": "maybe"})));

    let report = classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();

    assert_eq!(report.failed, 2);
    assert!(store.list_detections(None, 10).unwrap().is_empty());
}

#[tokio::test]
async fn test_existing_verdicts_are_skipped_unless_forced() {
    let store = synced_store().await;
    store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();
    let model = keyword_model();
    let policy = RetryPolicy::default();

    classify::classify_all(&store, &model, policy, None, false).await.unwrap();
    let again = classify::classify_all(&store, &model, policy, None, false).await.unwrap();
    assert_eq!(again.skipped, 2);
    assert_eq!(again.recorded, 0);
    assert_eq!(model.calls(), 2);

    let forced = classify::classify_all(&store, &model, policy, None, true).await.unwrap();
    assert_eq!(forced.recorded, 2);
    assert_eq!(model.calls(), 4);
    assert_eq!(store.list_detections(None, 10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_specs_run_independently() {
    let store = synced_store().await;
    let first = store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();
    let second = store
        .create_detection_spec(
            "Rate hardware talk",
            &ResponseSchema::new("Hardware", vec![FieldSpec::new("score", FieldType::Int)]),
        )
        .unwrap();
    let model = FakeModel::new(|instruction, _| {
        if instruction.starts_with("Rate") {
            Ok(json!({"score": 3}))
        } else {
            Ok(json!({"contains_llm_use_case_info": false, "explanation": ""}))
        }
    });

    let report = classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();

    assert_eq!(report.recorded, 4);
    assert_eq!(store.list_detections(Some(first), 10).unwrap().len(), 2);
    let hardware = store.list_detections(Some(second), 10).unwrap();
    assert!(hardware.iter().all(|r| r.verdict == json!({"score": 3})));
}

#[tokio::test]
async fn test_subreddit_filter_and_empty_specs() {
    let store = synced_store().await;
    let model = keyword_model();

    let report = classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();
    assert_eq!(report, classify::ClassifyReport::default());
    assert_eq!(model.calls(), 0);

    store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();
    let report = classify::classify_all(
        &store,
        &model,
        RetryPolicy::default(),
        Some("rust"),
        false,
    )
    .await
    .unwrap();
    assert_eq!(report.recorded, 0);

    let runs = store.list_runs(10).unwrap();
    assert!(runs.iter().any(|r| r.kind == "classify" && r.result == "success"));
}

#[tokio::test]
async fn test_pass_without_specs_is_recorded() {
    let store = synced_store().await;
    let model = keyword_model();

    classify::classify_all(&store, &model, RetryPolicy::default(), None, false)
        .await
        .unwrap();

    let runs = store.list_runs(10).unwrap();
    let run = runs.iter().find(|r| r.kind == "classify").unwrap();
    assert_eq!(run.status, "finished");
    assert_eq!(run.result, "success");
    assert_eq!(run.summary.as_deref(), Some("0 recorded, 0 skipped, 0 failed"));
    assert!(run.stopped_at.is_some());
}

#[tokio::test]
async fn test_store_failure_finishes_run_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("threadsift.db");
    let store = MetadataStore::open(&path).unwrap();
    seed(&store).await;
    store
        .create_detection_spec("Find use cases", &use_case_schema())
        .unwrap();

    // Verdict lookups fail from here on
    let other = rusqlite::Connection::open(&path).unwrap();
    other
        .execute("DROP TABLE detected_information", [])
        .unwrap();

    let model = keyword_model();
    let result =
        classify::classify_all(&store, &model, RetryPolicy::default(), None, false).await;
    assert!(result.is_err());
    assert_eq!(model.calls(), 0);

    let runs = store.list_runs(10).unwrap();
    let run = runs.iter().find(|r| r.kind == "classify").unwrap();
    assert_eq!(run.status, "finished");
    assert_eq!(run.result, "error");
    assert!(run
        .error_message
        .as_deref()
        .unwrap()
        .contains("detected_information"));
}
