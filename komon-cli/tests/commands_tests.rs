use komon_cli::commands::{run_analyze, run_cases};
use komon_eval::{ResultStore, TestCaseDriver};
use komon_model::MockLlm;
use komon_tool::{ClientRegistry, STEP1_TOOL_NAME, STEP2_TOOL_NAME};
use serde_json::json;
use std::sync::Arc;

const CLIENT: &str = "株式会社青空";

fn scripted_case(model: MockLlm) -> MockLlm {
    model
        .with_function_call(STEP1_TOOL_NAME, json!({"client_name": CLIENT}))
        .with_function_call(STEP2_TOOL_NAME, json!({"client_name": CLIENT}))
        .with_text("処理が完了しました")
}

#[tokio::test]
async fn test_single_run_then_analyze() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("test_results.csv");
    let model = scripted_case(MockLlm::new("mock"));
    let driver = TestCaseDriver::new(
        Arc::new(model),
        Arc::new(ClientRegistry::new([CLIENT])),
        ResultStore::new(&results),
    )
    .unwrap()
    .with_seed(1);

    let mut out = Vec::new();
    let verdict = run_cases(&driver, 2, true, &mut out).await.unwrap();
    assert_eq!(verdict, Some(true));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("単一テストケース"));
    assert!(text.contains("検証結果: 一致"));
    assert!(!text.contains("複数ケーステスト"));
    assert_eq!(text.matches("【ツール呼び出し検出】").count(), 2);
    assert!(text.contains("  ツール名: step2_process_client_data"));
    assert!(text.contains(r#"  引数: {"client_name":"株式会社青空"}"#));
    assert!(text.contains("応答: 処理が完了しました"));

    let mut out = Vec::new();
    run_analyze(&results, None, 5000, Some(9), &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("サンプル数: 1"));
    assert!(text.contains("一致率: 100.00%"));
    assert!(dir.path().join("sampled_results.csv").exists());
}

#[tokio::test]
async fn test_batch_summary_counts_every_case() {
    let dir = tempfile::tempdir().unwrap();
    let results = dir.path().join("test_results.csv");
    let model = scripted_case(scripted_case(scripted_case(MockLlm::new("mock"))));
    let driver = TestCaseDriver::new(
        Arc::new(model),
        Arc::new(ClientRegistry::new([CLIENT])),
        ResultStore::new(&results),
    )
    .unwrap();

    let mut out = Vec::new();
    let verdict = run_cases(&driver, 2, false, &mut out).await.unwrap();
    assert_eq!(verdict, Some(true));
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("総テスト数: 2"));
    assert!(text.contains("成功: 2"));

    // single case plus two batch cases
    assert_eq!(ResultStore::new(&results).read_all().unwrap().len(), 3);
}

#[test]
fn test_analyze_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut out = Vec::new();
    let err = run_analyze(&dir.path().join("nope.csv"), None, 10, Some(1), &mut out).unwrap_err();
    assert!(err.to_string().contains("failed to analyze"));
}
