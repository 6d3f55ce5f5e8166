//! Subcommand bodies. Each writes its report to `out` so it can be checked
//! without a terminal.

use anyhow::{Context, Result};
use komon_agent::gov_doc_parser::{AGENT_NAME, DESCRIPTION};
use komon_eval::{RunSummary, TestCaseDriver, analyze, default_output_path};
use komon_tool::{ClientRegistry, client_tools, get_client_info, process_client_data};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::Write;
use std::path::{Path, PathBuf};

const RULE: &str = "======================================================================";

/// Calls both tools directly with the fixed checks and prints the root
/// agent's name, description and tools.
pub fn run_tools(registry: &ClientRegistry, out: &mut impl Write) -> Result<()> {
    writeln!(out, "{}", &RULE[..50])?;
    writeln!(out, "顧問先情報取得・処理ツールのテスト")?;
    writeln!(out, "{}", &RULE[..50])?;

    writeln!(out, "\n【テスト1】【ステップ1】顧問先情報取得 - 「株式会社」で検索")?;
    let result1 = get_client_info(registry, "株式会社");
    writeln!(out, "検索結果: {}件", result1.count)?;
    writeln!(out, "最初の5件: {:?}", &result1.matches[..result1.matches.len().min(5)])?;

    writeln!(out, "\n【テスト2】【ステップ1】顧問先情報取得 - 「株式会社青空」で検索")?;
    let result2 = get_client_info(registry, "株式会社青空");
    writeln!(out, "検索結果: {}件", result2.count)?;
    writeln!(out, "一致: {:?}", result2.matches)?;

    writeln!(out, "\n【テスト3】【ステップ2】顧問先情報処理 - 「株式会社青空」への自動入力")?;
    let result3 = process_client_data(registry, "株式会社青空");
    writeln!(out, "処理結果: {}", result3.message)?;
    writeln!(out, "検証: {}", result3.verified)?;
    writeln!(out, "詳細: {}", serde_json::to_string(&result3.details)?)?;

    writeln!(out, "\n【テスト4】【ステップ2】顧問先情報処理 - 「青空」で検索（完全一致なし）")?;
    let result4 = process_client_data(registry, "青空");
    writeln!(out, "処理結果: {}", result4.message)?;
    writeln!(out, "検証: {}", result4.verified)?;
    writeln!(out, "成功: {}", result4.success)?;

    writeln!(out, "\n【テスト5】【ステップ2】顧問先情報処理 - 存在しない顧問先")?;
    let result5 = process_client_data(registry, "存在しない会社");
    writeln!(out, "処理結果: {}", result5.message)?;
    writeln!(out, "成功: {}", result5.success)?;

    writeln!(out, "\n{}", &RULE[..50])?;
    writeln!(out, "テスト完了")?;
    writeln!(out, "{}", &RULE[..50])?;

    let tools = client_tools(std::sync::Arc::new(registry.clone()));
    let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
    writeln!(out, "\n\nエージェント情報:")?;
    writeln!(out, "名前: {}", AGENT_NAME)?;
    writeln!(out, "説明: {}", DESCRIPTION)?;
    writeln!(out, "ツール数: {}", tools.len())?;
    writeln!(out, "ツール: {:?}", names)?;
    Ok(())
}

/// One single case, then `cases` more unless `single`. Returns the verdict of
/// the last batch.
pub async fn run_cases(
    driver: &TestCaseDriver,
    cases: u64,
    single: bool,
    out: &mut impl Write,
) -> Result<Option<bool>> {
    writeln!(out, "{RULE}\n単一テストケース\n{RULE}")?;
    let outcome = driver.run_case(1).await?;
    write_outcome(out, &outcome)?;

    let verdict = if single {
        outcome.outcome()
    } else {
        writeln!(out, "\n{RULE}\n複数ケーステスト（{cases}回実行）\n{RULE}")?;
        let mut summary = RunSummary::default();
        for test_case_id in 1..=cases {
            writeln!(out, "\nテストケース {test_case_id}/{cases}")?;
            let outcome = driver.run_case(test_case_id).await?;
            write_outcome(out, &outcome)?;
            summary.record(outcome.outcome());
        }
        writeln!(out, "\n{RULE}\nテスト結果サマリー\n{RULE}\n{summary}")?;
        summary.verdict()
    };

    writeln!(out, "\n{RULE}\n最終結果\n{RULE}")?;
    match verdict {
        Some(true) => writeln!(out, "✅ 全テスト成功: 顧問先情報が正しくstep2に渡されることを確認しました。")?,
        Some(false) => writeln!(out, "❌ テストに問題がありました")?,
        None => writeln!(out, "⚠️  自動判定できませんでした")?,
    }
    writeln!(out, "結果ファイル: {}", driver.store().path().display())?;
    Ok(verdict)
}

fn write_outcome(out: &mut impl Write, outcome: &komon_eval::CaseOutcome) -> Result<()> {
    writeln!(out, "顧問先: 「{}」", outcome.expected_client_name)?;
    for reply in &outcome.replies {
        writeln!(out, "応答: {reply}")?;
    }
    for call in &outcome.tool_calls {
        writeln!(out, "\n【ツール呼び出し検出】")?;
        writeln!(out, "  ツール名: {}", call.tool_name)?;
        writeln!(out, "  引数: {}", call.args)?;
        writeln!(out, "  結果: {}", call.result)?;
    }
    if !outcome.confirmation_message.is_empty() {
        writeln!(out, "承認メッセージ: 「{}」", outcome.confirmation_message)?;
    }
    writeln!(
        out,
        "step1: {} 「{}」 / step2: {} 「{}」",
        mark(outcome.summary.step1_called),
        outcome.summary.step1_client_name,
        mark(outcome.summary.step2_called),
        outcome.summary.step2_client_name,
    )?;
    writeln!(out, "検証結果: {}", outcome.verification)?;
    if let Some(error) = &outcome.error {
        writeln!(out, "エラー: {error}")?;
    }
    Ok(())
}

fn mark(called: bool) -> &'static str {
    if called { "✅" } else { "❌" }
}

pub fn run_analyze(
    input: &Path,
    output: Option<PathBuf>,
    sample_size: usize,
    seed: Option<u64>,
    out: &mut impl Write,
) -> Result<()> {
    let output = output.unwrap_or_else(|| default_output_path(input));
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    writeln!(out, "{RULE}\n{} 分析（サンプルサイズ: {sample_size}）\n{RULE}", input.display())?;
    let report = analyze(input, &output, sample_size, &mut rng)
        .with_context(|| format!("failed to analyze {}", input.display()))?;
    writeln!(out, "{report}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_report() {
        let registry = ClientRegistry::new(["株式会社青空", "株式会社", "青空商事株式会社"]);
        let mut out = Vec::new();
        run_tools(&registry, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("【テスト2】"));
        assert!(text.contains("一致: [\"株式会社青空\"]"));
        assert!(text.contains("顧問先「青空」が見つかりません"));
        assert!(text.contains("名前: gov_doc_parser"));
        assert!(text.contains("ツール数: 2"));
        assert!(text.contains("step1_get_client_info"));
    }
}
