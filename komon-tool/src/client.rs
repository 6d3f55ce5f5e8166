//! Step 1 / step 2 client tools.
//!
//! The agent must look a client up with [`STEP1_TOOL_NAME`] before it runs the
//! form fill with [`STEP2_TOOL_NAME`], passing the exact name step 1 returned.

use crate::function_tool::FunctionTool;
use crate::registry::ClientRegistry;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use komon_core::{KomonError, Result, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const STEP1_TOOL_NAME: &str = "step1_get_client_info";
pub const STEP2_TOOL_NAME: &str = "step2_process_client_data";

const STEP1_DESCRIPTION: &str = "【ステップ1】顧問先情報取得ツール。\
⚠️ 重要: このツールは必ずstep2_process_client_dataの前に実行してください。\
顧問先事業所リストから指定された名前に完全一致する顧問先を検索し、該当する顧問先を全て返します。\
戻り値: success（検索の成功/失敗）、matches（一致した顧問先のリスト）、count（一致件数）、query（検索クエリ）。";

const STEP2_DESCRIPTION: &str = "【ステップ2】顧問先情報をもとに処理をするツール。\
⚠️ 重要: このツールはstep1_get_client_infoの実行後にのみ使用してください。\
⚠️ 必ずstep1で取得した正確な顧問先名を使用してください。\
指定された顧問先に対して自動入力処理を実行します。実際の処理の前に、顧問先が正しいことを検証します。\
戻り値: success、client_name、verified（顧問先の検証結果）、message、details。";

/// UTC+9, the timezone simulated form fills are stamped in.
fn jst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap_or_else(|| Utc.fix())
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClientNameArgs {
    /// 顧問先名（完全一致）
    pub client_name: String,
}

impl ClientNameArgs {
    fn parse(tool: &str, args: Value) -> Result<Self> {
        serde_json::from_value(args)
            .map_err(|e| KomonError::Tool(format!("{tool}: invalid arguments: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub success: bool,
    pub matches: Vec<String>,
    pub count: usize,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessResult {
    pub success: bool,
    pub client_name: String,
    pub verified: bool,
    pub message: String,
    pub details: ProcessDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessDetails {
    Completed { verified_client: String, timestamp: String },
    NotFound { error: String, note: String },
}

/// Step 1: exact-match lookup.
pub fn get_client_info(registry: &ClientRegistry, client_name: &str) -> LookupResult {
    let matches = registry.exact_matches(client_name);
    LookupResult {
        success: !matches.is_empty(),
        count: matches.len(),
        matches,
        query: client_name.to_string(),
    }
}

/// Step 2: verify the exact name, then run the simulated form fill.
pub fn process_client_data(registry: &ClientRegistry, client_name: &str) -> ProcessResult {
    process_client_data_at(registry, client_name, Utc::now().with_timezone(&jst()))
}

pub fn process_client_data_at(
    registry: &ClientRegistry,
    client_name: &str,
    processed_at: DateTime<FixedOffset>,
) -> ProcessResult {
    if !registry.contains(client_name) {
        return ProcessResult {
            success: false,
            client_name: client_name.to_string(),
            verified: false,
            message: format!(
                "顧問先「{client_name}」が見つかりません。完全一致する顧問先名を指定してください"
            ),
            details: ProcessDetails::NotFound {
                error: "client_not_found".to_string(),
                note: "完全一致検索を使用しています".to_string(),
            },
        };
    }

    ProcessResult {
        success: true,
        client_name: client_name.to_string(),
        verified: true,
        message: format!("顧問先「{client_name}」への自動入力処理が完了しました"),
        details: ProcessDetails::Completed {
            verified_client: client_name.to_string(),
            timestamp: processed_at.to_rfc3339(),
        },
    }
}

pub fn step1_tool(registry: Arc<ClientRegistry>) -> FunctionTool {
    FunctionTool::new(STEP1_TOOL_NAME, STEP1_DESCRIPTION, move |_ctx, args| {
        let registry = registry.clone();
        async move {
            let args = ClientNameArgs::parse(STEP1_TOOL_NAME, args)?;
            let result = get_client_info(&registry, &args.client_name);
            tracing::info!(
                tool = STEP1_TOOL_NAME,
                query = %result.query,
                count = result.count,
                "client lookup"
            );
            Ok(serde_json::to_value(result)?)
        }
    })
    .with_parameters_schema::<ClientNameArgs>()
}

pub fn step2_tool(registry: Arc<ClientRegistry>) -> FunctionTool {
    FunctionTool::new(STEP2_TOOL_NAME, STEP2_DESCRIPTION, move |_ctx, args| {
        let registry = registry.clone();
        async move {
            let args = ClientNameArgs::parse(STEP2_TOOL_NAME, args)?;
            let result = process_client_data(&registry, &args.client_name);
            tracing::info!(
                tool = STEP2_TOOL_NAME,
                client_name = %result.client_name,
                verified = result.verified,
                "client processing"
            );
            Ok(serde_json::to_value(result)?)
        }
    })
    .with_parameters_schema::<ClientNameArgs>()
}

/// Both tools over one shared registry, step 1 first.
pub fn client_tools(registry: Arc<ClientRegistry>) -> Vec<Arc<dyn Tool>> {
    vec![Arc::new(step1_tool(registry.clone())), Arc::new(step2_tool(registry))]
}
