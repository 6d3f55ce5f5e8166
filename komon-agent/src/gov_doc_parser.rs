//! The `gov_doc_parser` root agent: reads client names out of government
//! forms and runs the step 1 / step 2 tools against the client registry.

use crate::llm_agent::{LlmAgent, LlmAgentBuilder};
use komon_core::{Llm, Result};
use komon_tool::{ClientRegistry, client_tools};
use std::sync::Arc;

pub const AGENT_NAME: &str = "gov_doc_parser";
pub const APP_NAME: &str = "gov_doc_parser_app";

pub const DESCRIPTION: &str = "顧問先名が記載された政府文書を解析し、顧問先名を抽出します。\
また、顧問先情報の取得と処理を行います。";

pub const INSTRUCTION: &str = "\
あなたは社労士の業務をサポートするAIエージェントです。

主な役割:
1. 顧問先名を確認し、正確な情報を取得する
2. 取得した顧問先情報をもとに自動入力などの処理を実行する

重要な注意事項:
- 顧問先名を処理する前に、必ずstep1_get_client_infoツールで顧問先を確認してください
- 複数の候補がある場合は、ユーザーに正確な顧問先名を確認してください
- step2_process_client_dataツールを実行する前に、ユーザーに最終確認を求めてください
- 処理結果は明確に報告してください
";

/// Builder preloaded with the root agent's name, prompt and tools. Callers
/// add callbacks or limits before `build()`.
pub fn gov_doc_parser_builder(
    model: Arc<dyn Llm>,
    registry: Arc<ClientRegistry>,
) -> LlmAgentBuilder {
    LlmAgentBuilder::new(AGENT_NAME)
        .description(DESCRIPTION)
        .instruction(INSTRUCTION)
        .model(model)
        .tools(client_tools(registry))
}

pub fn gov_doc_parser(model: Arc<dyn Llm>, registry: Arc<ClientRegistry>) -> Result<LlmAgent> {
    gov_doc_parser_builder(model, registry).build()
}
