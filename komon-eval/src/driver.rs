//! End-to-end test cases against the `gov_doc_parser` agent.
//!
//! Each case picks a random client, asks the agent to fill in the labour
//! insurance form for it, approves the agent's confirmation question if one
//! comes, and then checks which name reached step 2.

use crate::error::{EvalError, Result};
use crate::recorder::{ToolCallRecord, ToolCallRecorder};
use crate::store::{ResultRow, ResultStore};
use crate::verify::{StepSummary, Verification};
use futures::StreamExt;
use komon_agent::{
    APP_NAME, CreateRequest, GetRequest, InMemorySessionService, Runner, RunnerConfig,
    SessionService, gov_doc_parser_builder,
};
use komon_core::{Content, Event, KomonError, Llm};
use komon_tool::ClientRegistry;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::{Arc, Mutex};

pub const TEST_USER_ID: &str = "test_user";

/// Phrases that mark a reply as asking the user to confirm.
pub const CONFIRMATION_PHRASES: [&str; 2] = ["よろしいですか", "よろしいでしょうか"];

pub const CONFIRMATION_MESSAGES: [&str; 10] = [
    "はい",
    "Yes",
    "お願い",
    "大丈夫",
    "ok",
    "うん",
    "はい、大丈夫です",
    "はい、進めてください",
    "問題ありません",
    "⭕️",
];

pub fn user_message(client_name: &str) -> String {
    format!("顧問先「{client_name}」の労働保険申告を自動入力してください")
}

pub fn asks_for_confirmation(events: &[Event]) -> bool {
    events.iter().any(|event| {
        let text = event.text();
        CONFIRMATION_PHRASES.iter().any(|phrase| text.contains(phrase))
    })
}

/// Non-empty text of every event the agent authored.
pub fn agent_replies(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter(|event| event.author != "user")
        .map(Event::text)
        .filter(|text| !text.trim().is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub test_case_id: u64,
    pub expected_client_name: String,
    /// Empty when the agent never asked for confirmation.
    pub confirmation_message: String,
    pub summary: StepSummary,
    pub verification: Verification,
    pub error: Option<String>,
    /// Every tool execution of the case, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Text the agent said, one entry per reply event.
    pub replies: Vec<String>,
}

impl CaseOutcome {
    pub fn outcome(&self) -> Option<bool> {
        self.verification.outcome()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub undecidable: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: Option<bool>) {
        self.total += 1;
        match outcome {
            Some(true) => self.success += 1,
            Some(false) => self.failure += 1,
            None => self.undecidable += 1,
        }
    }

    /// `Some(true)` when nothing failed and something passed, `Some(false)`
    /// when anything failed, `None` otherwise.
    pub fn verdict(&self) -> Option<bool> {
        if self.failure > 0 {
            Some(false)
        } else if self.success > 0 {
            Some(true)
        } else {
            None
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "総テスト数: {}", self.total)?;
        writeln!(f, "成功: {}", self.success)?;
        writeln!(f, "失敗: {}", self.failure)?;
        write!(f, "判定不可: {}", self.undecidable)
    }
}

pub struct TestCaseDriver {
    runner: Runner,
    sessions: Arc<InMemorySessionService>,
    registry: Arc<ClientRegistry>,
    recorder: ToolCallRecorder,
    store: ResultStore,
    rng: Mutex<StdRng>,
}

impl TestCaseDriver {
    /// Builds the root agent over `model` with a recording callback attached.
    pub fn new(
        model: Arc<dyn Llm>,
        registry: Arc<ClientRegistry>,
        store: ResultStore,
    ) -> Result<Self> {
        let recorder = ToolCallRecorder::new();
        let agent = gov_doc_parser_builder(model, registry.clone())
            .after_tool_callback(recorder.callback())
            .build()?;

        let sessions = Arc::new(InMemorySessionService::new());
        let runner = Runner::new(RunnerConfig {
            app_name: APP_NAME.to_string(),
            agent: Arc::new(agent),
            session_service: sessions.clone(),
        });

        Ok(Self {
            runner,
            sessions,
            registry,
            recorder,
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Makes client and confirmation choices reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn recorder(&self) -> &ToolCallRecorder {
        &self.recorder
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> Result<T> {
        let mut rng = self.rng.lock().map_err(|_| EvalError::Config("rng lock poisoned".into()))?;
        Ok(f(&mut rng))
    }

    /// Runs one case and appends its row to the results file. Agent failures
    /// are recorded as `エラー`; only failures to write the row are returned.
    pub async fn run_case(&self, test_case_id: u64) -> Result<CaseOutcome> {
        let expected = self
            .with_rng(|rng| self.registry.choose(rng).map(str::to_string))?
            .ok_or_else(|| EvalError::Config("client registry is empty".into()))?;

        tracing::info!(test_case_id, expected_client_name = %expected, "starting test case");
        self.recorder.clear();

        let mut confirmation_message = String::new();
        let conversation = self.converse(&expected, &mut confirmation_message).await;

        let tool_calls = self.recorder.calls();

        let (summary, verification, error, replies) = match conversation {
            Ok(events) => {
                let summary = StepSummary::from_calls(&tool_calls);
                let verification = summary.verify(&expected);
                (summary, verification, None, agent_replies(&events))
            }
            Err(e) => {
                let described = EvalError::from(e).describe();
                tracing::warn!(test_case_id, error = %described, "test case failed");
                (StepSummary::default(), Verification::Error, Some(described), Vec::new())
            }
        };

        let row = ResultRow::new(
            test_case_id,
            &expected,
            &summary,
            verification,
            &confirmation_message,
            error.as_deref().unwrap_or_default(),
        );
        self.store.append(&row)?;

        tracing::info!(
            test_case_id,
            expected_client_name = %expected,
            step2_client_name = %summary.step2_client_name,
            verification = %verification,
            "test case finished"
        );

        Ok(CaseOutcome {
            test_case_id,
            expected_client_name: expected,
            confirmation_message,
            summary,
            verification,
            error,
            tool_calls,
            replies,
        })
    }

    /// Runs cases `1..=count` one after another.
    pub async fn run_many(&self, count: u64) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for test_case_id in 1..=count {
            let outcome = self.run_case(test_case_id).await?;
            summary.record(outcome.outcome());
        }
        tracing::info!(
            total = summary.total,
            success = summary.success,
            failure = summary.failure,
            undecidable = summary.undecidable,
            "test run finished"
        );
        Ok(summary)
    }

    async fn converse(
        &self,
        client_name: &str,
        confirmation_message: &mut String,
    ) -> komon_core::Result<Vec<Event>> {
        let session = self
            .sessions
            .create(CreateRequest {
                app_name: APP_NAME.to_string(),
                user_id: TEST_USER_ID.to_string(),
                session_id: Some(format!("test_{}", uuid::Uuid::new_v4())),
            })
            .await?;

        let result = self.converse_in(&session.id, client_name, confirmation_message).await;

        self.sessions
            .delete(GetRequest {
                app_name: APP_NAME.to_string(),
                user_id: TEST_USER_ID.to_string(),
                session_id: session.id,
            })
            .await?;

        result
    }

    async fn converse_in(
        &self,
        session_id: &str,
        client_name: &str,
        confirmation_message: &mut String,
    ) -> komon_core::Result<Vec<Event>> {
        let mut events = self.send(session_id, &user_message(client_name)).await?;

        if asks_for_confirmation(&events) {
            let reply = self
                .with_rng(|rng| CONFIRMATION_MESSAGES.choose(rng).copied())
                .map_err(|e| KomonError::Agent(e.to_string()))?
                .unwrap_or(CONFIRMATION_MESSAGES[0]);
            tracing::debug!(session.id = %session_id, reply, "approving confirmation request");
            *confirmation_message = reply.to_string();
            events.extend(self.send(session_id, reply).await?);
        }

        Ok(events)
    }

    async fn send(&self, session_id: &str, text: &str) -> komon_core::Result<Vec<Event>> {
        let mut stream = self
            .runner
            .run(
                TEST_USER_ID.to_string(),
                session_id.to_string(),
                Content::new("user").with_text(text),
            )
            .await?;

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event?);
        }
        Ok(events)
    }
}
