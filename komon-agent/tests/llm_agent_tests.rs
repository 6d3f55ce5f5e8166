use futures::StreamExt;
use komon_agent::{
    APP_NAME, CreateRequest, GetRequest, InMemorySessionService, LlmAgentBuilder, Runner,
    RunnerConfig, SessionService, gov_doc_parser_builder,
};
use komon_core::{AfterToolCallback, Agent, Content, Event, KomonError, LlmResponse};
use komon_model::MockLlm;
use komon_tool::{ClientRegistry, STEP1_TOOL_NAME, STEP2_TOOL_NAME, client_tools};
use serde_json::json;
use std::sync::Arc;

const USER: &str = "test_user";

fn registry() -> Arc<ClientRegistry> {
    Arc::new(ClientRegistry::new(["株式会社青空", "青空商事株式会社", "有限会社みどり"]))
}

async fn runner_for(
    agent: Arc<dyn Agent>,
    session_id: &str,
) -> (Runner, Arc<InMemorySessionService>) {
    let sessions = Arc::new(InMemorySessionService::new());
    sessions
        .create(CreateRequest {
            app_name: APP_NAME.to_string(),
            user_id: USER.to_string(),
            session_id: Some(session_id.to_string()),
        })
        .await
        .unwrap();
    let runner = Runner::new(RunnerConfig {
        app_name: APP_NAME.to_string(),
        agent,
        session_service: sessions.clone(),
    });
    (runner, sessions)
}

async fn send(runner: &Runner, session_id: &str, text: &str) -> Vec<Result<Event, KomonError>> {
    runner
        .run(USER.to_string(), session_id.to_string(), Content::new("user").with_text(text))
        .await
        .unwrap()
        .collect()
        .await
}

#[tokio::test]
async fn test_step1_then_step2_in_one_turn() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "株式会社青空"}))
            .with_function_call(STEP2_TOOL_NAME, json!({"client_name": "株式会社青空"}))
            .with_text("株式会社青空の処理が完了しました"),
    );
    let agent = gov_doc_parser_builder(model.clone(), registry()).build().unwrap();
    let (runner, _) = runner_for(Arc::new(agent), "s1").await;

    let events: Vec<Event> = send(&runner, "s1", "顧問先「株式会社青空」の労働保険申告を自動入力してください")
        .await
        .into_iter()
        .map(|e| e.unwrap())
        .collect();

    // call, response, call, response, final text
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.author == "gov_doc_parser"));

    let step1 = events[1].function_responses();
    assert_eq!(step1[0].name, STEP1_TOOL_NAME);
    assert_eq!(step1[0].response["count"], 1);

    let step2 = events[3].function_responses();
    assert_eq!(step2[0].name, STEP2_TOOL_NAME);
    assert_eq!(step2[0].response["verified"], true);

    assert_eq!(events[4].text(), "株式会社青空の処理が完了しました");

    let requests = model.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[0].contents[0].text().contains("社労士"));
    assert!(requests[0].tools.contains_key(STEP1_TOOL_NAME));
    assert!(requests[0].tools.contains_key(STEP2_TOOL_NAME));
    // instruction, user message, call, response, call, response
    assert_eq!(requests[2].contents.len(), 6);
}

#[tokio::test]
async fn test_confirmation_reply_sees_previous_turn() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "有限会社みどり"}))
            .with_text("有限会社みどりで処理してよろしいですか？")
            .with_function_call(STEP2_TOOL_NAME, json!({"client_name": "有限会社みどり"}))
            .with_text("完了しました"),
    );
    let agent = gov_doc_parser_builder(model.clone(), registry()).build().unwrap();
    let (runner, sessions) = runner_for(Arc::new(agent), "s2").await;

    let first = send(&runner, "s2", "顧問先「有限会社みどり」の労働保険申告を自動入力してください").await;
    assert_eq!(first.len(), 3);
    let second = send(&runner, "s2", "はい").await;
    assert_eq!(second.len(), 3);

    let requests = model.requests();
    let last = requests.last().unwrap();
    let texts: Vec<String> = last.contents.iter().map(|c| c.text()).collect();
    assert!(texts.iter().any(|t| t.contains("よろしいですか")));
    assert!(texts.iter().any(|t| t == "はい"));

    let session = sessions
        .get(GetRequest {
            app_name: APP_NAME.to_string(),
            user_id: USER.to_string(),
            session_id: "s2".to_string(),
        })
        .await
        .unwrap();
    // two user messages plus six agent events
    assert_eq!(session.events.len(), 8);
}

#[tokio::test]
async fn test_after_tool_callback_can_replace_response() {
    let callback: AfterToolCallback = Box::new(|_ctx, invocation| {
        Box::pin(async move {
            let replacement = (invocation.tool_name == STEP2_TOOL_NAME)
                .then(|| json!({"success": false, "message": "blocked"}));
            Ok::<_, KomonError>(replacement)
        })
    });
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "株式会社青空"}))
            .with_function_call(STEP2_TOOL_NAME, json!({"client_name": "株式会社青空"})),
    );
    let agent = gov_doc_parser_builder(model, registry())
        .after_tool_callback(callback)
        .build()
        .unwrap();
    let (runner, _) = runner_for(Arc::new(agent), "s3").await;

    let events: Vec<Event> =
        send(&runner, "s3", "go").await.into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(events[1].function_responses()[0].response["success"], true);
    assert_eq!(
        events[3].function_responses()[0].response,
        json!({"success": false, "message": "blocked"})
    );
}

#[tokio::test]
async fn test_unknown_tool_and_bad_args_are_reported_to_model() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call("step3_delete_everything", json!({}))
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": 7}))
            .with_text("失敗しました"),
    );
    let agent = LlmAgentBuilder::new("agent")
        .model(model)
        .tools(client_tools(registry()))
        .build()
        .unwrap();
    let (runner, _) = runner_for(Arc::new(agent), "s4").await;

    let events: Vec<Event> =
        send(&runner, "s4", "go").await.into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(events.len(), 5);

    let unknown = events[1].function_responses()[0].response.clone();
    assert!(unknown["error"].as_str().unwrap().contains("step3_delete_everything"));
    let bad_args = events[3].function_responses()[0].response.clone();
    assert!(bad_args["error"].as_str().unwrap().contains("invalid arguments"));
}

#[tokio::test]
async fn test_max_iterations_is_agent_error() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "株式会社青空"}))
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "株式会社青空"}))
            .with_function_call(STEP1_TOOL_NAME, json!({"client_name": "株式会社青空"})),
    );
    let agent = LlmAgentBuilder::new("agent")
        .model(model)
        .tools(client_tools(registry()))
        .max_iterations(2)
        .build()
        .unwrap();
    let (runner, _) = runner_for(Arc::new(agent), "s5").await;

    let results = send(&runner, "s5", "go").await;
    let last = results.last().unwrap();
    assert!(matches!(last, Err(KomonError::Agent(msg)) if msg.contains("Max iterations")));
}

#[tokio::test]
async fn test_model_error_response_ends_turn() {
    let model = Arc::new(MockLlm::new("mock").with_response(LlmResponse {
        error_code: Some("SAFETY".to_string()),
        error_message: Some("blocked by safety filters".to_string()),
        turn_complete: true,
        ..Default::default()
    }));
    let agent = LlmAgentBuilder::new("agent").model(model).build().unwrap();
    let (runner, _) = runner_for(Arc::new(agent), "s6").await;

    let results = send(&runner, "s6", "go").await;
    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0], Err(KomonError::Model(msg)) if msg.contains("safety")));
}
