use anyhow::Result;
use futures::StreamExt;
use komon_agent::{
    APP_NAME, CreateRequest, InMemorySessionService, Runner, RunnerConfig, SessionService,
};
use komon_core::{Agent, Content, Event, Part};
use komon_eval::ToolCallRecord;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;

/// Interactive session with `agent`. One session lasts until Ctrl+C / Ctrl+D.
pub async fn run_console(agent: Arc<dyn Agent>, user_id: String) -> Result<()> {
    let session_service = Arc::new(InMemorySessionService::new());
    let session = session_service
        .create(CreateRequest {
            app_name: APP_NAME.to_string(),
            user_id: user_id.clone(),
            session_id: None,
        })
        .await?;

    let runner = Runner::new(RunnerConfig {
        app_name: APP_NAME.to_string(),
        agent: agent.clone(),
        session_service: session_service.clone(),
    });

    let mut rl = DefaultEditor::new()?;

    println!("komon console");
    println!("Agent: {}", agent.name());
    println!("Type your message and press Enter. Ctrl+C to exit.\n");

    loop {
        match rl.readline("User -> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(&line)?;

                let user_content = Content::new("user").with_text(line);
                let mut events =
                    runner.run(user_id.clone(), session.id.clone(), user_content).await?;

                print!("\nAgent -> ");
                let mut turn = Vec::new();
                while let Some(event) = events.next().await {
                    match event {
                        Ok(evt) => {
                            print_text(&evt);
                            turn.push(evt);
                        }
                        Err(e) => eprintln!("\nError: {}", e),
                    }
                }
                println!();

                for call in ToolCallRecord::from_events(&turn) {
                    println!("  [tool] {} {} -> {}", call.tool_name, call.args, call.result);
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("EOF");
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn print_text(event: &Event) {
    if let Some(content) = event.content() {
        for part in &content.parts {
            if let Part::Text { text } = part {
                print!("{}", text);
            }
        }
    }
}
