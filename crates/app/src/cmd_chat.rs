//! `uniroad chat` — interactive advisory chat.
//!
//! The terminal loop plays the role of the chat screen: it owns the
//! ChatSession, pumps exchange events back into it, and renders
//! realtime store pushes from other clients on the same database.

use std::sync::Arc;

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use uniroad_protocol::{Message, Sender};

use crate::chat::{ChatSession, DisplayUpdate, SendOutcome};
use crate::config::Config;
use crate::store::{SessionStore, SqliteStore};
use crate::stream::WsTransport;
use crate::summarize::AdvisoryApi;

pub async fn run(
    config: Config,
    store: Arc<SqliteStore>,
    session: Option<String>,
) -> anyhow::Result<()> {
    let profile = store.get_profile(&config.user_id).await?;
    let transport = Arc::new(WsTransport::new(config.chat_ws_url()));
    let api = AdvisoryApi::new(&config.api_url);

    let store_port: Arc<dyn SessionStore> = store.clone();
    let (mut chat, mut exchange_events) = ChatSession::new(
        store_port,
        transport,
        api,
        &config.user_id,
        profile,
        config.canned_fallback,
    );

    if let Some(id) = session {
        chat.adopt_session(id.clone()).await?;
        info!(component = "cmd_chat", session_id = %id, "Resumed session");
        for message in chat.messages_for_display() {
            render_message(&message);
        }
    }

    let mut store_events = store.subscribe();

    println!(
        "{}",
        style("진로 상담을 시작합니다. 종료하려면 /quit 을 입력하세요.").dim()
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim() == "/quit" {
                    break;
                }
                match chat.send_message(&line).await {
                    Ok(SendOutcome::Started) | Ok(SendOutcome::Empty) => {}
                    Ok(SendOutcome::Busy) => {
                        let waiting = chat.status_line().unwrap_or("AI가 응답을 생성중입니다...");
                        println!("{}", style(waiting).dim());
                    }
                    Err(e) => {
                        // Setup error: nothing was sent, nothing persisted.
                        eprintln!("{} {}", style("전송 실패:").red(), e);
                    }
                }
            }

            Some(event) = exchange_events.recv() => {
                match chat.on_exchange_event(event).await {
                    Some(DisplayUpdate::Status(label)) => {
                        println!("{}", style(format!("[{}]", label)).dim());
                    }
                    Some(DisplayUpdate::Reply(reply)) => {
                        render_message(&reply);
                    }
                    None => {}
                }
            }

            Ok(event) = store_events.recv() => {
                // A message inserted by another client of the same store.
                if let Some(message) = chat.apply_store_event(event) {
                    render_message(&message);
                }
            }
        }
    }

    if let Some(id) = chat.session_id() {
        println!(
            "{}",
            style(format!("이어서 대화하려면: uniroad chat --session {}", id)).dim()
        );
    }
    chat.close();
    Ok(())
}

fn render_message(message: &Message) {
    match message.sender {
        Sender::User => println!("{} {}", style("나:").bold().cyan(), message.content),
        Sender::Assistant => println!("{} {}", style("AI:").bold().green(), message.content),
    }
}
