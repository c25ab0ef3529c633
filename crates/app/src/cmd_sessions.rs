//! `uniroad sessions` — list the user's conversations.

use std::sync::Arc;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use uniroad_protocol::now_millis;

use crate::config::Config;
use crate::store::{SessionStore, SqliteStore};

const UNTITLED: &str = "새로운 대화";

pub async fn run(config: Config, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let sessions = store.list_sessions(&config.user_id).await?;
    if sessions.is_empty() {
        println!("대화가 없습니다. `uniroad chat` 으로 시작하세요.");
        return Ok(());
    }

    let now = now_millis();
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["ID", "제목", "마지막 활동"]);
    for session in &sessions {
        table.add_row(vec![
            session.id.clone(),
            session
                .summary
                .clone()
                .unwrap_or_else(|| UNTITLED.to_string()),
            relative_time(now, session.updated_at),
        ]);
    }
    println!("{table}");
    Ok(())
}

/// Coarse relative timestamp for the list view.
fn relative_time(now: i64, then: i64) -> String {
    let seconds = (now - then).max(0) / 1000;
    if seconds < 60 {
        "방금 전".to_string()
    } else if seconds < 3600 {
        format!("{}분 전", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}시간 전", seconds / 3600)
    } else {
        format!("{}일 전", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_time_buckets() {
        let now = 1_000_000_000_000;
        assert_eq!(relative_time(now, now - 5_000), "방금 전");
        assert_eq!(relative_time(now, now - 120_000), "2분 전");
        assert_eq!(relative_time(now, now - 7_200_000), "2시간 전");
        assert_eq!(relative_time(now, now - 172_800_000), "2일 전");
        // A clock skewed into the future clamps to "just now".
        assert_eq!(relative_time(now, now + 60_000), "방금 전");
    }
}
