//! `uniroad profile` — manage the profile context attached to chat
//! requests.

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::store::{SessionStore, SqliteStore};

pub async fn import(config: Config, store: Arc<SqliteStore>, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let data: serde_json::Value = serde_json::from_str(&raw)?;
    store.set_profile(&config.user_id, &data).await?;
    println!("프로필을 저장했습니다.");
    Ok(())
}

pub async fn show(config: Config, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    match store.get_profile(&config.user_id).await? {
        Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
        None => println!("저장된 프로필이 없습니다."),
    }
    Ok(())
}
