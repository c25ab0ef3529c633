//! `uniroad upload` — send a school-record PDF for processing.
//!
//! Upload and status polling use the retry policy of the academic
//! endpoints (capped exponential backoff); see `academic.rs`.

use std::path::Path;

use console::style;

use uniroad_protocol::TaskState;

use crate::academic::AcademicClient;
use crate::config::Config;

pub async fn run(config: Config, file: &Path, email: Option<String>) -> anyhow::Result<()> {
    let email = email
        .or_else(|| config.user_email.clone())
        .ok_or_else(|| anyhow::anyhow!("이메일이 필요합니다 (--email 또는 config의 user_email)"))?;

    let client = AcademicClient::new(&config.api_url, config.auth_token.clone());

    println!("{} {}", style("업로드 중:").bold(), file.display());
    let response = client.upload_with_retry(file, &email).await?;
    if !response.success {
        anyhow::bail!("업로드 거부됨: {}", response.message);
    }

    let Some(task_id) = response.task_id else {
        println!(
            "{} {}",
            style("완료:").green(),
            if response.message.is_empty() {
                "처리되었습니다.".to_string()
            } else {
                response.message
            }
        );
        return Ok(());
    };

    println!("{} task {}", style("처리 대기 중:").dim(), task_id);
    let final_status = client
        .poll_task_status(&task_id, |status| {
            if status.status == TaskState::InProgress {
                println!(
                    "  {} {} ({:.0}%)",
                    style("진행:").dim(),
                    status.current_step,
                    status.progress
                );
            }
        })
        .await?;

    println!(
        "{} {}건 처리됨",
        style("완료:").green(),
        response.total_records.unwrap_or(0)
    );
    if !final_status.current_step.is_empty() {
        println!("  마지막 단계: {}", final_status.current_step);
    }
    Ok(())
}
