//! Canned assistant replies.
//!
//! Every user submission must end with a persisted assistant message,
//! even when the backend is unreachable. The default substitute is the
//! service-unavailable guidance; the `canned_fallback` config variant
//! answers from a small keyword table instead.

/// Substituted when a stream closes without any accumulated content.
pub const NO_RESPONSE_REPLY: &str = "AI 응답이 없습니다.";

/// Substituted when the connection cannot be established or errors
/// mid-stream.
pub const SERVICE_UNAVAILABLE_REPLY: &str =
    "죄송합니다. 현재 AI 서비스에 연결할 수 없습니다. 네트워크를 확인하고 잠시 후 다시 시도해주세요.";

/// Rule-based reply keyed on simple keyword matches in the user's text.
/// Falls back to the service-unavailable guidance when nothing matches.
pub fn canned_reply(user_text: &str) -> String {
    let text = user_text.to_lowercase();

    if text.contains("안녕") || text.contains("hello") || text.contains("hi") {
        return "안녕하세요! 진로와 입시에 대해 무엇이든 물어보세요.".to_string();
    }
    if text.contains("전공") || text.contains("학과") || text.contains("major") {
        return "전공 선택은 생활기록부의 활동 내역과 교과 성적을 함께 보는 것이 좋아요. \
                생기부를 업로드하면 더 자세한 상담이 가능합니다."
            .to_string();
    }
    if text.contains("입시") || text.contains("수시") || text.contains("정시") {
        return "입시 전형은 학교와 학과마다 달라요. 희망 대학과 학과를 알려주시면 \
                전형별로 안내해 드릴게요."
            .to_string();
    }
    if text.contains("생기부") || text.contains("생활기록부") {
        return "설정 화면에서 생활기록부 PDF를 업로드하면 분석 결과를 바탕으로 \
                상담해 드립니다."
            .to_string();
    }

    SERVICE_UNAVAILABLE_REPLY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_keyword_matches() {
        let reply = canned_reply("안녕하세요");
        assert!(reply.contains("안녕하세요"));
        assert_ne!(reply, SERVICE_UNAVAILABLE_REPLY);
    }

    #[test]
    fn major_keyword_matches_case_insensitively() {
        let reply = canned_reply("What MAJOR should I pick?");
        assert!(reply.contains("전공"));
    }

    #[test]
    fn unmatched_text_gets_network_guidance() {
        assert_eq!(canned_reply("오늘 날씨 어때"), SERVICE_UNAVAILABLE_REPLY);
    }
}
