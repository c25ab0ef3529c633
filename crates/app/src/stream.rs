//! Transport connector for the chat stream.
//!
//! One fresh duplex connection per user submission: connect, send the
//! request once, feed every inbound frame to the interpreter until a
//! terminal frame or the remote closes, then finalize. No automatic
//! retry on any failure — reopening a generation stream mid-flight is
//! not safely retryable.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info};

use uniroad_protocol::ChatRequest;

use crate::error::TransportError;
use crate::interpreter::{FinalReply, FrameInterpreter, Step};

/// Injected transport port for one streaming exchange.
///
/// Transient status lines are delivered through `status_tx` as they
/// arrive; the finished reply is the return value.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn run(
        &self,
        request: ChatRequest,
        status_tx: mpsc::Sender<String>,
    ) -> Result<FinalReply, TransportError>;
}

/// Production transport over tokio-tungstenite.
pub struct WsTransport {
    url: String,
}

impl WsTransport {
    pub fn new(url: String) -> Self {
        Self { url }
    }
}

#[async_trait]
impl StreamTransport for WsTransport {
    async fn run(
        &self,
        request: ChatRequest,
        status_tx: mpsc::Sender<String>,
    ) -> Result<FinalReply, TransportError> {
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(TransportError::Connect)?;
        info!(
            component = "stream",
            session_id = %request.session_id,
            url = %self.url,
            "Chat stream connected"
        );

        let payload = serde_json::to_string(&request)?;
        ws.send(WsMessage::text(payload))
            .await
            .map_err(TransportError::Stream)?;

        let mut interpreter = FrameInterpreter::new();
        while let Some(inbound) = ws.next().await {
            match inbound {
                Ok(WsMessage::Text(text)) => match interpreter.on_frame(text.as_str()) {
                    Step::Status(label) => {
                        let _ = status_tx.send(label).await;
                    }
                    Step::RequestClose => {
                        debug!(component = "stream", "Terminal frame, closing");
                        let _ = ws.close(None).await;
                        break;
                    }
                    Step::Continue => {}
                },
                Ok(WsMessage::Close(_)) => break,
                // Ping/pong are answered by tungstenite; binary frames
                // are not part of this protocol.
                Ok(_) => {}
                Err(e) => return Err(TransportError::Stream(e)),
            }
        }

        Ok(interpreter.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn request() -> ChatRequest {
        ChatRequest {
            session_id: "sess-1".to_string(),
            messages: vec![],
            user_id: None,
            attachments: vec![],
            profile: None,
        }
    }

    /// Serve one connection: read the request, send the scripted frames,
    /// then wait for the client close.
    async fn serve_frames(frames: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let _request = ws.next().await;
            for frame in frames {
                ws.send(WsMessage::text(frame.to_string()))
                    .await
                    .expect("send frame");
            }
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });
        format!("ws://{}/chat", addr)
    }

    #[tokio::test]
    async fn structured_stream_yields_answer_and_status() {
        let url = serve_frames(vec![
            r#"{"type":"searching"}"#,
            r#"{"type":"answer","message":"반갑습니다","pending_id":"p-1"}"#,
            r#"{"type":"done"}"#,
        ])
        .await;

        let (status_tx, mut status_rx) = mpsc::channel(8);
        let reply = WsTransport::new(url)
            .run(request(), status_tx)
            .await
            .expect("exchange");

        assert_eq!(reply.content, "반갑습니다");
        assert_eq!(reply.pending_id.as_deref(), Some("p-1"));
        assert_eq!(status_rx.recv().await.as_deref(), Some("검색 중..."));
    }

    #[tokio::test]
    async fn legacy_stream_concatenates_fragments() {
        let url = serve_frames(vec!["Hel", "lo", "[STREAM_END]"]).await;

        let (status_tx, _status_rx) = mpsc::channel(8);
        let reply = WsTransport::new(url)
            .run(request(), status_tx)
            .await
            .expect("exchange");

        assert_eq!(reply.content, "Hello");
    }

    #[tokio::test]
    async fn remote_close_without_frames_is_an_empty_completion() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            let _request = ws.next().await;
            ws.close(None).await.expect("close");
        });

        let (status_tx, _status_rx) = mpsc::channel(8);
        let reply = WsTransport::new(format!("ws://{}/chat", addr))
            .run(request(), status_tx)
            .await
            .expect("exchange");

        assert_eq!(reply.content, crate::fallback::NO_RESPONSE_REPLY);
    }

    #[tokio::test]
    async fn connect_failure_is_a_transport_error() {
        // Nothing is listening on this port.
        let (status_tx, _status_rx) = mpsc::channel(8);
        let result = WsTransport::new("ws://127.0.0.1:1/chat".to_string())
            .run(request(), status_tx)
            .await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
