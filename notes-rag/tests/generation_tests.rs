//! Chat-completions generator against a loopback HTTP server.

use std::time::Duration;

use notes_rag::generation::{AnswerGenerator, ChatCompletionGenerator};
use notes_rag::RagError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A captured request: header block and body.
struct Captured {
    head: String,
    body: String,
}

/// Serve one connection with a canned response and hand back the request.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/openai/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        captured
    });

    (base, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
    Captured { head, body }
}

#[tokio::test]
async fn successful_completion_returns_answer_text() {
    let (base, server) = serve_once(
        "200 OK",
        r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"A stack is LIFO."},"finish_reason":"stop"}]}"#,
    )
    .await;

    let generator = ChatCompletionGenerator::new("test-key")
        .unwrap()
        .with_api_base(format!("{base}/"))
        .with_model("llama-3.3-70b-versatile");

    let answer = generator.generate("What is a stack?").await.unwrap();
    assert_eq!(answer, "A stack is LIFO.");

    let captured = server.await.unwrap();
    assert!(captured.head.starts_with("POST /openai/v1/chat/completions "));
    assert!(captured.head.to_ascii_lowercase().contains("authorization: bearer test-key"));

    let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["temperature"], 0.0);
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "What is a stack?");
}

#[tokio::test]
async fn rate_limit_is_service_unavailable() {
    let (base, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"message":"Rate limit reached","type":"rate_limit"}}"#,
    )
    .await;

    let generator = ChatCompletionGenerator::new("test-key").unwrap().with_api_base(base);
    let err = generator.generate("What is a queue?").await.unwrap_err();

    match err {
        RagError::ServiceUnavailable { message, .. } => {
            assert!(message.contains("429"));
            assert!(message.contains("Rate limit reached"));
        }
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn empty_completion_is_service_unavailable() {
    let (base, server) =
        serve_once("200 OK", r#"{"choices":[{"message":{"role":"assistant","content":""}}]}"#).await;

    let generator = ChatCompletionGenerator::new("test-key").unwrap().with_api_base(base);
    let err = generator.generate("What is a heap?").await.unwrap_err();
    assert!(matches!(err, RagError::ServiceUnavailable { .. }));
    server.await.unwrap();
}

#[tokio::test]
async fn silent_server_times_out_as_service_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(socket);
    });

    let generator = ChatCompletionGenerator::new("test-key")
        .unwrap()
        .with_api_base(base)
        .with_timeout(Duration::from_millis(100));

    let err = generator.generate("What is recursion?").await.unwrap_err();
    match err {
        RagError::ServiceUnavailable { message, .. } => assert!(message.contains("100 ms")),
        other => panic!("expected ServiceUnavailable, got {other:?}"),
    }
    server.abort();
}
