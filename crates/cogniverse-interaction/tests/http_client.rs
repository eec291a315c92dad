use cogniverse_core::completion::{
    CompletionClient, CompletionError, ContextMessage, complete_streaming,
};
use cogniverse_core::config::CompletionConfig;
use cogniverse_interaction::OpenAiApiClient;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// What the loopback server sends back, chunk by chunk.
struct CannedResponse {
    status: &'static str,
    content_type: &'static str,
    chunks: Vec<String>,
    gap: Duration,
}

impl CannedResponse {
    fn json(status: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string()],
            gap: Duration::from_millis(10),
        }
    }

    fn sse(chunks: &[&str]) -> Self {
        Self {
            status: "200 OK",
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            gap: Duration::from_millis(10),
        }
    }

    fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }
}

/// Serves exactly one request on a random local port.
///
/// Returns the base URL and a handle resolving to the raw request text.
async fn serve_once(response: CannedResponse) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;

        let length: usize = response.chunks.iter().map(String::len).sum();
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            response.status, response.content_type, length
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for chunk in &response.chunks {
            socket.write_all(chunk.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(response.gap).await;
        }
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}/v1"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn client_for(base_url: String) -> OpenAiApiClient {
    let config = CompletionConfig {
        base_url,
        model: "test-model".to_string(),
        timeout_secs: 5,
        referer: Some("http://localhost".to_string()),
        ..CompletionConfig::default()
    };
    OpenAiApiClient::new("sk-test-key", config).unwrap()
}

fn context() -> Vec<ContextMessage> {
    vec![
        ContextMessage::system("You are a test."),
        ContextMessage::user("Hello"),
    ]
}

#[tokio::test]
async fn test_complete_returns_first_choice() {
    let (base_url, server) = serve_once(CannedResponse::json(
        "200 OK",
        r#"{"choices": [{"message": {"role": "assistant", "content": "Hi from the model"}}]}"#,
    ))
    .await;

    let reply = client_for(base_url).complete(&context()).await.unwrap();
    assert_eq!(reply, "Hi from the model");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    let lower = request.to_lowercase();
    assert!(lower.contains("authorization: bearer sk-test-key"));
    assert!(lower.contains("http-referer: http://localhost"));
    assert!(lower.contains("x-title: cogniverse chat app"));
    assert!(request.contains(r#""model":"test-model""#));
    assert!(request.contains(r#""stream":false"#));
    assert!(request.contains(r#""role":"system""#));
}

#[tokio::test]
async fn test_rate_limit_maps_to_http_429() {
    let (base_url, _server) = serve_once(CannedResponse::json(
        "429 Too Many Requests",
        r#"{"error": {"message": "Rate limit exceeded", "code": 429}}"#,
    ))
    .await;

    let err = client_for(base_url).complete(&context()).await.unwrap_err();
    assert_eq!(err, CompletionError::http(429, "Rate limit exceeded"));
    assert_eq!(
        err.user_message(),
        "I'm receiving too many requests right now. Please wait a moment and try again."
    );
}

#[tokio::test]
async fn test_unexpected_body_is_a_parse_error() {
    let (base_url, _server) =
        serve_once(CannedResponse::json("200 OK", r#"{"object": "nothing useful"}"#)).await;

    let err = client_for(base_url).complete(&context()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn test_refused_connection_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client_for(format!("http://{addr}/v1"))
        .complete(&context())
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn test_silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _request = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config = CompletionConfig {
        base_url: format!("http://{addr}/v1"),
        timeout_secs: 1,
        ..CompletionConfig::default()
    };
    let client = OpenAiApiClient::new("sk-test-key", config).unwrap();

    let err = client.complete(&context()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn test_stream_skips_malformed_frame() {
    let (base_url, server) = serve_once(CannedResponse::sse(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
        "data: {not json at all\n\n",
        // The next frame is split across two transport chunks.
        "data: {\"choices\":[{\"delta\":{\"con",
        "tent\":\" world\"}}]}\n\ndata: [DONE]\n\n",
    ]))
    .await;

    let client = client_for(base_url);
    let mut fragments = Vec::new();
    let reply = complete_streaming(&client, &context(), |f| fragments.push(f.to_string()))
        .await
        .unwrap();

    assert_eq!(reply, "Hello world");
    assert_eq!(fragments, vec!["Hello", " world"]);
    assert!(server.await.unwrap().contains(r#""stream":true"#));
}

#[tokio::test]
async fn test_stream_outlives_timeout_while_frames_keep_arriving() {
    let frames: Vec<String> = (0..8)
        .map(|i| format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"w{i} \"}}}}]}}\n\n"))
        .chain(std::iter::once("data: [DONE]\n\n".to_string()))
        .collect();
    let frames: Vec<&str> = frames.iter().map(String::as_str).collect();
    let (base_url, _server) =
        serve_once(CannedResponse::sse(&frames).with_gap(Duration::from_millis(300))).await;

    let config = CompletionConfig {
        base_url,
        timeout_secs: 1,
        ..CompletionConfig::default()
    };
    let client = OpenAiApiClient::new("sk-test-key", config).unwrap();

    let mut fragments = Vec::new();
    let reply = complete_streaming(&client, &context(), |f| fragments.push(f.to_string()))
        .await
        .unwrap();

    assert_eq!(fragments.len(), 8);
    assert_eq!(reply, "w0 w1 w2 w3 w4 w5 w6 w7 ");
}

#[tokio::test]
async fn test_stream_http_error_fails_before_first_fragment() {
    let (base_url, _server) = serve_once(CannedResponse::json(
        "401 Unauthorized",
        r#"{"error": {"message": "No auth credentials found"}}"#,
    ))
    .await;

    let client = client_for(base_url);
    let err = complete_streaming(&client, &context(), |_| panic!("no fragments expected"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_usage_returns_document_or_none() {
    let (base_url, server) = serve_once(CannedResponse::json(
        "200 OK",
        r#"{"data": {"label": "test", "usage": 1.25, "limit": null}}"#,
    ))
    .await;

    let usage = client_for(base_url).usage().await.unwrap();
    assert_eq!(usage["data"]["usage"], 1.25);
    assert!(server.await.unwrap().starts_with("GET /v1/auth/key"));

    let (base_url, _server) =
        serve_once(CannedResponse::json("401 Unauthorized", r#"{"error": {}}"#)).await;
    assert!(client_for(base_url).usage().await.is_none());
}

#[tokio::test]
async fn test_connection_check() {
    let (base_url, server) = serve_once(CannedResponse::json(
        "200 OK",
        r#"{"choices": [{"message": {"content": "pong"}}]}"#,
    ))
    .await;
    assert!(client_for(base_url).test_connection().await);
    assert!(server.await.unwrap().contains("Hello, this is a connection test."));

    let (base_url, _server) =
        serve_once(CannedResponse::json("503 Service Unavailable", "down")).await;
    assert!(!client_for(base_url).test_connection().await);
}
