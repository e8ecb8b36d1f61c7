//! Ollama adapter tests against a local fake daemon.

use std::time::Duration;

use docqa_rag::{
    EmbeddingProvider, GenerationRequest, Generator, OllamaEmbeddingProvider, OllamaGenerator,
    RagError, prompt,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Read one HTTP request (headers plus `Content-Length` body) and return its body.
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(split) = text.find("\r\n\r\n") {
            let length = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse().ok())?
                })
                .unwrap_or(0usize);
            if buf.len() >= split + 4 + length {
                return String::from_utf8_lossy(&buf[split + 4..split + 4 + length]).to_string();
            }
        }
    }
    String::new()
}

/// Serve a single canned response and hand back the request body.
async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        request
    });
    (format!("http://{addr}"), handle)
}

fn request() -> GenerationRequest {
    prompt::assemble(docqa_rag::DEFAULT_GROUNDING_POLICY, &[], "What is the capital of France?")
}

#[tokio::test]
async fn generate_sends_policy_and_returns_trimmed_answer() {
    let (url, server) =
        serve_once("200 OK", r#"{"message":{"role":"assistant","content":"  Paris.\n"}}"#).await;

    let generator = OllamaGenerator::new("llama3:latest").with_base_url(&url);
    let answer = generator.generate(&request()).await.unwrap();
    assert_eq!(answer, "Paris.");

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["model"], "llama3:latest");
    assert_eq!(sent["stream"], false);
    assert_eq!(sent["messages"][0]["role"], "system");
    assert_eq!(sent["messages"][0]["content"], docqa_rag::DEFAULT_GROUNDING_POLICY);
    assert!(sent["messages"][1]["content"].as_str().unwrap().contains("Query: What is the capital"));
}

#[tokio::test]
async fn unreachable_daemon_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let generator = OllamaGenerator::new("llama3:latest").with_base_url(format!("http://{addr}"));
    let err = generator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationUnavailable { .. }), "got {err:?}");
}

#[tokio::test]
async fn silent_daemon_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let generator = OllamaGenerator::new("llama3:latest")
        .with_base_url(format!("http://{addr}"))
        .with_timeout(Duration::from_millis(200));
    let err = generator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, RagError::GenerationTimeout { timeout } if timeout == Duration::from_millis(200)));
    server.abort();
}

#[tokio::test]
async fn server_error_is_a_generation_error() {
    let (url, _server) = serve_once("500 Internal Server Error", r#"{"error":"model not found"}"#).await;

    let generator = OllamaGenerator::new("missing").with_base_url(&url);
    let err = generator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, RagError::Generation { message, .. } if message.contains("model not found")));
}

#[tokio::test]
async fn embed_batch_returns_vectors_in_order() {
    let (url, server) = serve_once("200 OK", r#"{"embeddings":[[1.0,0.0],[0.0,1.0]]}"#).await;

    let provider = OllamaEmbeddingProvider::new("all-minilm").with_base_url(&url).with_dimensions(2);
    let vectors = provider.embed_batch(&["a", "b"]).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    assert_eq!(provider.dimensions(), 2);

    let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(sent["input"], serde_json::json!(["a", "b"]));
}

#[tokio::test]
async fn embed_count_mismatch_is_an_embedding_error() {
    let (url, _server) = serve_once("200 OK", r#"{"embeddings":[[1.0,0.0]]}"#).await;

    let provider = OllamaEmbeddingProvider::new("all-minilm").with_base_url(&url);
    let err = provider.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingError { .. }));
}
