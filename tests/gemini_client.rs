//! `GeminiClient` against a local one-shot HTTP server.
//!
//! The server answers a single request with a canned body and hands the raw
//! request back to the test, so the wire format can be checked end to end.

use pdf_redesign::{
    AspectRatio, GeminiClient, GeneratedImage, GenerationRequest, ImageData, RedesignClient,
    RedesignConfig, RedesignError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Serve one request; returns the base URL and a handle yielding the raw request.
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + len {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(response.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        String::from_utf8_lossy(&buf).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> GeminiClient {
    let config = RedesignConfig::builder()
        .api_key("test-key")
        .api_base_url(base_url)
        .build()
        .unwrap();
    GeminiClient::from_config(&config).unwrap()
}

fn request() -> GenerationRequest {
    GenerationRequest {
        page_index: 0,
        page_image: ImageData::new("image/jpeg", vec![0xFF, 0xD8, 0xFF]),
        prompt: "General Design Instruction: pastel".to_string(),
        reference_images: vec![ImageData::new("image/png", vec![0x89, 0x50])],
        aspect_ratio: AspectRatio::Widescreen,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_response_is_decoded_and_request_is_well_formed() {
    // "AQID" is base64 for [1, 2, 3].
    let (base, server) = serve_once(
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"Here you go"},{"inlineData":{"mimeType":"image/png","data":"AQID"}}]}}]}"#,
    )
    .await;

    let result = client(&base).redesign(&request()).await.unwrap();
    assert_eq!(
        result,
        GeneratedImage::Image(ImageData::new("image/png", vec![1, 2, 3]))
    );

    let raw = server.await.unwrap();
    let lower = raw.to_lowercase();
    assert!(
        raw.starts_with("POST /v1beta/models/gemini-3-pro-image-preview:generateContent"),
        "got: {raw}"
    );
    assert!(lower.contains("x-goog-api-key: test-key"));

    let body_start = raw.find("\r\n\r\n").unwrap() + 4;
    let body: serde_json::Value = serde_json::from_str(&raw[body_start..]).unwrap();
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    let text = parts[0]["text"].as_str().unwrap();
    assert!(text.contains("aspect ratio of 16:9"), "got: {text}");
    assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[2]["inlineData"]["mimeType"], "image/png");
    assert_eq!(
        body["generationConfig"]["responseModalities"],
        serde_json::json!(["TEXT", "IMAGE"])
    );
}

#[tokio::test]
async fn text_only_response_is_a_degraded_result() {
    let (base, server) = serve_once(
        200,
        r#"{"candidates":[{"content":{"parts":[{"text":"I can only describe this slide."}]}}]}"#,
    )
    .await;

    let result = client(&base).redesign(&request()).await.unwrap();
    assert_eq!(
        result,
        GeneratedImage::Text("I can only describe this slide.".to_string())
    );
    server.await.unwrap();
}

#[tokio::test]
async fn error_status_maps_to_remote_api_error() {
    let (base, server) = serve_once(
        429,
        r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#,
    )
    .await;

    let err = client(&base).redesign(&request()).await.unwrap_err();
    match err {
        RedesignError::RemoteApi { status, message } => {
            assert_eq!(status, 429);
            assert_eq!(message, "Resource has been exhausted");
        }
        other => panic!("expected RemoteApi, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn no_candidates_is_empty_response() {
    let (base, server) = serve_once(200, r#"{"candidates":[]}"#).await;

    let err = client(&base).redesign(&request()).await.unwrap_err();
    assert!(matches!(err, RedesignError::EmptyResponse));
    server.await.unwrap();
}
