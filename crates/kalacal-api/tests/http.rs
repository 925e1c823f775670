//! Tests against a one-shot HTTP server on localhost.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use kalacal_api::http::error_detail;
use kalacal_api::{is_healthy, ApiError, ApiSettings, HttpPredictionService, PredictionService};

/// A request as seen by the fake server.
struct Captured {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serve exactly one request with the given status and body.
fn serve_once(status: u16, body: &'static str) -> (String, mpsc::Receiver<Captured>) {
    serve_raw(format!(
        "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    ))
}

/// Serve exactly one request, answering with `response` byte for byte.
fn serve_raw(response: String) -> (String, mpsc::Receiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();

        let mut headers = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((k, v)) = line.split_once(':') {
                headers.push((k.trim().to_string(), v.trim().to_string()));
            }
        }

        let length = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);
        let mut raw = vec![0u8; length];
        reader.read_exact(&mut raw).unwrap();

        let mut stream = stream;
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();

        let _ = tx.send(Captured {
            request_line: request_line.trim_end().to_string(),
            headers,
            body: String::from_utf8(raw).unwrap(),
        });
    });

    (format!("http://{addr}"), rx)
}

fn service(base_url: String) -> HttpPredictionService {
    let mut settings = ApiSettings::new(base_url);
    settings.api_key = Some("test-key".to_string());
    settings.bearer_token = Some("token-123".to_string());
    HttpPredictionService::new(settings)
}

const OK_BODY: &str = r#"{"valor_predito": 10.0, "erro_modelo": 19.8, "imagem_base64": "data:image/png;base64,UE5H", "variaveis": ["Idademeses", "edema", "peso"]}"#;

#[tokio::test]
async fn predict_posts_json_with_auth_headers() {
    let (url, rx) = serve_once(200, OK_BODY);
    let service = service(url);

    let body = serde_json::json!({"Idademeses": 240, "peso": 65.5, "edema": 1});
    let response = service.predict(body.clone()).await.unwrap();
    assert!((response.model_error - 19.8).abs() < f64::EPSILON);

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.request_line, "POST /api/xai/resultado/ HTTP/1.1");
    assert_eq!(captured.header("x-api-key"), Some("test-key"));
    assert_eq!(captured.header("authorization"), Some("Bearer token-123"));
    assert_eq!(captured.header("content-type"), Some("application/json"));
    let sent: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(sent, body);
}

#[tokio::test]
async fn health_probe_omits_bearer_token() {
    let (url, rx) = serve_once(200, r#"{"status": "ok"}"#);
    let service = service(url);

    assert!(is_healthy(&service).await);

    let captured = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(captured.request_line, "GET /api/xai/teste/ HTTP/1.1");
    assert_eq!(captured.header("x-api-key"), Some("test-key"));
    assert_eq!(captured.header("authorization"), None);
}

#[tokio::test]
async fn degraded_health_status_is_not_healthy() {
    let (url, _rx) = serve_once(200, r#"{"status": "degraded"}"#);
    assert!(!is_healthy(&service(url)).await);
}

#[tokio::test]
async fn error_status_carries_server_detail() {
    let (url, _rx) = serve_once(400, r#"{"detail": "peso ausente"}"#);
    let err = service(url).predict(serde_json::json!({})).await.unwrap_err();
    match err {
        ApiError::Status { status, detail } => {
            assert_eq!(status, 400);
            assert_eq!(detail.as_deref(), Some("peso ausente"));
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn gateway_timeout_is_a_status_error() {
    let (url, _rx) = serve_once(504, "upstream timed out");
    let err = service(url).predict(serde_json::json!({})).await.unwrap_err();
    assert_eq!(err.status(), Some(504));
}

#[tokio::test]
async fn truncated_error_body_keeps_the_status() {
    let (url, _rx) = serve_raw(
        "HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\nContent-Length: 200\r\nConnection: close\r\n\r\n{\"detail\": \"trunc"
            .to_string(),
    );
    let err = service(url).predict(serde_json::json!({})).await.unwrap_err();
    match err {
        ApiError::Status { status, detail } => {
            assert_eq!(status, 500);
            assert_eq!(detail, None);
        }
        other => panic!("expected Status, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_success_body_is_a_decode_error() {
    let (url, _rx) = serve_once(200, r#"{"unexpected": true}"#);
    let err = service(url).predict(serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(3));
    });

    let mut settings = ApiSettings::new(format!("http://{addr}"));
    settings.timeout = Duration::from_millis(300);
    let err = HttpPredictionService::new(settings)
        .predict(serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = HttpPredictionService::new(ApiSettings::new(format!("http://{addr}")))
        .predict(serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Connection(_)), "got {err:?}");
}

#[test]
fn url_joins_without_double_slashes() {
    let settings = ApiSettings::new("http://localhost:8080/");
    assert_eq!(settings.url("/api/xai/teste/"), "http://localhost:8080/api/xai/teste/");
}

#[test]
fn error_detail_prefers_detail_then_message() {
    assert_eq!(error_detail(r#"{"detail": "a", "message": "b"}"#).as_deref(), Some("a"));
    assert_eq!(error_detail(r#"{"message": "b"}"#).as_deref(), Some("b"));
    assert_eq!(error_detail("not json"), None);
}
