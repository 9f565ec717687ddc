#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use base64::Engine;
use base64::engine::general_purpose;
use image::{DynamicImage, ImageFormat, RgbImage};
use scalpscan::gateway::{GatewayClient, GatewayConfig, RetryPolicy};
use scalpscan::payload::ImagePayload;
use serde_json::{Value, json};
use url::Url;

/// A request the fake upstream received.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Shared {
    responses: Mutex<VecDeque<(StatusCode, Value)>>,
    requests: Mutex<Vec<Recorded>>,
}

/// Scripted stand-in for the hosted model. Responses are served in order and
/// the last one repeats forever.
pub struct FakeUpstream {
    pub base: Url,
    shared: Arc<Shared>,
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    shared.requests.lock().unwrap().push(Recorded {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });
    let mut queue = shared.responses.lock().unwrap();
    let next = if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    };
    let (status, body) = next.unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({})));
    (status, Json(body))
}

impl FakeUpstream {
    pub async fn start(responses: Vec<(StatusCode, Value)>) -> Self {
        let shared = Arc::new(Shared {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(handle).with_state(shared.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake upstream");
        });
        let base = Url::parse(&format!("http://{addr}/v1beta")).expect("fake base url");
        Self { base, shared }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.shared.requests.lock().unwrap().len()
    }

    pub fn client(&self) -> GatewayClient {
        let mut config = GatewayConfig::new(Some("test-key".to_string()), self.base.clone());
        config.retry = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(5),
        };
        GatewayClient::new(config).expect("gateway client")
    }
}

pub fn ok(body: Value) -> (StatusCode, Value) {
    (StatusCode::OK, body)
}

pub fn quota() -> (StatusCode, Value) {
    (
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}),
    )
}

pub fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

pub fn assessment_json() -> String {
    json!({
        "norwoodScale": 3,
        "totalGrafts": 2400,
        "distribution": [
            {"zone": "Frontal hairline", "count": 1400},
            {"zone": "Mid-scalp", "count": 1000}
        ],
        "estimatedCostMin": 2000,
        "estimatedCostMax": 3200,
        "summary": "Temple recession with a stable crown."
    })
    .to_string()
}

pub fn image_response(mime_type: &str, data: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [
                {"text": "Here is the edited photo."},
                {"inlineData": {"mimeType": mime_type, "data": data}}
            ]},
            "finishReason": "STOP"
        }]
    })
}

pub fn finish_only(reason: &str) -> Value {
    json!({
        "candidates": [{
            "content": {"parts": [{"text": "I can't help with that."}]},
            "finishReason": reason
        }]
    })
}

/// A PNG of the given size.
pub fn png(width: u32, height: u32) -> ImagePayload {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    ImagePayload::new("image/png", out.into_inner())
}

pub fn decode_inline(body: &Value) -> (String, DynamicImage) {
    let inline = &body["contents"][0]["parts"][0]["inlineData"];
    let mime = inline["mimeType"].as_str().expect("mime type").to_string();
    let bytes = general_purpose::STANDARD
        .decode(inline["data"].as_str().expect("inline data"))
        .expect("base64");
    (mime, image::load_from_memory(&bytes).expect("decodable upload"))
}
