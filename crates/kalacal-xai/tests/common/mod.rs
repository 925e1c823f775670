//! Scripted stand-in for the prediction service.

use std::collections::VecDeque;
use std::sync::Mutex;

use kalacal_api::{ApiError, BoxFuture, ChartImage, HealthResponse, PredictResponse, PredictionService};
use tokio::sync::oneshot;

struct Reply {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<PredictResponse, ApiError>,
}

#[derive(Default)]
pub struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, result: Result<PredictResponse, ApiError>) {
        self.replies.lock().unwrap().push_back(Reply { gate: None, result });
    }

    /// Queue a reply that is only delivered once the returned sender fires.
    pub fn gated_reply(&self, result: Result<PredictResponse, ApiError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back(Reply {
            gate: Some(rx),
            result,
        });
        tx
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }
}

impl PredictionService for ScriptedService {
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, ApiError>> {
        Box::pin(async {
            Ok(HealthResponse {
                status: "ok".to_string(),
            })
        })
    }

    fn predict(&self, body: serde_json::Value) -> BoxFuture<'_, Result<PredictResponse, ApiError>> {
        self.bodies.lock().unwrap().push(body);
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            let Some(reply) = reply else {
                return Err(ApiError::Internal("no scripted reply".to_string()));
            };
            if let Some(gate) = reply.gate {
                let _ = gate.await;
            }
            reply.result
        })
    }
}

pub fn prediction(value: f64) -> PredictResponse {
    PredictResponse {
        predicted_value: value,
        model_error: 16.7,
        chart: ChartImage::new("data:image/png;base64,UE5H"),
        variables: vec!["Idademeses".to_string(), "edema".to_string(), "peso".to_string()],
        approach: Some("auto".to_string()),
        total_features: Some(3),
    }
}

pub fn status(code: u16) -> ApiError {
    ApiError::Status {
        status: code,
        detail: None,
    }
}
