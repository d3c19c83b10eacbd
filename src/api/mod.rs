//! Client side of the Color Link game service.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
pub use types::*;

/// Endpoints the controller relies on. Implemented over HTTP in production and
/// by in-memory fakes in tests.
#[async_trait]
pub trait GameApi: Send + Sync + 'static {
    async fn new_game(&self, req: NewGameRequest) -> Result<NewGameResponse, ApiError>;
    async fn make_move(&self, req: MoveRequest) -> Result<MoveResponse, ApiError>;
    async fn ai_move(&self, query: AiMoveQuery) -> Result<AiMoveResponse, ApiError>;
    async fn start_training(&self, req: StartTrainingRequest) -> Result<Ack, ApiError>;
    async fn training_status(&self) -> Result<TrainingStatus, ApiError>;
    async fn stop_training(&self) -> Result<Ack, ApiError>;
    async fn save_model(&self) -> Result<Ack, ApiError>;
}

/// reqwest-backed [`GameApi`].
#[derive(Debug, Clone)]
pub struct HttpGameApi {
    client: Client,
    base: Url,
}

impl HttpGameApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|_| ApiError::BadUrl(base_url.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|_| ApiError::BadUrl(format!("{}{path}", self.base)))
    }

    async fn post<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        decode(request.send().await?).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        decode(self.client.get(url).query(query).send().await?).await
    }
}

/// The service reports failures as `{"error": "..."}` bodies, often alongside a
/// 4xx/5xx status. Those take precedence over the status code.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    decode_body(status.as_u16(), &bytes)
}

pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, bytes: &[u8]) -> Result<T, ApiError> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(_) if !(200..300).contains(&status) => return Err(ApiError::Status { status }),
        Err(e) => return Err(ApiError::Decode(e)),
    };
    if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
        return Err(ApiError::Server(message.to_string()));
    }
    if !(200..300).contains(&status) {
        return Err(ApiError::Status { status });
    }
    Ok(serde_json::from_value(value)?)
}

fn flag(value: bool) -> String {
    value.to_string()
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn new_game(&self, req: NewGameRequest) -> Result<NewGameResponse, ApiError> {
        self.post("api/new_game", Some(&req)).await
    }

    async fn make_move(&self, req: MoveRequest) -> Result<MoveResponse, ApiError> {
        self.post("api/make_move", Some(&req)).await
    }

    async fn ai_move(&self, query: AiMoveQuery) -> Result<AiMoveResponse, ApiError> {
        self.get(
            "api/ai_move",
            &[
                ("debugMode", flag(query.debug_mode)),
                ("evaluationMode", flag(query.evaluation_mode)),
            ],
        )
        .await
    }

    async fn start_training(&self, req: StartTrainingRequest) -> Result<Ack, ApiError> {
        self.post("api/start_training", Some(&req)).await
    }

    async fn training_status(&self) -> Result<TrainingStatus, ApiError> {
        self.get("api/training_status", &[]).await
    }

    async fn stop_training(&self) -> Result<Ack, ApiError> {
        self.post::<(), _>("api/stop_training", None).await
    }

    async fn save_model(&self) -> Result<Ack, ApiError> {
        self.post::<(), _>("api/save_model", None).await
    }
}
