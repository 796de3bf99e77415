// REST client for the capture-decoding backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::model::{
    FlowRecord, PacketDetail, PacketPage, StatsPayload, UnansweredRequest, UploadResult,
};
use crate::query::PacketQuery;

/// Everything the client needs from the server. Every read is scoped by a
/// session key; an empty key is passed through as-is.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<UploadResult, ClientError>;

    async fn packets(&self, query: &PacketQuery) -> Result<PacketPage, ClientError>;

    async fn packet(&self, frame_num: u64, session: &str) -> Result<PacketDetail, ClientError>;

    async fn flows(&self, session: &str) -> Result<Vec<FlowRecord>, ClientError>;

    async fn unanswered(&self, session: &str) -> Result<Vec<UnansweredRequest>, ClientError>;

    async fn stats(&self, session: &str) -> Result<StatsPayload, ClientError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        debug!("Backend client configured for {}", config.base_url);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let err = ClientError::from_response(status.as_u16(), &body);
            warn!("Backend returned {}: {}", status, err);
            return Err(err);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ClientError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn get_session<T: DeserializeOwned>(
        &self,
        path: &str,
        session: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}?session={}", self.url(path), urlencoding::encode(session));
        self.get(&url).await
    }
}

#[async_trait]
impl CaptureBackend for HttpBackend {
    async fn upload(&self, filename: &str, data: Vec<u8>) -> Result<UploadResult, ClientError> {
        let size = data.len();
        let part = reqwest::multipart::Part::bytes(data).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!("POST /api/upload ({} bytes, {})", size, filename);
        let response = self
            .client
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn packets(&self, query: &PacketQuery) -> Result<PacketPage, ClientError> {
        let url = format!("{}?{}", self.url("/api/packets"), query.to_query_string());
        self.get(&url).await
    }

    async fn packet(&self, frame_num: u64, session: &str) -> Result<PacketDetail, ClientError> {
        self.get_session(&format!("/api/packet/{}", frame_num), session)
            .await
    }

    async fn flows(&self, session: &str) -> Result<Vec<FlowRecord>, ClientError> {
        // The backend sends null rather than [] for an empty capture
        let flows: Option<Vec<FlowRecord>> = self.get_session("/api/flows", session).await?;
        Ok(flows.unwrap_or_default())
    }

    async fn unanswered(&self, session: &str) -> Result<Vec<UnansweredRequest>, ClientError> {
        let requests: Option<Vec<UnansweredRequest>> =
            self.get_session("/api/unanswered", session).await?;
        Ok(requests.unwrap_or_default())
    }

    async fn stats(&self, session: &str) -> Result<StatsPayload, ClientError> {
        self.get_session("/api/stats", session).await
    }
}
