use color_eyre::Result;
use eyre::{
    eyre,
    Context as _,
};
use std::{
    future::Future,
    pin::Pin,
    time::Duration,
};
use url::Url;

/// Status and raw body of a trackpoints request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryResponse {
    pub status: u16,
    pub body: String,
}

impl TelemetryResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Transport used by the poller to talk to the LiveTrack service.
pub trait TelemetryClient: Send + Sync {
    /// Issue a GET for `url`. Non-2xx responses are not an error here, the
    /// caller decides what to do with the status.
    fn get(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<TelemetryResponse>> + Send + '_>>;
}

/// Build `{provider}/services/session/{id}/trackpoints?requestTime={ms}`.
pub fn trackpoints_url(provider_url: &Url, session_id: &str, request_time_ms: i64) -> Result<Url> {
    let mut url = provider_url.clone();
    url.path_segments_mut()
        .map_err(|_| eyre!("provider URL {provider_url} cannot carry a path"))?
        .pop_if_empty()
        .extend(["services", "session", session_id, "trackpoints"]);
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("requestTime", &request_time_ms.to_string());
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct HttpTelemetryClient {
    client: reqwest::Client,
}

impl HttpTelemetryClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl TelemetryClient for HttpTelemetryClient {
    fn get(&self, url: Url) -> Pin<Box<dyn Future<Output = Result<TelemetryResponse>> + Send + '_>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("request to {url} failed"))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .with_context(|| format!("failed reading the response body of {url}"))?;
            Ok(TelemetryResponse { status, body })
        })
    }
}
