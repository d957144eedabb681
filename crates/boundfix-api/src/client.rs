// Boundary service HTTP client
//
// Wraps `reqwest::Client` with `/api/` URL construction, status checking
// and JSON decoding. No retries: every failure is returned to the caller,
// which decides how to react.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    CoordinatePoint, CoordinateResponse, FeatureId, StatusResponse, TopologyResponse,
};

/// Body previews in errors are cut to this many characters.
const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for the boundary service.
///
/// Every endpoint lives under `{base_url}/api/`. The base URL may carry a
/// path prefix when the service is mounted below the site root.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(http, base_url)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Result<Self, Error> {
        if base_url.cannot_be_a_base() {
            return Err(Error::CannotBeABase(base_url.to_string()));
        }
        Ok(Self { http, base_url })
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{segments...}`, percent-encoding each segment.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::CannotBeABase(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    // ── Generic request ──────────────────────────────────────────────

    /// Issue `method` against `/api/{path}` and decode the JSON answer.
    ///
    /// `path` is split on `/` and each raw segment is percent-encoded, so it
    /// must not be encoded already. Use [`request_segments`](Self::request_segments)
    /// when a segment itself contains `/`.
    ///
    /// An empty success body decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.request_segments(method, &segments, body).await
    }

    /// Issue `method` against `/api/{segments...}`, encoding each raw segment.
    pub async fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = self.endpoint(segments)?;
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(Error::Transport)?;

        parse_json(resp).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;

        parse_json(resp).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        parse_json(resp).await
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/status`
    pub async fn status(&self) -> Result<StatusResponse, Error> {
        let url = self.endpoint(&["status"])?;
        self.get(url).await
    }

    /// `GET /api/coordinate` — `None` when no work item remains.
    pub async fn coordinate(&self) -> Result<Option<CoordinateResponse>, Error> {
        let url = self.endpoint(&["coordinate"])?;
        self.get(url).await
    }

    /// `GET /api/topo/{layer}/{id}`
    pub async fn topology(&self, layer: &str, id: FeatureId) -> Result<TopologyResponse, Error> {
        let id = id.to_string();
        let url = self.endpoint(&["topo", layer, &id])?;
        self.get(url).await
    }

    /// `POST /api/add` with a `{layer: featureId}` selection.
    pub async fn add(&self, selection: &BTreeMap<String, FeatureId>) -> Result<(), Error> {
        let url = self.endpoint(&["add"])?;
        let _: IgnoredAny = self.post(url, selection).await?;
        Ok(())
    }

    /// `POST /api/delete` with the coordinate to drop from the work queue.
    pub async fn delete(&self, point: &CoordinatePoint) -> Result<(), Error> {
        let url = self.endpoint(&["delete"])?;
        let _: IgnoredAny = self.post(url, point).await?;
        Ok(())
    }

    /// `POST /api/missing` with new coordinates to resolve.
    pub async fn import_missing(&self, points: &[CoordinatePoint]) -> Result<(), Error> {
        let url = self.endpoint(&["missing"])?;
        let _: IgnoredAny = self.post(url, &points).await?;
        Ok(())
    }

    /// `POST /api/export` — starts a background export on the service.
    pub async fn export(&self) -> Result<(), Error> {
        let url = self.endpoint(&["export"])?;
        debug!("POST {}", url);

        let resp = self.http.post(url).send().await.map_err(Error::Transport)?;
        let _: IgnoredAny = parse_json(resp).await?;
        Ok(())
    }
}

/// Check the status, then decode the body as JSON.
async fn parse_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let status = resp.status();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(Error::Http {
            status: status.as_u16(),
            body: preview(&body),
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    let text = if body.trim().is_empty() { "null" } else { body.as_str() };

    serde_json::from_str(text).map_err(|e| Error::Deserialization {
        message: format!("{e} (body preview: {:?})", preview(&body)),
        body: body.clone(),
    })
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
