use std::future::Future;
use std::pin::Pin;

use plotmap_shared::{MapInfo, MapRange, MapRangeRequest, parse_map_range_payload};

use crate::error::{FetchError, body_preview};

pub const DEFAULT_MAP_RANGE_URL: &str = "https://api.ticktom.com/api/map_range/";

pub type FetchFuture = Pin<Box<dyn Future<Output = Result<MapRange, FetchError>>>>;

/// Where chunk payloads come from.
///
/// The returned future must own everything it needs; the cache drives it on
/// the host's single-threaded executor.
pub trait ChunkSource {
    fn fetch(&self, map_info: MapInfo) -> FetchFuture;
}

/// Session token handed over by the host. Forwarded as `init_data`, never
/// inspected.
#[derive(Clone)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// `map_range` over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpChunkSource {
    client: reqwest::Client,
    url: String,
    token: SessionToken,
}

impl HttpChunkSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, token: SessionToken) -> Self {
        Self {
            client,
            url: url.into(),
            token,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ChunkSource for HttpChunkSource {
    fn fetch(&self, map_info: MapInfo) -> FetchFuture {
        let client = self.client.clone();
        let url = self.url.clone();
        let body = MapRangeRequest {
            init_data: self.token.expose().to_string(),
            map_info,
        };
        Box::pin(async move { fetch_map_range(&client, &url, &body).await })
    }
}

async fn fetch_map_range(
    client: &reqwest::Client,
    url: &str,
    body: &MapRangeRequest,
) -> Result<MapRange, FetchError> {
    let resp = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| FetchError::Request(e.to_string()))?;
    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| FetchError::Request(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            preview: body_preview(&bytes),
        });
    }

    parse_map_range_payload(&bytes).map_err(|e| FetchError::Decode {
        message: e.to_string(),
        preview: body_preview(&bytes),
    })
}
