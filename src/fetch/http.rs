//! Blocking HTTP tile fetcher for WebScope servers.
//!
//! WebScope addresses tiles with a single query string of `+`-separated
//! numbers appended to the slide path:
//!
//! ```text
//! {base}{title}.svs?{xoff}+{yoff}+{width}+{height}+{zoom}+{quality}
//! ```
//!
//! Width and height are always equal (tiles are square). The client is fully
//! blocking; the stitch loop is sequential by design and fetches exactly one
//! tile at a time.

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::FetchError;
use crate::geometry::TileRequest;

use super::TileFetcher;

/// HTTP fetch collaborator for a WebScope tile server.
#[derive(Debug)]
pub struct HttpTileFetcher {
    client: reqwest::blocking::Client,
    base: String,
}

impl HttpTileFetcher {
    /// Create a fetcher for the given endpoint base URL.
    ///
    /// The base is validated up front so that a typo fails the run before
    /// any tile is requested. Timeouts follow reqwest's defaults; configure
    /// the environment (proxy, TLS) externally if needed.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        Url::parse(base_url).map_err(|e| FetchError::InvalidEndpoint {
            url: base_url.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            base: base_url.to_string(),
        })
    }

    /// The request URL for one tile.
    pub fn tile_url(&self, request: &TileRequest) -> String {
        format!(
            "{}{}.svs?{}+{}+{}+{}+{}+{}",
            self.base,
            request.title,
            request.src_xoff,
            request.src_yoff,
            request.tile_side,
            request.tile_side,
            request.zoom,
            request.quality
        )
    }
}

impl TileFetcher for HttpTileFetcher {
    fn fetch(&self, request: &TileRequest) -> Result<Bytes, FetchError> {
        let url = self.tile_url(request);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .bytes()
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
