use std::error::Error;
use std::io::Read;
use std::time::Duration;

/// A fetched HTTP response, body unread.
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

/// The HTTP seam used by `LOAD`.
///
/// Production wires a blocking `reqwest` client behind this; tests hand the
/// engine canned responses.
pub trait HttpFetcher: Send + Sync {
    /// Issues a GET for `iri` with the given `Accept` header.
    fn fetch(
        &self,
        iri: &str,
        accept: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, Box<dyn Error + Send + Sync>>;
}
