//! The LOAD client: content-negotiated fetch, format detection and a
//! size/count-limited streaming parse into a store batch.

use crate::config::LoadLimits;
use crate::error::EvaluationError;
use oxrdf::GraphNameRef;
use oxrdfio::{RdfFormat, RdfParser};
use quadflow_common::{HttpFetcher, HttpResponse, QuadBatch};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ACCEPT: &str =
    "text/turtle, application/n-triples, application/rdf+xml;q=0.9, */*;q=0.1";

/// Streams an RDF document from an HTTP source into a batch, enforcing the
/// configured download and triple limits.
pub(crate) struct LoadClient<'a> {
    fetcher: &'a dyn HttpFetcher,
    limits: &'a LoadLimits,
}

impl<'a> LoadClient<'a> {
    pub(crate) fn new(fetcher: &'a dyn HttpFetcher, limits: &'a LoadLimits) -> Self {
        Self { fetcher, limits }
    }

    pub(crate) fn load_into(
        &self,
        batch: &mut dyn QuadBatch,
        source_iri: &str,
        destination: GraphNameRef<'_>,
    ) -> Result<usize, EvaluationError> {
        let response = self
            .fetcher
            .fetch(source_iri, ACCEPT, self.limits.timeout)
            .map_err(EvaluationError::Network)?;
        if !(200..300).contains(&response.status) {
            return Err(EvaluationError::Network(
                format!("GET {source_iri} returned status {}", response.status).into(),
            ));
        }

        // Refuse oversized downloads before reading when the server
        // declares a length.
        if let Some(length) = response.content_length {
            if length > self.limits.max_download_bytes {
                return Err(EvaluationError::SizeLimitExceeded {
                    limit: self.limits.max_download_bytes,
                });
            }
        }

        let format = choose_format(response.content_type.as_deref(), source_iri)?;
        tracing::debug!(?format, source_iri, "loading RDF document");

        let exceeded = Arc::new(AtomicBool::new(false));
        let reader = LimitedReader {
            inner: response.body,
            remaining: self.limits.max_download_bytes,
            exceeded: Arc::clone(&exceeded),
        };

        let mut inserted = 0;
        let mut parsed: u64 = 0;
        for quad in RdfParser::from_format(format).for_reader(reader) {
            let quad = quad.map_err(|error| {
                if exceeded.load(Ordering::Relaxed) {
                    EvaluationError::SizeLimitExceeded {
                        limit: self.limits.max_download_bytes,
                    }
                } else {
                    EvaluationError::from(error)
                }
            })?;
            parsed += 1;
            if parsed > self.limits.max_triples {
                return Err(EvaluationError::TripleLimitExceeded {
                    limit: self.limits.max_triples,
                });
            }
            let quad = oxrdf::Quad::new(
                quad.subject,
                quad.predicate,
                quad.object,
                destination.into_owned(),
            );
            if batch.insert(quad.as_ref()) {
                inserted += 1;
            }
        }
        tracing::debug!(parsed, inserted, "load finished");
        Ok(inserted)
    }
}

/// Format choice: content-type header first, then the URL extension, then
/// Turtle.
fn choose_format(
    content_type: Option<&str>,
    source_iri: &str,
) -> Result<RdfFormat, EvaluationError> {
    if let Some(content_type) = content_type {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        return match media_type.as_str() {
            "text/turtle" | "application/x-turtle" => Ok(RdfFormat::Turtle),
            "application/n-triples" | "text/plain" => Ok(RdfFormat::NTriples),
            "application/rdf+xml" | "application/xml" | "text/xml" => Ok(RdfFormat::RdfXml),
            // An unusable declared type falls back to the extension.
            _ => Ok(format_from_extension(source_iri)),
        };
    }
    Ok(format_from_extension(source_iri))
}

fn format_from_extension(source_iri: &str) -> RdfFormat {
    let path = source_iri.split(['?', '#']).next().unwrap_or(source_iri);
    if path.ends_with(".nt") {
        RdfFormat::NTriples
    } else if path.ends_with(".rdf") || path.ends_with(".xml") {
        RdfFormat::RdfXml
    } else {
        RdfFormat::Turtle
    }
}

/// A reader that fails once more than the allowed number of bytes has
/// been pulled through it.
struct LimitedReader {
    inner: Box<dyn Read + Send>,
    remaining: u64,
    exceeded: Arc<AtomicBool>,
}

impl Read for LimitedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            self.exceeded.store(true, Ordering::Relaxed);
            return Err(io::Error::other("download size limit exceeded"));
        }
        let allowed = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(buf.len());
        let read = self.inner.read(&mut buf[..allowed])?;
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// The production fetcher: a blocking `reqwest` client.
pub struct ReqwestFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn fetch(
        &self,
        iri: &str,
        accept: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .get(iri)
            .header(reqwest::header::ACCEPT, accept)
            .timeout(timeout)
            .send()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let content_length = response.content_length();
        Ok(HttpResponse {
            status,
            content_type,
            content_length,
            body: Box::new(response),
        })
    }
}
