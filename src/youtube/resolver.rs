// Stream resolution: track reference -> playable audio URL
// The trait is what the playback session depends on; CachedResolver wraps any
// resolver and remembers recent answers so replaying a queue does not shell
// out to yt-dlp again.

use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;

use crate::error::ResolveError;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub url: String,
    // Seconds, when the resolver knows it
    pub duration: Option<f64>,
    pub title: Option<String>,
}

impl ResolvedStream {
    pub fn new(url: impl Into<String>) -> Self {
        ResolvedStream {
            url: url.into(),
            duration: None,
            title: None,
        }
    }
}

#[async_trait(?Send)]
pub trait StreamResolver {
    async fn resolve(&mut self, reference: &str) -> Result<ResolvedStream, ResolveError>;

    // Drop anything remembered about `reference`. Called when the engine
    // could not play a stream this resolver returned.
    async fn invalidate(&mut self, _reference: &str) {}
}

// ==========================================
// CACHED RESOLVER
// ==========================================
// Memo of successful lookups, bounded two ways:
// - max_capacity: at most this many references are kept
// - time_to_live: entries expire, since signed stream URLs stop working
//   after a while
//
// Failures are never cached, so a track that failed once is tried again
// the next time it comes up.
pub struct CachedResolver<R> {
    inner: R,
    entries: Cache<String, ResolvedStream>,
}

impl<R: StreamResolver> CachedResolver<R> {
    pub fn new(inner: R, capacity: u64, time_to_live: Duration) -> Self {
        CachedResolver {
            inner,
            entries: Cache::builder()
                .max_capacity(capacity.max(1))
                .time_to_live(time_to_live)
                .build(),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait(?Send)]
impl<R: StreamResolver> StreamResolver for CachedResolver<R> {
    async fn resolve(&mut self, reference: &str) -> Result<ResolvedStream, ResolveError> {
        if let Some(hit) = self.entries.get(reference).await {
            tracing::debug!(reference, "stream cache hit");
            return Ok(hit);
        }

        let stream = self.inner.resolve(reference).await?;
        self.entries
            .insert(reference.to_string(), stream.clone())
            .await;
        Ok(stream)
    }

    async fn invalidate(&mut self, reference: &str) {
        tracing::debug!(reference, "dropping cached stream");
        self.entries.invalidate(reference).await;
        self.inner.invalidate(reference).await;
    }
}
