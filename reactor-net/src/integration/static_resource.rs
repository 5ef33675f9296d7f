//! Static resource handler (§4.C12): resolves a request path against a
//! configured base directory, rejecting traversal and falling back to
//! `index.html` for directory requests.

use crate::error::{Error, Result};
use crate::exchange::{BodyProducer, Exchange, Handler};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct StaticResourceHandler {
    base: PathBuf,
    mount_prefix: String,
}

impl StaticResourceHandler {
    pub fn new(base: impl Into<PathBuf>, mount_prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            mount_prefix: mount_prefix.into(),
        }
    }

    /// Resolves `request_path` (already normalized by [`crate::exchange::Request`])
    /// to a file under `base`, rejecting absolute or dot-prefixed components
    /// after percent-decoding each segment (§4.C12, S4).
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf> {
        let relative = request_path
            .strip_prefix(&self.mount_prefix)
            .unwrap_or(request_path);
        let trailing_slash = relative.is_empty() || relative.ends_with('/');
        let relative = relative.trim_matches('/');

        let mut resolved = self.base.clone();
        if !relative.is_empty() {
            for raw_segment in relative.split('/') {
                let decoded = percent_encoding::percent_decode_str(raw_segment)
                    .decode_utf8()
                    .map_err(|_| Error::not_found("malformed percent-encoding in path segment"))?;
                if decoded.is_empty()
                    || decoded == "."
                    || decoded == ".."
                    || decoded.contains('/')
                    || decoded.starts_with('\\')
                {
                    return Err(Error::not_found(format!(
                        "rejected path segment: {decoded}"
                    )));
                }
                resolved.push(decoded.as_ref());
            }
        }
        if trailing_slash {
            resolved.push("index.html");
        }
        Ok(resolved)
    }

    /// Resolves and checks existence against the real filesystem.
    pub async fn serve(&self, request_path: &str) -> Result<PathBuf> {
        let mut target = self.resolve(request_path)?;
        if is_dir(&target).await {
            target.push("index.html");
        }
        if !exists(&target).await {
            return Err(Error::not_found(format!("{} not found", target.display())));
        }
        Ok(target)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[async_trait]
impl Handler for StaticResourceHandler {
    async fn handle(&self, mut exchange: Exchange) -> Result<Exchange> {
        let target = self.serve(&exchange.request.normalized_path).await?;
        exchange.response.commit(BodyProducer::Resource(target))?;
        exchange.complete();
        Ok(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_percent_encoded_traversal() {
        let handler = StaticResourceHandler::new("/srv/www", "/foo");
        let err = handler.resolve("/foo/%2E%2E/bar").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn trailing_slash_resolves_to_index_html() {
        let handler = StaticResourceHandler::new("/srv/www", "/foo");
        let resolved = handler.resolve("/foo/").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/www/index.html"));
    }

    #[test]
    fn plain_path_resolves_under_base() {
        let handler = StaticResourceHandler::new("/srv/www", "/foo");
        let resolved = handler.resolve("/foo/css/site.css").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/www/css/site.css"));
    }

    #[tokio::test]
    async fn missing_resource_is_not_found() {
        let handler = StaticResourceHandler::new("/nonexistent-base", "/foo");
        let err = handler.serve("/foo/missing.txt").await.unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }
}
