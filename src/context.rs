use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::Extensions;
use once_cell::sync::OnceCell;
use std::convert::Infallible;
use std::sync::Arc;

/// Request-scoped values computed by middleware for downstream consumers.
///
/// The bag is stored in the request extensions under its own type and is
/// shared by handle, so a layer that runs before the one filling it in (the
/// access logger) still sees the value after the inner chain returns. Slots are
/// private fields, which keeps them out of reach of unrelated extension users.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    inner: Arc<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    os: OnceCell<String>,
}

impl RequestContext {
    /// Return the bag attached to these extensions, attaching a fresh one first if needed
    pub fn attach(extensions: &mut Extensions) -> Self {
        if let Some(existing) = extensions.get::<RequestContext>() {
            return existing.clone();
        }
        let context = RequestContext::default();
        extensions.insert(context.clone());
        context
    }

    /// Bag attached to these extensions, or an empty one
    pub fn from_extensions(extensions: &Extensions) -> Self {
        extensions.get::<RequestContext>().cloned().unwrap_or_default()
    }

    /// Record the client OS. The first value written for a request wins.
    pub fn set_os(&self, os: impl Into<String>) {
        let _ = self.inner.os.set(os.into());
    }

    /// Client OS, or an empty string when nothing recorded it
    pub fn os(&self) -> &str {
        self.inner.os.get().map(String::as_str).unwrap_or("")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_extensions(&parts.extensions))
    }
}
