use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use invoicer_core::OperationContext;
use invoicer_infra::RequestId;
use std::convert::Infallible;

/// Operation context for the current request, keyed by its `X-Request-ID`.
#[derive(Debug, Clone)]
pub struct RequestContext(pub OperationContext);

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<RequestId>()
            .map(|id| OperationContext::from_request_id(id.0.clone()))
            .unwrap_or_default();
        Ok(RequestContext(ctx))
    }
}
