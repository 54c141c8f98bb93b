//! Per-request monitor middleware

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::monitor::{SharedMonitor, Tags};

/// Bind a child of the root monitor into the request's [`RequestContext`]
///
/// The child is tagged with the request method, path and a fresh
/// `request_id`. An existing context (identity, deadline) is preserved.
///
/// ```rust,ignore
/// let app = router.layer(axum::middleware::from_fn_with_state(root, attach_monitor));
/// ```
pub async fn attach_monitor(
    State(root): State<SharedMonitor>,
    mut req: Request,
    next: Next,
) -> Response {
    let tags: Tags = [
        ("method", req.method().to_string()),
        ("path", req.uri().path().to_string()),
        ("request_id", Uuid::new_v4().to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let monitor = root.with_tags(&tags);
    monitor.debug("request received");

    let ctx = req
        .extensions_mut()
        .remove::<RequestContext>()
        .unwrap_or_default()
        .with_monitor(monitor);
    req.extensions_mut().insert(ctx);

    next.run(req).await
}
