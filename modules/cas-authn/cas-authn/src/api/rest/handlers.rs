use std::sync::Arc;

use axum::extract::{Extension, Query};
use axum::http::StatusCode;
use tracing::debug;

use crate::api::rest::dto::ProxyCallbackQuery;
use crate::domain::ProxyTicketCorrelator;

/// Receive a proxy-granting ticket from the CAS server.
///
/// Always acknowledges with an empty `200 OK`; only complete callbacks are
/// stored.
#[tracing::instrument(skip_all)]
pub async fn receive_proxy_granting_ticket(
    Extension(correlator): Extension<Arc<ProxyTicketCorrelator>>,
    Query(query): Query<ProxyCallbackQuery>,
) -> StatusCode {
    match query.pair() {
        Some((iou, pgt)) => correlator.receive(iou, pgt).await,
        None => debug!("proxy callback without pgtIou/pgtId acknowledged"),
    }
    StatusCode::OK
}
