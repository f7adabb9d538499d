use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::middleware::CurrentUser;
use crate::models::{CreateInvoiceRequest, Invoice, MessageResponse, UpdateInvoiceRequest};
use crate::routes::{Access, RouteTable};
use crate::state::AppState;

pub fn route_table() -> RouteTable {
    RouteTable::new("/api/invoices")
        .post("/", Access::Protected, create_invoice)
        .get("/", Access::Protected, list_invoices)
        .get("/:id", Access::Protected, get_invoice)
        .put("/:id", Access::Protected, update_invoice)
        .delete("/:id", Access::Protected, delete_invoice)
}

/// A malformed id can't match any invoice, so it is reported as missing.
pub(crate) fn parse_invoice_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found("Invoice"))
}

/// POST /api/invoices
pub async fn create_invoice(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    JsonBody(req): JsonBody<CreateInvoiceRequest>,
) -> AppResult<(StatusCode, Json<Invoice>)> {
    let invoice = Invoice::from_request(current_user.id, req)?;
    state.invoices.insert(&invoice).await?;

    info!(
        user_id = %current_user.id,
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        "🧾 Invoice created"
    );

    Ok((StatusCode::CREATED, Json(invoice)))
}

/// GET /api/invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Invoice>>> {
    let invoices = state.invoices.list_for_user(current_user.id).await?;
    debug!(user_id = %current_user.id, count = invoices.len(), "Listed invoices");
    Ok(Json(invoices))
}

/// GET /api/invoices/:id
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Invoice>> {
    let id = parse_invoice_id(&id)?;
    let invoice = state
        .invoices
        .find_for_user(current_user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))?;

    Ok(Json(invoice))
}

/// PUT /api/invoices/:id
pub async fn update_invoice(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateInvoiceRequest>,
) -> AppResult<Json<Invoice>> {
    let id = parse_invoice_id(&id)?;
    let mut invoice = state
        .invoices
        .find_for_user(current_user.id, id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))?;

    invoice.apply_update(req)?;

    if !state.invoices.update(&invoice).await? {
        return Err(AppError::not_found("Invoice"));
    }

    info!(user_id = %current_user.id, invoice_id = %invoice.id, "✏️ Invoice updated");

    Ok(Json(invoice))
}

/// DELETE /api/invoices/:id
pub async fn delete_invoice(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = parse_invoice_id(&id)?;

    if !state.invoices.delete_for_user(current_user.id, id).await? {
        return Err(AppError::not_found("Invoice"));
    }

    info!(user_id = %current_user.id, invoice_id = %id, "🗑️ Invoice deleted");

    Ok(Json(MessageResponse {
        message: "Invoice deleted".to_string(),
    }))
}
