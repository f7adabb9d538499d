use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::ai::{parse_json_reply, prompts};
use crate::api::invoices::parse_invoice_id;
use crate::error::{AppError, AppResult};
use crate::extractors::JsonBody;
use crate::middleware::CurrentUser;
use crate::models::DashboardStats;
use crate::routes::{Access, RouteTable};
use crate::state::AppState;

const RECENT_INVOICES_IN_PROMPT: usize = 10;
const EMPTY_DASHBOARD_INSIGHT: &str =
    "No invoices yet. Create your first invoice to start seeing insights.";

pub fn route_table() -> RouteTable {
    RouteTable::new("/api/ai")
        .post("/generate-invoice", Access::Protected, generate_invoice)
        .post("/generate-reminder", Access::Protected, generate_reminder)
        .get("/dashboard-summary", Access::Protected, dashboard_summary)
}

// ============================================================================
// REQUEST/RESPONSE STRUCTS
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateInvoiceRequest {
    #[validate(length(min = 1, max = 5000, message = "Text is required (max 5000 characters)"))]
    pub text: String,
}

/// Invoice draft extracted from free text; the client decides whether to save it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInvoice {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: Decimal,
    #[serde(default)]
    pub unit_price: Decimal,
}

fn default_quantity() -> Decimal {
    Decimal::ONE
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReminderRequest {
    #[validate(length(min = 1, message = "invoiceId is required"))]
    pub invoice_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderResponse {
    pub reminder_text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    pub insights: Vec<String>,
}

/// Models answer either with a bare array or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum InsightsReply {
    List(Vec<String>),
    Wrapped { insights: Vec<String> },
}

impl InsightsReply {
    fn into_insights(self) -> Vec<String> {
        let list = match self {
            InsightsReply::List(list) => list,
            InsightsReply::Wrapped { insights } => insights,
        };
        list.into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/ai/generate-invoice
pub async fn generate_invoice(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    JsonBody(req): JsonBody<GenerateInvoiceRequest>,
) -> AppResult<Json<ParsedInvoice>> {
    let request_id = Uuid::new_v4();
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::validation("text: Text is required"));
    }

    debug!(
        request_id = %request_id,
        user_id = %current_user.id,
        text_length = text.len(),
        "📝 Parsing invoice from text"
    );

    let parsed: ParsedInvoice = state.ai.complete_json(&prompts::parse_invoice(text)).await?;

    info!(
        request_id = %request_id,
        user_id = %current_user.id,
        items = parsed.items.len(),
        "🤖 Invoice draft generated"
    );

    Ok(Json(parsed))
}

/// POST /api/ai/generate-reminder
pub async fn generate_reminder(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
    JsonBody(req): JsonBody<GenerateReminderRequest>,
) -> AppResult<Json<ReminderResponse>> {
    let invoice_id = parse_invoice_id(req.invoice_id.trim())?;
    let invoice = state
        .invoices
        .find_for_user(current_user.id, invoice_id)
        .await?
        .ok_or_else(|| AppError::not_found("Invoice"))?;

    let sender = match state.users.find_by_id(current_user.id).await? {
        Some(user) => user.business_name.unwrap_or(user.name),
        None => current_user.name.clone(),
    };

    let completion = state
        .ai
        .complete(&prompts::payment_reminder(&invoice, &sender))
        .await?;

    info!(
        user_id = %current_user.id,
        invoice_id = %invoice.id,
        total_tokens = completion.usage.total_tokens,
        "✉️ Reminder generated"
    );

    Ok(Json(ReminderResponse {
        reminder_text: completion.content,
    }))
}

/// GET /api/ai/dashboard-summary
pub async fn dashboard_summary(
    State(state): State<Arc<AppState>>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardSummary>> {
    let invoices = state.invoices.list_for_user(current_user.id).await?;
    let stats = DashboardStats::from_invoices(&invoices);

    if invoices.is_empty() {
        return Ok(Json(DashboardSummary {
            stats,
            insights: vec![EMPTY_DASHBOARD_INSIGHT.to_string()],
        }));
    }

    let recent = &invoices[..invoices.len().min(RECENT_INVOICES_IN_PROMPT)];
    let completion = state
        .ai
        .complete(&prompts::dashboard_insights(&stats, recent))
        .await?;
    let insights = parse_json_reply::<InsightsReply>(&completion.content)?.into_insights();

    info!(
        user_id = %current_user.id,
        invoices = stats.total_invoices,
        insights = insights.len(),
        "📊 Dashboard summary generated"
    );

    Ok(Json(DashboardSummary { stats, insights }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insights_accept_both_shapes() {
        let bare: InsightsReply = serde_json::from_str(r#"["a", " b ", ""]"#).unwrap();
        assert_eq!(bare.into_insights(), vec!["a", "b"]);

        let wrapped: InsightsReply = serde_json::from_str(r#"{"insights": ["c"]}"#).unwrap();
        assert_eq!(wrapped.into_insights(), vec!["c"]);
    }

    #[test]
    fn test_parsed_invoice_tolerates_nulls() {
        let parsed: ParsedInvoice = serde_json::from_str(
            r#"{"clientName":"Acme","email":null,"items":[{"name":"Design","unitPrice":120}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.client_name.as_deref(), Some("Acme"));
        assert!(parsed.email.is_none());
        assert!(parsed.address.is_none());
        assert_eq!(parsed.items[0].quantity, Decimal::ONE);
        assert_eq!(parsed.items[0].unit_price, Decimal::from(120));
    }
}
