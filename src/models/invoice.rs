use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

// ============================================================================
// INVOICE MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Paid,
    #[default]
    Unpaid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Unpaid => "Unpaid",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Paid" => Some(InvoiceStatus::Paid),
            "Unpaid" => Some(InvoiceStatus::Unpaid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[validate(length(min = 1, max = 200, message = "Item name is required"))]
    pub name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_percent: Decimal,
}

/// Largest value a `NUMERIC(14,2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

fn overflow(field: &str) -> AppError {
    AppError::validation(format!("{} is too large (max {})", field, MAX_AMOUNT))
}

impl LineItem {
    pub fn net(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }

    pub fn tax(&self) -> Option<Decimal> {
        self.net()?
            .checked_mul(self.tax_percent)?
            .checked_div(Decimal::ONE_HUNDRED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub total: Decimal,
}

/// Sums the items; anything past `MAX_AMOUNT` is a validation error, not a panic.
pub fn compute_totals(items: &[LineItem]) -> AppResult<Totals> {
    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    for item in items {
        subtotal = item
            .net()
            .and_then(|net| subtotal.checked_add(net))
            .ok_or_else(|| overflow("subtotal"))?;
        tax_total = item
            .tax()
            .and_then(|tax| tax_total.checked_add(tax))
            .ok_or_else(|| overflow("taxTotal"))?;
    }

    let total = subtotal
        .checked_add(tax_total)
        .ok_or_else(|| overflow("amount"))?
        .round_dp(2);
    if total > MAX_AMOUNT {
        return Err(overflow("amount"));
    }

    Ok(Totals {
        subtotal: subtotal.round_dp(2),
        tax_total: tax_total.round_dp(2),
        total,
    })
}

fn check_amount(amount: Decimal) -> AppResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(AppError::validation("amount cannot be negative"));
    }
    let amount = amount.round_dp(2);
    if amount > MAX_AMOUNT {
        return Err(overflow("amount"));
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: Uuid,
    pub invoice_number: String,
    pub client: String,
    pub client_email: Option<String>,
    pub client_address: Option<String>,
    pub client_phone: Option<String>,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub payment_terms: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// REQUEST MODELS
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,

    #[serde(alias = "clientName")]
    #[validate(length(min = 1, max = 200, message = "Client is required"))]
    pub client: String,

    #[validate(email(message = "Invalid client email"))]
    pub client_email: Option<String>,
    #[validate(length(max = 500))]
    pub client_address: Option<String>,
    #[validate(length(max = 50))]
    pub client_phone: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<LineItem>,

    pub amount: Option<Decimal>,
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub payment_terms: Option<String>,
}

/// Partial update: absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,

    #[serde(alias = "clientName")]
    #[validate(length(min = 1, max = 200, message = "Client cannot be empty"))]
    pub client: Option<String>,

    #[validate(email(message = "Invalid client email"))]
    pub client_email: Option<String>,
    #[validate(length(max = 500))]
    pub client_address: Option<String>,
    #[validate(length(max = 50))]
    pub client_phone: Option<String>,

    #[validate(nested)]
    pub items: Option<Vec<LineItem>>,

    pub amount: Option<Decimal>,
    pub status: Option<InvoiceStatus>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,

    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 200))]
    pub payment_terms: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// DOMAIN RULES
// ============================================================================

fn check_items(items: &[LineItem]) -> AppResult<()> {
    for (idx, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            return Err(AppError::validation(format!("items[{}].name: Item name is required", idx)));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(AppError::validation(format!("items[{}].quantity must be greater than 0", idx)));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::validation(format!("items[{}].unitPrice cannot be negative", idx)));
        }
        if item.quantity > MAX_AMOUNT {
            return Err(overflow(&format!("items[{}].quantity", idx)));
        }
        if item.unit_price > MAX_AMOUNT {
            return Err(overflow(&format!("items[{}].unitPrice", idx)));
        }
        if item.tax_percent < Decimal::ZERO || item.tax_percent > Decimal::ONE_HUNDRED {
            return Err(AppError::validation(format!(
                "items[{}].taxPercent must be between 0 and 100",
                idx
            )));
        }
    }
    Ok(())
}

fn check_dates(issue: Option<NaiveDate>, due: Option<NaiveDate>) -> AppResult<()> {
    if let (Some(issue), Some(due)) = (issue, due) {
        if due < issue {
            return Err(AppError::validation("dueDate cannot be before issueDate"));
        }
    }
    Ok(())
}

/// Postgres keeps microseconds; truncating here keeps responses equal to later reads.
fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `INV-YYYYMMDD-XXXXXX`, unique enough for display; the id is the real key.
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("INV-{}-{}", now.format("%Y%m%d"), suffix)
}

impl Invoice {
    /// Builds a new invoice owned by `user_id`. Totals are derived from the
    /// items when there are any, otherwise `amount` is required.
    pub fn from_request(user_id: Uuid, req: CreateInvoiceRequest) -> AppResult<Self> {
        let client = req.client.trim().to_string();
        if client.is_empty() {
            return Err(AppError::validation("client: Client is required"));
        }

        check_items(&req.items)?;
        check_dates(req.issue_date, req.due_date)?;

        let (subtotal, tax_total, amount) = if req.items.is_empty() {
            let amount = req
                .amount
                .ok_or_else(|| AppError::validation("amount: Amount is required when no items are given"))?;
            let amount = check_amount(amount)?;
            (amount, Decimal::ZERO, amount)
        } else {
            let totals = compute_totals(&req.items)?;
            (totals.subtotal, totals.tax_total, totals.total)
        };

        let now = timestamp_now();
        Ok(Invoice {
            id: Uuid::new_v4(),
            user_id,
            invoice_number: non_blank(req.invoice_number).unwrap_or_else(|| generate_invoice_number(now)),
            client,
            client_email: non_blank(req.client_email),
            client_address: non_blank(req.client_address),
            client_phone: non_blank(req.client_phone),
            items: req.items,
            subtotal,
            tax_total,
            amount,
            status: req.status.unwrap_or_default(),
            issue_date: req.issue_date,
            due_date: req.due_date,
            notes: non_blank(req.notes),
            payment_terms: non_blank(req.payment_terms),
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies a partial update in place and recomputes the totals.
    pub fn apply_update(&mut self, req: UpdateInvoiceRequest) -> AppResult<()> {
        if let Some(items) = &req.items {
            check_items(items)?;
            compute_totals(items)?;
        }

        let issue_date = req.issue_date.or(self.issue_date);
        let due_date = req.due_date.or(self.due_date);
        check_dates(issue_date, due_date)?;

        if let Some(client) = req.client {
            let client = client.trim().to_string();
            if client.is_empty() {
                return Err(AppError::validation("client: Client cannot be empty"));
            }
            self.client = client;
        }

        if let Some(number) = non_blank(req.invoice_number) {
            self.invoice_number = number;
        }

        if let Some(items) = req.items {
            self.items = items;
        }

        if self.items.is_empty() {
            if let Some(amount) = req.amount {
                self.amount = check_amount(amount)?;
            }
            self.subtotal = self.amount;
            self.tax_total = Decimal::ZERO;
        } else {
            if req.amount.is_some() {
                return Err(AppError::validation(
                    "amount is derived from items and cannot be set directly",
                ));
            }
            let totals = compute_totals(&self.items)?;
            self.subtotal = totals.subtotal;
            self.tax_total = totals.tax_total;
            self.amount = totals.total;
        }

        if req.client_email.is_some() {
            self.client_email = non_blank(req.client_email);
        }
        if req.client_address.is_some() {
            self.client_address = non_blank(req.client_address);
        }
        if req.client_phone.is_some() {
            self.client_phone = non_blank(req.client_phone);
        }
        if let Some(status) = req.status {
            self.status = status;
        }
        self.issue_date = issue_date;
        self.due_date = due_date;
        if req.notes.is_some() {
            self.notes = non_blank(req.notes);
        }
        if req.payment_terms.is_some() {
            self.payment_terms = non_blank(req.payment_terms);
        }

        self.updated_at = timestamp_now();
        Ok(())
    }
}

// ============================================================================
// DASHBOARD STATS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_invoices: usize,
    pub paid_invoices: usize,
    pub unpaid_invoices: usize,
    pub total_revenue: Decimal,
    pub total_outstanding: Decimal,
}

impl DashboardStats {
    pub fn from_invoices(invoices: &[Invoice]) -> Self {
        let mut stats = DashboardStats {
            total_invoices: invoices.len(),
            paid_invoices: 0,
            unpaid_invoices: 0,
            total_revenue: Decimal::ZERO,
            total_outstanding: Decimal::ZERO,
        };

        for invoice in invoices {
            match invoice.status {
                InvoiceStatus::Paid => {
                    stats.paid_invoices += 1;
                    stats.total_revenue += invoice.amount;
                }
                InvoiceStatus::Unpaid => {
                    stats.unpaid_invoices += 1;
                    stats.total_outstanding += invoice.amount;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn dec(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    fn simple_request(client: &str, amount: Option<Decimal>) -> CreateInvoiceRequest {
        serde_json::from_value(serde_json::json!({ "client": client }))
            .map(|mut req: CreateInvoiceRequest| {
                req.amount = amount;
                req
            })
            .unwrap()
    }

    #[test]
    fn test_totals_from_items() {
        let items = vec![
            LineItem {
                name: "Design".to_string(),
                quantity: dec(2.0),
                unit_price: dec(100.0),
                tax_percent: dec(10.0),
            },
            LineItem {
                name: "Hosting".to_string(),
                quantity: dec(1.0),
                unit_price: dec(50.0),
                tax_percent: Decimal::ZERO,
            },
        ];

        let totals = compute_totals(&items).unwrap();
        assert_eq!(totals.subtotal, dec(250.0));
        assert_eq!(totals.tax_total, dec(20.0));
        assert_eq!(totals.total, dec(270.0));
    }

    #[test]
    fn test_totals_overflow_is_validation_error() {
        let huge = LineItem {
            name: "x".to_string(),
            quantity: Decimal::MAX,
            unit_price: Decimal::MAX,
            tax_percent: Decimal::ZERO,
        };
        let err = compute_totals(&[huge]).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let over_column = LineItem {
            name: "x".to_string(),
            quantity: dec(1000.0),
            unit_price: MAX_AMOUNT,
            tax_percent: Decimal::ZERO,
        };
        assert!(compute_totals(&[over_column]).is_err());
    }

    #[test]
    fn test_max_amount_fits_numeric_14_2() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");
    }

    #[test]
    fn test_amount_above_column_limit_rejected() {
        let err = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(MAX_AMOUNT + dec(1.0)))).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let invoice = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(MAX_AMOUNT))).unwrap();
        assert_eq!(invoice.amount, MAX_AMOUNT);
    }

    #[test]
    fn test_timestamps_truncated_to_micros() {
        let invoice = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(dec(1.0)))).unwrap();
        assert_eq!(invoice.created_at.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(invoice.created_at, invoice.updated_at);
    }

    #[test]
    fn test_create_with_plain_amount() {
        let user_id = Uuid::new_v4();
        let invoice = Invoice::from_request(user_id, simple_request("Acme", Some(dec(500.0)))).unwrap();

        assert_eq!(invoice.user_id, user_id);
        assert_eq!(invoice.client, "Acme");
        assert_eq!(invoice.amount, dec(500.0));
        assert_eq!(invoice.status, InvoiceStatus::Unpaid);
        assert!(invoice.invoice_number.starts_with("INV-"));
    }

    #[test]
    fn test_create_requires_amount_without_items() {
        let err = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", None)).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_create_rejects_blank_client() {
        let err = Invoice::from_request(Uuid::new_v4(), simple_request("   ", Some(dec(1.0)))).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_due_date_before_issue_date_rejected() {
        let mut req = simple_request("Acme", Some(dec(10.0)));
        req.issue_date = NaiveDate::from_ymd_opt(2025, 5, 10);
        req.due_date = NaiveDate::from_ymd_opt(2025, 5, 1);
        assert!(Invoice::from_request(Uuid::new_v4(), req).is_err());
    }

    #[test]
    fn test_update_recomputes_from_items() {
        let mut invoice = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(dec(500.0)))).unwrap();
        let update = UpdateInvoiceRequest {
            items: Some(vec![LineItem {
                name: "Audit".to_string(),
                quantity: dec(3.0),
                unit_price: dec(40.0),
                tax_percent: Decimal::ZERO,
            }]),
            status: Some(InvoiceStatus::Paid),
            ..Default::default()
        };

        invoice.apply_update(update).unwrap();
        assert_eq!(invoice.amount, dec(120.0));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_update_amount_rejected_when_items_present() {
        let mut invoice = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(dec(1.0)))).unwrap();
        invoice.items = vec![LineItem {
            name: "Audit".to_string(),
            quantity: dec(1.0),
            unit_price: dec(1.0),
            tax_percent: Decimal::ZERO,
        }];

        let update = UpdateInvoiceRequest {
            amount: Some(dec(999.0)),
            ..Default::default()
        };
        assert!(invoice.apply_update(update).is_err());
    }

    #[test]
    fn test_amount_serialized_as_number() {
        let invoice = Invoice::from_request(Uuid::new_v4(), simple_request("Acme", Some(dec(500.0)))).unwrap();
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["amount"].as_f64(), Some(500.0));
        assert_eq!(json["status"], "Unpaid");
        assert!(json.get("invoiceNumber").is_some());
    }

    #[test]
    fn test_dashboard_stats() {
        let user_id = Uuid::new_v4();
        let mut paid = Invoice::from_request(user_id, simple_request("A", Some(dec(300.0)))).unwrap();
        paid.status = InvoiceStatus::Paid;
        let unpaid = Invoice::from_request(user_id, simple_request("B", Some(dec(200.0)))).unwrap();

        let stats = DashboardStats::from_invoices(&[paid, unpaid]);
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.paid_invoices, 1);
        assert_eq!(stats.unpaid_invoices, 1);
        assert_eq!(stats.total_revenue, dec(300.0));
        assert_eq!(stats.total_outstanding, dec(200.0));
    }
}
