use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{InvoiceRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::{Invoice, InvoiceStatus, LineItem, NewUser, ProfileChanges, User};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, business_name, address, phone, created_at, updated_at";

const INVOICE_COLUMNS: &str = "id, user_id, invoice_number, client, client_email, client_address, \
     client_phone, items, subtotal, tax_total, amount, status, issue_date, due_date, notes, \
     payment_terms, created_at, updated_at";

// ============================================================================
// USERS
// ============================================================================

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, business_name, address, phone) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            USER_COLUMNS
        );

        let result = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.business_name)
            .bind(&user.address)
            .bind(&user.phone)
            .fetch_one(&self.pool)
            .await;

        match result {
            Ok(created) => Ok(created),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!(email = %user.email, "Duplicate registration attempt");
                Err(AppError::conflict("User already exists"))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<User>> {
        let query = format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                business_name = COALESCE($3, business_name), \
                address = COALESCE($4, address), \
                phone = COALESCE($5, phone), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&changes.name)
            .bind(&changes.business_name)
            .bind(&changes.address)
            .bind(&changes.phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

// ============================================================================
// INVOICES
// ============================================================================

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    user_id: Uuid,
    invoice_number: String,
    client: String,
    client_email: Option<String>,
    client_address: Option<String>,
    client_phone: Option<String>,
    items: Json<Vec<LineItem>>,
    subtotal: Decimal,
    tax_total: Decimal,
    amount: Decimal,
    status: String,
    issue_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    notes: Option<String>,
    payment_terms: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        let status = InvoiceStatus::parse(&row.status).ok_or_else(|| {
            AppError::internal(format!("Unknown invoice status '{}' for {}", row.status, row.id))
        })?;

        Ok(Invoice {
            id: row.id,
            user_id: row.user_id,
            invoice_number: row.invoice_number,
            client: row.client,
            client_email: row.client_email,
            client_address: row.client_address,
            client_phone: row.client_phone,
            items: row.items.0,
            subtotal: row.subtotal,
            tax_total: row.tax_total,
            amount: row.amount,
            status,
            issue_date: row.issue_date,
            due_date: row.due_date,
            notes: row.notes,
            payment_terms: row.payment_terms,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, user_id, invoice_number, client, client_email, client_address,
                client_phone, items, subtotal, tax_total, amount, status, issue_date,
                due_date, notes, payment_terms, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.user_id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client)
        .bind(&invoice.client_email)
        .bind(&invoice.client_address)
        .bind(&invoice.client_phone)
        .bind(Json(&invoice.items))
        .bind(invoice.subtotal)
        .bind(invoice.tax_total)
        .bind(invoice.amount)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(&invoice.payment_terms)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(invoice_id = %invoice.id, "Invoice row inserted");
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Invoice>> {
        let query = format!(
            "SELECT {} FROM invoices WHERE user_id = $1 ORDER BY created_at DESC",
            INVOICE_COLUMNS
        );
        let rows = sqlx::query_as::<_, InvoiceRow>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Invoice>> {
        let query = format!(
            "SELECT {} FROM invoices WHERE id = $1 AND user_id = $2",
            INVOICE_COLUMNS
        );
        let row = sqlx::query_as::<_, InvoiceRow>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Invoice::try_from).transpose()
    }

    async fn update(&self, invoice: &Invoice) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices SET
                invoice_number = $3, client = $4, client_email = $5, client_address = $6,
                client_phone = $7, items = $8, subtotal = $9, tax_total = $10, amount = $11,
                status = $12, issue_date = $13, due_date = $14, notes = $15,
                payment_terms = $16, updated_at = $17
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(invoice.id)
        .bind(invoice.user_id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.client)
        .bind(&invoice.client_email)
        .bind(&invoice.client_address)
        .bind(&invoice.client_phone)
        .bind(Json(&invoice.items))
        .bind(invoice.subtotal)
        .bind(invoice.tax_total)
        .bind(invoice.amount)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .bind(&invoice.payment_terms)
        .bind(invoice.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
