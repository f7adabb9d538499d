//! Persistence seams for users and invoices.
//!
//! Handlers only see the traits. `postgres` is what the server runs on;
//! `memory` backs the in-process tests and keeps the same ownership rules.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Invoice, NewUser, ProfileChanges, User};

pub use memory::{InMemoryInvoiceRepository, InMemoryUserRepository};
pub use postgres::{PgInvoiceRepository, PgUserRepository};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AppError::Conflict` when the e-mail is already registered.
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<User>>;
}

/// Every lookup is scoped by owner: another user's invoice is reported as absent.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn insert(&self, invoice: &Invoice) -> AppResult<()>;

    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Invoice>>;

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Invoice>>;

    /// Returns `false` when no invoice with that id belongs to `invoice.user_id`.
    async fn update(&self, invoice: &Invoice) -> AppResult<bool>;

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<bool>;
}
