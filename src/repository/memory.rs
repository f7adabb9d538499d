use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use uuid::Uuid;

use super::{InvoiceRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::models::{Invoice, NewUser, ProfileChanges, User};

/// DashMap-backed user store with an e-mail index for uniqueness.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<DashMap<Uuid, User>>,
    by_email: Arc<DashMap<String, Uuid>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        match self.by_email.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(AppError::conflict("User already exists")),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let created = User {
                    id: Uuid::new_v4(),
                    name: user.name,
                    email: user.email,
                    password_hash: user.password_hash,
                    business_name: user.business_name,
                    address: user.address,
                    phone: user.phone,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(created.id);
                self.users.insert(created.id, created.clone());
                Ok(created)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let id = match self.by_email.get(email) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn update_profile(&self, id: Uuid, changes: ProfileChanges) -> AppResult<Option<User>> {
        let Some(mut user) = self.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(business_name) = changes.business_name {
            user.business_name = Some(business_name);
        }
        if let Some(address) = changes.address {
            user.address = Some(address);
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Arc<DashMap<Uuid, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> AppResult<()> {
        match self.invoices.entry(invoice.id) {
            Entry::Occupied(_) => Err(AppError::conflict("Invoice already exists")),
            Entry::Vacant(slot) => {
                slot.insert(invoice.clone());
                Ok(())
            }
        }
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn find_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<Option<Invoice>> {
        Ok(self
            .invoices
            .get(&id)
            .filter(|entry| entry.user_id == user_id)
            .map(|entry| entry.value().clone()))
    }

    async fn update(&self, invoice: &Invoice) -> AppResult<bool> {
        match self.invoices.get_mut(&invoice.id) {
            Some(mut stored) if stored.user_id == invoice.user_id => {
                *stored = invoice.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> AppResult<bool> {
        Ok(self
            .invoices
            .remove_if(&id, |_, stored| stored.user_id == user_id)
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateInvoiceRequest;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            business_name: None,
            address: None,
            phone: None,
        }
    }

    fn invoice_for(user_id: Uuid, client: &str) -> Invoice {
        let req: CreateInvoiceRequest =
            serde_json::from_value(serde_json::json!({ "client": client, "amount": 10 })).unwrap();
        Invoice::from_request(user_id, req).unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let repo = InMemoryUserRepository::new();
        repo.create(new_user("ana@example.com")).await.unwrap();

        let err = repo.create(new_user("ana@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_invoices_scoped_by_owner() {
        let repo = InMemoryInvoiceRepository::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let invoice = invoice_for(owner, "Acme");
        repo.insert(&invoice).await.unwrap();

        assert!(repo.find_for_user(owner, invoice.id).await.unwrap().is_some());
        assert!(repo.find_for_user(stranger, invoice.id).await.unwrap().is_none());
        assert!(!repo.delete_for_user(stranger, invoice.id).await.unwrap());
        assert!(repo.delete_for_user(owner, invoice.id).await.unwrap());
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_update_rejects_foreign_owner() {
        let repo = InMemoryInvoiceRepository::new();
        let owner = Uuid::new_v4();
        let invoice = invoice_for(owner, "Acme");
        repo.insert(&invoice).await.unwrap();

        let mut hijacked = invoice.clone();
        hijacked.user_id = Uuid::new_v4();
        hijacked.client = "Mallory".to_string();
        assert!(!repo.update(&hijacked).await.unwrap());

        let stored = repo.find_for_user(owner, invoice.id).await.unwrap().unwrap();
        assert_eq!(stored.client, "Acme");
    }
}
