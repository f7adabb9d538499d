use crate::error::{AppError, AppResult};

/// Cost range accepted by the bcrypt crate; its own bounds are private.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

/// bcrypt with a configurable cost. Hashing runs on the blocking pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_BCRYPT_COST, MAX_BCRYPT_COST),
        }
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("hash task failed: {}", e)))?
            .map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
            .await
            .map_err(|e| AppError::internal(format!("verify task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
        let hash = hasher.hash("s3cret-pass").await.unwrap();

        assert_ne!(hash, "s3cret-pass");
        assert!(hasher.verify("s3cret-pass", &hash).await.unwrap());
        assert!(!hasher.verify("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        let hasher = PasswordHasher::new(MIN_BCRYPT_COST);
        assert!(!hasher.verify("anything", "not-a-bcrypt-hash").await.unwrap());
    }

    #[tokio::test]
    async fn test_cost_clamped_into_bcrypt_range() {
        let hasher = PasswordHasher::new(1);
        let hash = hasher.hash("s3cret-pass").await.unwrap();

        assert!(hash.starts_with("$2b$04$"));
        assert_eq!(PasswordHasher::new(99).cost, MAX_BCRYPT_COST);
    }
}
