// Bearer credential slot
//
// A pass-through over the `auth_token` preference key. Nothing in this
// crate looks inside the token; the transport reads it at request time.

use std::sync::Arc;

use crate::storage::{PreferenceStore, AUTH_TOKEN_KEY};

/// Shared handle to the stored bearer credential
#[derive(Clone)]
pub struct CredentialSlot {
    store: Arc<dyn PreferenceStore>,
}

impl CredentialSlot {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Current token, if any (empty strings count as absent)
    pub fn token(&self) -> Option<String> {
        self.store.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set(&self, token: &str) {
        if let Err(e) = self.store.set(AUTH_TOKEN_KEY, token) {
            tracing::warn!("Failed to persist credential: {}", e);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.store.remove(AUTH_TOKEN_KEY) {
            tracing::warn!("Failed to clear credential: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_set_and_clear() {
        let slot = CredentialSlot::new(Arc::new(MemoryStore::new()));
        assert_eq!(slot.token(), None);

        slot.set("secret");
        assert_eq!(slot.token().as_deref(), Some("secret"));

        slot.clear();
        assert_eq!(slot.token(), None);

        // Clearing twice is harmless
        slot.clear();
    }

    #[test]
    fn test_empty_token_is_absent() {
        let slot = CredentialSlot::new(Arc::new(MemoryStore::with_value(AUTH_TOKEN_KEY, "")));
        assert_eq!(slot.token(), None);
    }
}
