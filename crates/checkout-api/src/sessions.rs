//! # Cart Sessions
//!
//! One [`CheckoutFlow`] per shopper, keyed by a random id. Each flow sits
//! behind its own mutex so checkouts on different carts never contend.

use checkout_core::{Cart, CheckoutError, CheckoutFlow, CheckoutResult, Currency};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SharedFlow = Arc<Mutex<CheckoutFlow>>;

#[derive(Clone, Default)]
pub struct SessionStore {
    carts: Arc<RwLock<HashMap<Uuid, SharedFlow>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty cart
    pub async fn create(&self, currency: Currency) -> (Uuid, SharedFlow) {
        let id = Uuid::new_v4();
        let flow = Arc::new(Mutex::new(CheckoutFlow::new(Cart::new(currency))));
        self.carts.write().await.insert(id, flow.clone());
        (id, flow)
    }

    pub async fn get(&self, id: Uuid) -> CheckoutResult<SharedFlow> {
        self.carts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CheckoutError::NotFound(format!("cart {}", id)))
    }

    /// Drop a cart. In-flight submissions finish against their own handle.
    pub async fn remove(&self, id: Uuid) -> CheckoutResult<()> {
        self.carts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CheckoutError::NotFound(format!("cart {}", id)))
    }

    pub async fn len(&self) -> usize {
        self.carts.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_remove() {
        let store = SessionStore::new();
        let (id, flow) = store.create(Currency::USD).await;

        assert_eq!(store.len().await, 1);
        assert!(Arc::ptr_eq(&flow, &store.get(id).await.unwrap()));

        store.remove(id).await.unwrap();
        assert!(matches!(
            store.get(id).await,
            Err(CheckoutError::NotFound(_))
        ));
        assert!(store.remove(id).await.is_err());
    }
}
