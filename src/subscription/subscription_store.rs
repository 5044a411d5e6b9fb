use super::models::{Subscription, SubscriptionKey};
use crate::catalog::CatalogEntry;
use anyhow::Result;

pub trait SubscriptionStore: Send + Sync {
    /// Records a subscription of `owner_email` to `snapshot` unless the owner
    /// is already subscribed to the same `(title, artist)`. Check and write
    /// are a single atomic operation.
    /// Returns Ok(false), modifying nothing, if the subscription existed.
    fn insert_if_absent(&self, owner_email: &str, snapshot: &CatalogEntry) -> Result<bool>;

    /// Deletes a subscription. Returns Ok(false) if there was none.
    fn delete(&self, key: &SubscriptionKey) -> Result<bool>;

    /// All subscriptions of `owner_email`, in no particular order.
    fn list_by_owner(&self, owner_email: &str) -> Result<Vec<Subscription>>;
}
