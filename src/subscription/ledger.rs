use super::models::{SubscribedTrack, SubscriptionKey};
use super::subscription_store::SubscriptionStore;
use crate::catalog::{CatalogIndex, TrackKey};
use crate::error::{CoreError, CoreResult};
use crate::image::ImageLocator;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owner-scoped subscriptions, checked against the catalog and enriched with
/// cover images on the way out.
pub struct SubscriptionLedger {
    catalog: Arc<dyn CatalogIndex>,
    store: Arc<dyn SubscriptionStore>,
    images: ImageLocator,
}

impl SubscriptionLedger {
    pub fn new(
        catalog: Arc<dyn CatalogIndex>,
        store: Arc<dyn SubscriptionStore>,
        images: ImageLocator,
    ) -> Self {
        Self {
            catalog,
            store,
            images,
        }
    }

    /// Subscribes `owner_email` to the catalog entry `(title, artist)` and
    /// returns the owner's refreshed list.
    ///
    /// The row carries a copy of the entry as it is now. Subscribing twice to
    /// the same track is a [`CoreError::Conflict`], even under concurrent calls.
    pub fn subscribe(
        &self,
        owner_email: &str,
        title: &str,
        artist: &str,
    ) -> CoreResult<Vec<SubscribedTrack>> {
        let track = TrackKey::new(title, artist);
        let snapshot = self
            .catalog
            .get(&track)?
            .ok_or_else(|| CoreError::NotFound {
                title: title.to_string(),
                artist: artist.to_string(),
            })?;

        if !self.store.insert_if_absent(owner_email, &snapshot)? {
            warn!(
                "{} is already subscribed to {}",
                owner_email,
                track.music_id()
            );
            return Err(CoreError::Conflict {
                owner: owner_email.to_string(),
                music_id: track.music_id(),
            });
        }
        info!("{} subscribed to {}", owner_email, track.music_id());

        self.list(owner_email)
    }

    /// Removing a subscription that does not exist is not an error.
    pub fn unsubscribe(&self, owner_email: &str, title: &str, artist: &str) -> CoreResult<()> {
        let key = SubscriptionKey::new(owner_email, TrackKey::new(title, artist));
        if self.store.delete(&key)? {
            info!(
                "{} unsubscribed from {}",
                owner_email,
                key.track.music_id()
            );
        } else {
            debug!(
                "unsubscribe({}, {}): nothing to delete",
                owner_email,
                key.track.music_id()
            );
        }
        Ok(())
    }

    pub fn list(&self, owner_email: &str) -> CoreResult<Vec<SubscribedTrack>> {
        let subscriptions = self.store.list_by_owner(owner_email)?;
        debug!(
            "list({}): {} subscriptions",
            owner_email,
            subscriptions.len()
        );
        Ok(subscriptions
            .into_iter()
            .map(|subscription| SubscribedTrack {
                img_url: self.images.image_url(&subscription.snapshot.artist),
                subscription,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogEntry, CatalogFilter};
    use crate::subscription::models::Subscription;
    use anyhow::{bail, Result};
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Barrier, Mutex};
    use std::thread;

    #[derive(Default)]
    struct InMemoryCatalog {
        entries: Mutex<HashMap<TrackKey, CatalogEntry>>,
    }

    impl InMemoryCatalog {
        fn with(entries: Vec<CatalogEntry>) -> Self {
            let catalog = Self::default();
            for entry in entries {
                catalog.put(entry);
            }
            catalog
        }

        fn put(&self, entry: CatalogEntry) {
            self.entries.lock().unwrap().insert(entry.key(), entry);
        }
    }

    impl CatalogIndex for InMemoryCatalog {
        fn search(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .values()
                .filter(|entry| filter.matches(entry))
                .cloned()
                .collect())
        }

        fn get(&self, key: &TrackKey) -> Result<Option<CatalogEntry>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }
    }

    #[derive(Default)]
    struct InMemorySubscriptionStore {
        rows: Mutex<HashMap<SubscriptionKey, Subscription>>,
    }

    impl SubscriptionStore for InMemorySubscriptionStore {
        fn insert_if_absent(&self, owner_email: &str, snapshot: &CatalogEntry) -> Result<bool> {
            let key = SubscriptionKey::new(owner_email, snapshot.key());
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(&key) {
                return Ok(false);
            }
            let subscription = Subscription {
                email: owner_email.to_string(),
                music_id: snapshot.key().music_id(),
                snapshot: snapshot.clone(),
                subscribed_at: Utc::now(),
            };
            rows.insert(subscription.key(), subscription);
            Ok(true)
        }

        fn delete(&self, key: &SubscriptionKey) -> Result<bool> {
            Ok(self.rows.lock().unwrap().remove(key).is_some())
        }

        fn list_by_owner(&self, owner_email: &str) -> Result<Vec<Subscription>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.email == owner_email)
                .cloned()
                .collect())
        }
    }

    struct BrokenSubscriptionStore;

    impl SubscriptionStore for BrokenSubscriptionStore {
        fn insert_if_absent(&self, _owner_email: &str, _snapshot: &CatalogEntry) -> Result<bool> {
            bail!("connection reset")
        }

        fn delete(&self, _key: &SubscriptionKey) -> Result<bool> {
            bail!("connection reset")
        }

        fn list_by_owner(&self, _owner_email: &str) -> Result<Vec<Subscription>> {
            bail!("connection reset")
        }
    }

    fn ledger_with(
        catalog: Arc<InMemoryCatalog>,
    ) -> (SubscriptionLedger, Arc<InMemorySubscriptionStore>) {
        let store = Arc::new(InMemorySubscriptionStore::default());
        let ledger = SubscriptionLedger::new(
            catalog,
            store.clone(),
            ImageLocator::new("https://img.example.com"),
        );
        (ledger, store)
    }

    fn discovery_catalog() -> Arc<InMemoryCatalog> {
        Arc::new(InMemoryCatalog::with(vec![
            CatalogEntry::new("Discovery", "Daft Punk", 2001),
            CatalogEntry::new("Play", "Moby", 1999),
        ]))
    }

    #[test]
    fn subscribe_returns_enriched_list() {
        let (ledger, _) = ledger_with(discovery_catalog());

        let list = ledger.subscribe("a@x.com", "Discovery", "Daft Punk").unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].subscription.music_id, "Discovery_Daft Punk");
        assert_eq!(list[0].subscription.email, "a@x.com");
        assert_eq!(list[0].img_url, "https://img.example.com/DaftPunk.jpg");
    }

    #[test]
    fn subscribe_twice_is_a_conflict() {
        let (ledger, store) = ledger_with(discovery_catalog());
        ledger.subscribe("a@x.com", "Discovery", "Daft Punk").unwrap();

        let result = ledger.subscribe("a@x.com", "Discovery", "Daft Punk");

        assert!(matches!(
            result,
            Err(CoreError::Conflict { ref music_id, .. }) if music_id == "Discovery_Daft Punk"
        ));
        assert_eq!(store.list_by_owner("a@x.com").unwrap().len(), 1);
    }

    #[test]
    fn subscribe_to_unknown_track_is_not_found() {
        let (ledger, store) = ledger_with(discovery_catalog());

        let result = ledger.subscribe("a@x.com", "Homework", "Daft Punk");

        assert!(matches!(result, Err(CoreError::NotFound { .. })));
        assert!(store.list_by_owner("a@x.com").unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let (ledger, store) = ledger_with(discovery_catalog());
        ledger.subscribe("a@x.com", "Discovery", "Daft Punk").unwrap();
        ledger.subscribe("a@x.com", "Play", "Moby").unwrap();

        ledger.unsubscribe("a@x.com", "Discovery", "Daft Punk").unwrap();
        ledger.unsubscribe("a@x.com", "Discovery", "Daft Punk").unwrap();
        ledger.unsubscribe("a@x.com", "Never", "Subscribed").unwrap();

        let left = store.list_by_owner("a@x.com").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].snapshot.title, "Play");
    }

    #[test]
    fn subscriptions_keep_their_snapshot() {
        let catalog = discovery_catalog();
        let (ledger, _) = ledger_with(catalog.clone());
        ledger.subscribe("a@x.com", "Discovery", "Daft Punk").unwrap();

        catalog.put(
            CatalogEntry::new("Discovery", "Daft Punk", 2021).with_attribute("remastered", true),
        );

        let list = ledger.list("a@x.com").unwrap();
        assert_eq!(list[0].subscription.snapshot.year, 2001);
        assert!(list[0].subscription.snapshot.attributes.is_empty());
    }

    #[test]
    fn racing_subscribes_let_exactly_one_through() {
        let (ledger, store) = ledger_with(discovery_catalog());
        let ledger = Arc::new(ledger);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    ledger.subscribe("a@x.com", "Discovery", "Daft Punk")
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(CoreError::Conflict { .. })))
                .count(),
            1
        );
        assert_eq!(store.list_by_owner("a@x.com").unwrap().len(), 1);
    }

    #[test]
    fn storage_failures_are_retryable() {
        let ledger = SubscriptionLedger::new(
            discovery_catalog(),
            Arc::new(BrokenSubscriptionStore),
            ImageLocator::default(),
        );

        let error = ledger
            .subscribe("a@x.com", "Discovery", "Daft Punk")
            .unwrap_err();
        assert!(matches!(error, CoreError::Storage(_)));
        assert!(error.is_retryable());
        assert!(ledger.unsubscribe("a@x.com", "Play", "Moby").is_err());
    }
}
