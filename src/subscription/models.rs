use crate::catalog::{CatalogEntry, TrackKey};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// `(owner, title, artist)`, unique in the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub owner_email: String,
    pub track: TrackKey,
}

impl SubscriptionKey {
    pub fn new<S: Into<String>>(owner_email: S, track: TrackKey) -> Self {
        Self {
            owner_email: owner_email.into(),
            track,
        }
    }
}

/// A ledger row. `snapshot` is the catalog entry as it was when the owner
/// subscribed, later catalog changes do not show up here.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Subscription {
    pub email: String,
    #[serde(rename = "musicId")]
    pub music_id: String,
    #[serde(flatten)]
    pub snapshot: CatalogEntry,
    pub subscribed_at: DateTime<Utc>,
}

impl Subscription {
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey::new(self.email.clone(), self.snapshot.key())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubscribedTrack {
    #[serde(flatten)]
    pub subscription: Subscription,
    pub img_url: String,
}
