mod ledger;
mod models;
mod sqlite_subscription_store;
mod subscription_store;

pub use ledger::SubscriptionLedger;
pub use models::{SubscribedTrack, Subscription, SubscriptionKey};
pub use sqlite_subscription_store::{
    SqliteSubscriptionStore, SUBSCRIPTIONS_TABLE_NAME, SUBSCRIPTION_VERSIONED_SCHEMAS,
};
pub use subscription_store::SubscriptionStore;
