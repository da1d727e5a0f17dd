//! Ports - Traits the reconciliation engine depends on.
//!
//! Adapters implement these; the domain and application layers only ever
//! see the trait.

mod gateway_client;
mod merchant_account;
mod notification_verifier;
mod order_store;
mod seen_message_store;
mod state_observer;
mod subscriptions_feed;

pub use gateway_client::{
    AuthorizationOutcome, CaptureOutcome, CartContext, GatewayClient, GatewayClientFactory,
    GatewayError, GatewayErrorKind, IdempotencyToken, ReferenceCreated, ReferenceDetails,
    RefundOutcome,
};
pub use merchant_account::{MerchantAccountStore, MerchantCredentials};
pub use notification_verifier::{NotificationRejection, NotificationVerifier, VerificationError};
pub use order_store::{OrderContext, OrderStatus, OrderStore};
pub use seen_message_store::SeenMessageStore;
pub use state_observer::StateObserver;
pub use subscriptions_feed::SubscriptionsFeed;
