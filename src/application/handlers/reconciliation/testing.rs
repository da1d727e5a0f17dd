//! Shared test infrastructure for reconciliation handler tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::adapters::memory::{InMemoryOrderStore, StaticMerchantAccount};
use crate::domain::foundation::{
    AuthorizationId, CaptureId, OrderId, ReferenceId, RefundId, Timestamp,
};
use crate::domain::reconciliation::{
    Amount, ApiVariant, AuthorizationState, CaptureState, ObserverSet, OrderLockRegistry,
    ReferenceState, ReferenceStateStore, RefundState,
};
use crate::ports::{
    AuthorizationOutcome, CaptureOutcome, CartContext, GatewayClient, GatewayClientFactory,
    GatewayError, IdempotencyToken, MerchantAccountStore, OrderContext, OrderStore,
    ReferenceCreated, ReferenceDetails, RefundOutcome,
};

/// Scriptable gateway double. Queued results are popped per call; an
/// empty queue yields a fixed success.
#[derive(Default)]
pub struct FakeGateway {
    pub authorize_queue: Mutex<VecDeque<Result<AuthorizationOutcome, GatewayError>>>,
    pub capture_queue: Mutex<VecDeque<Result<CaptureOutcome, GatewayError>>>,
    pub refund_queue: Mutex<VecDeque<Result<RefundOutcome, GatewayError>>>,
    pub details_queue: Mutex<VecDeque<Result<ReferenceDetails, GatewayError>>>,
    pub seen_tokens: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_authorize(&self, result: Result<AuthorizationOutcome, GatewayError>) {
        self.authorize_queue.lock().await.push_back(result);
    }

    pub async fn push_capture(&self, result: Result<CaptureOutcome, GatewayError>) {
        self.capture_queue.lock().await.push_back(result);
    }

    pub async fn push_refund(&self, result: Result<RefundOutcome, GatewayError>) {
        self.refund_queue.lock().await.push_back(result);
    }

    pub async fn push_details(&self, result: Result<ReferenceDetails, GatewayError>) {
        self.details_queue.lock().await.push_back(result);
    }
}

pub fn default_authorization() -> AuthorizationOutcome {
    AuthorizationOutcome {
        authorization_id: AuthorizationId::new("AUTH1").unwrap(),
        state: AuthorizationState::Open,
        amount: Amount::new(1999, "USD").unwrap(),
        observed_at: Timestamp::from_unix(1_000),
    }
}

pub fn default_capture() -> CaptureOutcome {
    CaptureOutcome {
        capture_id: CaptureId::new("CAP1").unwrap(),
        state: CaptureState::Completed,
        amount: Amount::new(1999, "USD").unwrap(),
        observed_at: Timestamp::from_unix(2_000),
    }
}

pub fn default_refund() -> RefundOutcome {
    RefundOutcome {
        refund_id: RefundId::new("R1").unwrap(),
        state: RefundState::Pending,
        amount: Amount::new(500, "USD").unwrap(),
        observed_at: Timestamp::from_unix(3_000),
    }
}

#[async_trait]
impl GatewayClient for FakeGateway {
    async fn create_reference(
        &self,
        cart: &CartContext,
    ) -> Result<ReferenceCreated, GatewayError> {
        let _ = cart;
        Ok(ReferenceCreated {
            reference_id: ReferenceId::new("REF1").unwrap(),
            state: ReferenceState::Pending,
            observed_at: Timestamp::from_unix(100),
        })
    }

    async fn authorize(
        &self,
        _reference_id: &ReferenceId,
        _amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<AuthorizationOutcome, GatewayError> {
        self.seen_tokens.lock().await.push(token.as_str().to_string());
        self.authorize_queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(default_authorization()))
    }

    async fn capture(
        &self,
        _authorization_id: &AuthorizationId,
        _amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<CaptureOutcome, GatewayError> {
        self.seen_tokens.lock().await.push(token.as_str().to_string());
        self.capture_queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(default_capture()))
    }

    async fn refund(
        &self,
        _capture_id: &CaptureId,
        _amount: &Amount,
        token: &IdempotencyToken,
    ) -> Result<RefundOutcome, GatewayError> {
        self.seen_tokens.lock().await.push(token.as_str().to_string());
        self.refund_queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(default_refund()))
    }

    async fn get_reference_details(
        &self,
        reference_id: &ReferenceId,
    ) -> Result<ReferenceDetails, GatewayError> {
        self.details_queue.lock().await.pop_front().unwrap_or_else(|| {
            Ok(ReferenceDetails {
                reference_id: reference_id.clone(),
                reference_state: ReferenceState::Open,
                authorization: None,
                capture: None,
                refunds: Vec::new(),
                observed_at: Timestamp::from_unix(500),
            })
        })
    }
}

/// Factory handing the same fake to both variants.
pub struct FakeGatewayFactory {
    pub gateway: Arc<FakeGateway>,
    pub last_variant: std::sync::Mutex<Option<ApiVariant>>,
}

impl GatewayClientFactory for FakeGatewayFactory {
    fn client_for(&self, variant: ApiVariant) -> Arc<dyn GatewayClient> {
        *self.last_variant.lock().expect("test mutex") = Some(variant);
        Arc::clone(&self.gateway) as Arc<dyn GatewayClient>
    }
}

/// The dyn-typed dependency bundle handlers take.
pub struct HandlerDeps {
    pub orders: Arc<dyn OrderStore>,
    pub merchant: Arc<dyn MerchantAccountStore>,
    pub clients: Arc<dyn GatewayClientFactory>,
    pub locks: Arc<OrderLockRegistry>,
    pub observers: ObserverSet,
}

pub struct TestRig {
    pub orders: Arc<InMemoryOrderStore>,
    pub store: Arc<ReferenceStateStore>,
    pub gateway: Arc<FakeGateway>,
    pub handler_deps: HandlerDeps,
}

pub async fn test_rig() -> TestRig {
    let orders = Arc::new(InMemoryOrderStore::strict());
    let store = Arc::new(ReferenceStateStore::new(
        Arc::clone(&orders) as Arc<dyn OrderStore>
    ));
    let gateway = Arc::new(FakeGateway::new());
    let handler_deps = HandlerDeps {
        orders: Arc::clone(&orders) as Arc<dyn OrderStore>,
        merchant: Arc::new(StaticMerchantAccount::migrated()) as Arc<dyn MerchantAccountStore>,
        clients: Arc::new(FakeGatewayFactory {
            gateway: Arc::clone(&gateway),
            last_variant: std::sync::Mutex::new(None),
        }) as Arc<dyn GatewayClientFactory>,
        locks: Arc::new(OrderLockRegistry::new()),
        observers: ObserverSet::new(),
    };
    TestRig { orders, store, gateway, handler_deps }
}

/// Seeds a checkout-ready order and returns its ID.
pub async fn seeded_order(orders: &InMemoryOrderStore) -> OrderId {
    let order_id = OrderId::new();
    orders
        .seed_order(OrderContext {
            order_id,
            total_minor: 1999,
            currency: "USD".to_string(),
            customer_email: Some("buyer@example.com".to_string()),
        })
        .await;
    order_id
}
