//! HTTP surface of the node: outbound send, the relay's delivery webhook and a
//! health check.

pub mod health;
pub mod messages;
pub mod transport;

use std::sync::Arc;

use axum::Router;
use bazaar_db::Database;
use bazaar_delivery::{InboundProcessor, OutboundPipeline};

/// Shared state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub outbound: Arc<OutboundPipeline>,
    /// First-pass handler for items pushed by the relay.
    pub processor: Arc<InboundProcessor>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(messages::router())
        .merge(transport::router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use bazaar_common::models::{ChannelType, MessageEnvelope};
    use bazaar_db::Database;
    use bazaar_delivery::{
        directory::ChannelDirectory, DirectoryError, Fanout, InboundPipeline, InboundProcessor,
        LocalWallet, ManualClock, OutboundPipeline, SendOptions, SizeLimits, TransmitReceipt,
        Transport, TransportError, WalletKeyPair,
    };
    use tokio::sync::broadcast;

    use super::{build_router, AppState};

    pub const WALLET: &str = "market";

    pub struct NoDirectory;

    #[async_trait]
    impl ChannelDirectory for NoDirectory {
        async fn exists(&self, _: ChannelType, _: &str) -> Result<bool, DirectoryError> {
            Ok(false)
        }

        async fn entitled_identities(&self, _: ChannelType, _: &str) -> Result<Vec<String>, DirectoryError> {
            Ok(Vec::new())
        }
    }

    /// Relay that accepts everything with sequential ids.
    #[derive(Default)]
    pub struct CountingRelay {
        sent: AtomicUsize,
    }

    impl CountingRelay {
        pub fn sent(&self) -> usize {
            self.sent.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for CountingRelay {
        async fn send(&self, _: &MessageEnvelope, _: &SendOptions) -> Result<TransmitReceipt, TransportError> {
            let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TransmitReceipt { transport_id: format!("relay-{n}"), status: "sent".into() })
        }
    }

    pub struct TestApp {
        pub router: axum::Router,
        pub wallet: Arc<LocalWallet>,
        pub relay: Arc<CountingRelay>,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let db = Database::connect_in_memory().await.unwrap();
            let clock = Arc::new(ManualClock::new(1_700_000_000_000));
            let wallet = Arc::new(LocalWallet::new());
            let relay = Arc::new(CountingRelay::default());
            let (tx, _) = broadcast::channel(4);

            let outbound = Arc::new(OutboundPipeline::new(
                db.clone(),
                wallet.clone(),
                relay.clone(),
                clock.clone(),
                SizeLimits::default(),
                2000,
            ));
            let pipeline = InboundPipeline::new(
                db.clone(),
                wallet.clone(),
                Arc::new(NoDirectory),
                Fanout::new(db.clone(), tx),
                clock.clone(),
            );
            let processor = Arc::new(InboundProcessor::new(pipeline, db.clone(), clock));
            let router = build_router(AppState { db, outbound, processor });
            Self { router, wallet, relay }
        }

        /// Add a signing key to the test wallet and return its address.
        pub async fn identity(&self) -> String {
            self.wallet.insert_key(WALLET, WalletKeyPair::generate()).await
        }
    }

    pub async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
