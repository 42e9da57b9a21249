//! Signature adapter.
//!
//! The delivery pipeline only talks to [`MessageSigner`]. [`LocalWallet`] is
//! the in-process implementation: a keyring of Ed25519 keys grouped by wallet
//! name, where each wallet can be locked to refuse signing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::SigningError,
    keys::{verify_signature, WalletKeyPair},
};

#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// Sign `payload` with the key `wallet` holds for `address`.
    async fn sign(&self, wallet: &str, address: &str, payload: &[u8]) -> Result<String, SigningError>;

    /// Check `signature` over `payload` against the claimed signer. A bad
    /// signature is a `false`, never an error.
    async fn verify(&self, address: &str, signature: &str, payload: &[u8]) -> bool;
}

#[derive(Default)]
struct WalletEntry {
    locked: bool,
    keys: HashMap<String, WalletKeyPair>,
}

/// In-process keyring.
#[derive(Default)]
pub struct LocalWallet {
    wallets: RwLock<HashMap<String, WalletEntry>>,
}

impl LocalWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key to `wallet`, creating the wallet (unlocked) if needed.
    /// Returns the key's address.
    pub async fn insert_key(&self, wallet: &str, key: WalletKeyPair) -> String {
        let address = key.address().to_owned();
        let mut wallets = self.wallets.write().await;
        wallets
            .entry(wallet.to_owned())
            .or_default()
            .keys
            .insert(address.clone(), key);
        address
    }

    pub async fn lock(&self, wallet: &str) -> Result<(), SigningError> {
        self.set_locked(wallet, true).await
    }

    pub async fn unlock(&self, wallet: &str) -> Result<(), SigningError> {
        self.set_locked(wallet, false).await
    }

    async fn set_locked(&self, wallet: &str, locked: bool) -> Result<(), SigningError> {
        let mut wallets = self.wallets.write().await;
        let entry = wallets
            .get_mut(wallet)
            .ok_or_else(|| SigningError::UnknownWallet(wallet.to_owned()))?;
        entry.locked = locked;
        tracing::info!(wallet, locked, "Wallet lock state changed");
        Ok(())
    }

    /// Addresses held by `wallet`, sorted.
    pub async fn addresses(&self, wallet: &str) -> Vec<String> {
        let wallets = self.wallets.read().await;
        let mut addresses: Vec<String> = wallets
            .get(wallet)
            .map(|w| w.keys.keys().cloned().collect())
            .unwrap_or_default();
        addresses.sort();
        addresses
    }
}

#[async_trait]
impl MessageSigner for LocalWallet {
    async fn sign(&self, wallet: &str, address: &str, payload: &[u8]) -> Result<String, SigningError> {
        let wallets = self.wallets.read().await;
        let entry = wallets
            .get(wallet)
            .ok_or_else(|| SigningError::UnknownWallet(wallet.to_owned()))?;
        if entry.locked {
            return Err(SigningError::WalletLocked(wallet.to_owned()));
        }
        let key = entry.keys.get(address).ok_or_else(|| SigningError::UnknownAddress {
            wallet: wallet.to_owned(),
            address: address.to_owned(),
        })?;
        Ok(key.sign_bytes(payload))
    }

    async fn verify(&self, address: &str, signature: &str, payload: &[u8]) -> bool {
        verify_signature(address, signature, payload)
    }
}
