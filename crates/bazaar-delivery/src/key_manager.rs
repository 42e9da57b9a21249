//! DB-backed identity key provisioning.
//!
//! On startup `KeyManager::load_or_generate` loads every identity registered
//! for a wallet from the `identities` table. If the wallet has none (first run)
//! a fresh Ed25519 pair is generated, persisted, and returned.

use bazaar_common::models::Identity;
use bazaar_db::{repository::identities, Database};
use tracing::{info, warn};

use crate::{error::SigningError, keys::WalletKeyPair, signatures::LocalWallet};

pub struct KeyManager {
    db: Database,
}

impl KeyManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return the identities of `wallet` with their key pairs, provisioning one
    /// if the wallet is empty.
    pub async fn load_or_generate(
        &self,
        wallet: &str,
        now: i64,
    ) -> Result<Vec<(Identity, WalletKeyPair)>, SigningError> {
        let stored = identities::list_for_wallet(&self.db.pool, wallet)
            .await
            .map_err(|e| SigningError::KeyLoad(e.to_string()))?;

        if !stored.is_empty() {
            let mut loaded = Vec::with_capacity(stored.len());
            for key in stored {
                let kp = WalletKeyPair::from_seed_hex(&key.seed_hex)?;
                if kp.address() != key.identity.address {
                    return Err(SigningError::KeyLoad(format!(
                        "seed of identity {} does not match its address",
                        key.identity.id
                    )));
                }
                loaded.push((key.identity, kp));
            }
            info!(wallet, count = loaded.len(), "Loaded wallet identities");
            return Ok(loaded);
        }

        warn!(wallet, "No identity for wallet, generating a new Ed25519 key pair");
        let kp = WalletKeyPair::generate();
        let identity = identities::create_identity(&self.db.pool, wallet, kp.address(), &kp.seed_hex(), now)
            .await
            .map_err(|e| SigningError::KeyLoad(e.to_string()))?;
        info!(wallet, address = %identity.address, "Generated and persisted new identity");
        Ok(vec![(identity, kp)])
    }

    /// Load (or provision) `wallet` and register its keys with `signer`.
    pub async fn load_into(
        &self,
        signer: &LocalWallet,
        wallet: &str,
        now: i64,
    ) -> Result<Vec<Identity>, SigningError> {
        let mut out = Vec::new();
        for (identity, kp) in self.load_or_generate(wallet, now).await? {
            signer.insert_key(wallet, kp).await;
            out.push(identity);
        }
        Ok(out)
    }
}
