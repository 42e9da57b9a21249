//! Local identity model: an address this node can sign for and that can
//! follow channels.

use serde::{Deserialize, Serialize};

use super::IdentityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: IdentityId,

    /// Wallet holding the identity's signing key
    pub wallet: String,

    pub address: String,
}
