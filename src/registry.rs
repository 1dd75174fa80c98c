//! Per-chain table of trusted peer instances.

use crate::errors::{Result, SwapError};
use crate::types::{Address, CallContext, ChainId};
use dashmap::DashMap;
use tracing::info;

/// Registry of trusted counterpart instances, keyed by chain id.
///
/// Lookups here are the sole authorization gate for inbound messages. An
/// unset chain id is indistinguishable from "not a trusted peer": both
/// read back as the zero-length encoding.
#[derive(Debug)]
pub struct InteractorRegistry {
    owner: Address,
    peers: DashMap<ChainId, Vec<u8>>,
}

impl InteractorRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            peers: DashMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Binds `encoded_address` as the trusted peer for `chain_id`,
    /// overwriting any existing binding. Owner only.
    pub fn set_peer(
        &self,
        ctx: &CallContext,
        chain_id: ChainId,
        encoded_address: Vec<u8>,
    ) -> Result<()> {
        if ctx.caller != self.owner {
            return Err(SwapError::CallerNotOwner(ctx.caller));
        }
        info!(
            chain_id,
            peer = %hex::encode(&encoded_address),
            "peer binding updated"
        );
        self.peers.insert(chain_id, encoded_address);
        Ok(())
    }

    /// Returns the bound peer encoding, empty when unset.
    pub fn peer_of(&self, chain_id: ChainId) -> Vec<u8> {
        self.peers
            .get(&chain_id)
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Whether `candidate` is the trusted peer for `chain_id`. Always
    /// false for an unbound chain.
    pub fn is_peer(&self, chain_id: ChainId, candidate: &[u8]) -> bool {
        let bound = self.peer_of(chain_id);
        !bound.is_empty() && bound == candidate
    }
}
