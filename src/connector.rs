//! Messaging relay collaborator interface.
//!
//! Delivery, ordering and retry of the underlying message are entirely the
//! relay's responsibility. The core treats it as an already-reliable
//! at-least-once one-way channel: this module is the outbound half, and the
//! inbound half is the pair of callbacks on the instance.

use crate::errors::Result;
use crate::types::{Amount, ChainId};
use serde::{Deserialize, Serialize};

/// One outbound cross-chain transfer handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundTransfer {
    pub dest_chain_id: ChainId,
    /// Peer instance the payload is addressed to, chain-agnostic encoding.
    pub dest_contract: Vec<u8>,
    /// Encoded instruction, opaque to the relay.
    pub payload: Vec<u8>,
    /// Bridge-asset units carried with the message.
    pub bridge_amount: Amount,
    /// Gas budget for the destination leg.
    pub gas_limit: Amount,
}

/// Outbound send primitive of the relay.
pub trait Connector {
    fn send(&self, transfer: OutboundTransfer) -> Result<()>;
}

impl<C: Connector + ?Sized> Connector for std::sync::Arc<C> {
    fn send(&self, transfer: OutboundTransfer) -> Result<()> {
        (**self).send(transfer)
    }
}
