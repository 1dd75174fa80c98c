//! Shared primitive types for the swap protocol.

use serde::{Deserialize, Serialize};

/// Protocol-assigned chain identifier.
///
/// These are small integers assigned out-of-band by the protocol operators,
/// not necessarily the chains' own consensus identifiers. A pairing only
/// works when both sides register the same ids.
pub type ChainId = u32;

/// Token amount in the token's smallest unit.
pub type Amount = u128;

/// A 20-byte chain-local account or token identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The absent/zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Chain-agnostic byte-string form used in cross-chain payloads.
    pub fn encode(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Decodes a cross-chain byte string back into a local address.
    /// Returns `None` when the encoding is not exactly 20 bytes.
    pub fn decode(bytes: &[u8]) -> Option<Address> {
        let raw: [u8; 20] = bytes.try_into().ok()?;
        Some(Address(raw))
    }
}

impl From<[u8; 20]> for Address {
    fn from(raw: [u8; 20]) -> Self {
        Address(raw)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Call environment threaded into every entry point by the hosting runtime:
/// caller identity, attached native value, and the current time in unix
/// seconds. Caller identity is explicit rather than ambient so that the
/// authorization checks are visible at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub value: Amount,
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self {
            caller,
            value: 0,
            now,
        }
    }

    /// Attaches native currency to the call.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}
