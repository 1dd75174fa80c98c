//! Cross-chain instruction payload and its wire encoding.
//!
//! The instruction is built once on the source chain, carried by the relay
//! as an opaque byte blob, and decoded only by the destination instance.
//! Source and destination may be built independently, so the encoding is a
//! fixed, versioned layout rather than a serializer's implementation
//! detail. A payload that fails to decode is a malformed-instruction
//! failure, never an authorization failure.

use crate::errors::{Result, SwapError};
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Current wire format version tag.
pub const WIRE_VERSION: u8 = 1;

/// The destination-swap instruction carried across chains.
///
/// Immutable once sent. `dest_address` is a chain-agnostic byte string
/// because origin and destination chains may use different address formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundInstruction {
    pub dest_address: Vec<u8>,
    pub dest_out_token: Address,
    /// Deliver the bridge asset itself, skipping the destination swap.
    pub deliver_bridge_asset_only: bool,
    /// Slippage floor for the destination swap.
    pub min_out_amount: Amount,
    pub source_sender: Address,
    /// Gas budget forwarded to the relay for the destination leg.
    pub cross_chain_gas: Amount,
    /// Token the origin sender paid in; the revert path refunds in it.
    pub origin_input_token: Address,
    /// Unix-seconds bound on the validity of any AMM swap step.
    pub deadline: u64,
}

impl OutboundInstruction {
    /// Serializes to the versioned wire layout:
    ///
    /// ```text
    /// offset  size  field
    /// 0       1     version (currently 1)
    /// 1       2     dest_address length N (u16 BE)
    /// 3       N     dest_address bytes
    /// 3+N     20    dest_out_token
    /// 23+N    1     deliver_bridge_asset_only (0 or 1)
    /// 24+N    16    min_out_amount (u128 BE)
    /// 40+N    20    source_sender
    /// 60+N    16    cross_chain_gas (u128 BE)
    /// 76+N    20    origin_input_token
    /// 96+N    8     deadline (u64 BE)
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.dest_address.len() > u16::MAX as usize {
            return Err(malformed("destination address exceeds length-prefix range"));
        }
        let mut out = Vec::with_capacity(104 + self.dest_address.len());
        out.push(WIRE_VERSION);
        out.extend_from_slice(&(self.dest_address.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.dest_address);
        out.extend_from_slice(&self.dest_out_token.0);
        out.push(self.deliver_bridge_asset_only as u8);
        out.extend_from_slice(&self.min_out_amount.to_be_bytes());
        out.extend_from_slice(&self.source_sender.0);
        out.extend_from_slice(&self.cross_chain_gas.to_be_bytes());
        out.extend_from_slice(&self.origin_input_token.0);
        out.extend_from_slice(&self.deadline.to_be_bytes());
        Ok(out)
    }

    /// Decodes a wire payload. Rejects unknown versions, out-of-range flag
    /// bytes, truncated input and trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let version = reader.u8()?;
        if version != WIRE_VERSION {
            return Err(malformed(format!("unknown wire version {version}")));
        }
        let len = reader.u16()? as usize;
        let dest_address = reader.take(len)?.to_vec();
        let dest_out_token = Address(reader.array()?);
        let deliver_bridge_asset_only = match reader.u8()? {
            0 => false,
            1 => true,
            other => return Err(malformed(format!("invalid delivery flag {other}"))),
        };
        let min_out_amount = reader.u128()?;
        let source_sender = Address(reader.array()?);
        let cross_chain_gas = reader.u128()?;
        let origin_input_token = Address(reader.array()?);
        let deadline = reader.u64()?;
        reader.finish()?;

        Ok(Self {
            dest_address,
            dest_out_token,
            deliver_bridge_asset_only,
            min_out_amount,
            source_sender,
            cross_chain_gas,
            origin_input_token,
            deadline,
        })
    }
}

/// Decoded view of a failed operation carried back by the relay: the
/// original instruction plus the bridge-asset amount that was in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevertContext {
    pub instruction: OutboundInstruction,
    pub bridge_amount_returned: Amount,
}

impl RevertContext {
    pub fn from_payload(payload: &[u8], bridge_amount_returned: Amount) -> Result<Self> {
        Ok(Self {
            instruction: OutboundInstruction::decode(payload)?,
            bridge_amount_returned,
        })
    }
}

/// Deterministic payload id used for logs and event correlation; never
/// used for correctness.
pub fn payload_id(payload: &[u8]) -> Vec<u8> {
    blake3::hash(payload).as_bytes().to_vec()
}

fn malformed(msg: impl Into<String>) -> SwapError {
    SwapError::MalformedInstruction(msg.into())
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < n {
            return Err(malformed("truncated payload"));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    fn u128(&mut self) -> Result<u128> {
        Ok(u128::from_be_bytes(self.array()?))
    }

    fn finish(self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(malformed("trailing bytes after instruction"));
        }
        Ok(())
    }
}
