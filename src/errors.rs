//! Error taxonomy for the swap protocol core.

use crate::types::{Address, Amount, ChainId};
use thiserror::Error;

/// Every failure is fatal to the triggering call: the enclosing operation
/// is abandoned with no partial state change, and any retry happens outside
/// the core (the relay re-delivers, or the revert path refunds).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SwapError {
    #[error("no peer registered for destination chain {0}")]
    InvalidDestinationChainId(ChainId),

    #[error("origin input token address is missing")]
    MissingOriginInputTokenAddress,

    #[error("destination output token address is missing")]
    OutTokenInvariant,

    #[error("caller {0} is not the connector")]
    InvalidCaller(Address),

    #[error("origin sender is not the registered peer for chain {0}")]
    InvalidZetaMessageCall(ChainId),

    #[error("caller {0} is not the owner")]
    CallerNotOwner(Address),

    #[error("swap yielded {realized} which is below the minimum {minimum}")]
    SlippageExceeded { realized: Amount, minimum: Amount },

    #[error("deadline {deadline} has passed (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("malformed instruction payload: {0}")]
    MalformedInstruction(String),

    #[error("insufficient balance of token {token} for {holder}: have {available}, need {required}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        available: Amount,
        required: Amount,
    },

    #[error("balance overflow for token {token} at {holder}")]
    BalanceOverflow { token: Address, holder: Address },

    #[error("invalid instance configuration: {0}")]
    InvalidConfiguration(String),

    #[error("AMM router error: {0}")]
    Router(String),

    #[error("connector send failed: {0}")]
    Connector(String),
}

pub type Result<T> = std::result::Result<T, SwapError>;
