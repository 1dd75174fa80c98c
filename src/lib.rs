//! Cross-chain token swap protocol core.
//!
//! Two identical protocol instances run independently, one per chain,
//! communicating only through an external messaging relay. A swap converts
//! the user's input asset into the bridge asset on the source chain,
//! carries an authenticated instruction across as an opaque payload, and
//! executes the destination swap on arrival. When the destination leg
//! cannot complete, the relay invokes the revert path on the origin chain
//! and the original sender is refunded in the origin input token.
//!
//! The AMM router and the relay are external collaborators, modelled as
//! the [`amm::AmmRouter`] and [`connector::Connector`] traits; the hosting
//! runtime's caller identity, attached value and clock are threaded in
//! explicitly via [`types::CallContext`].

pub mod amm;
pub mod connector;
pub mod errors;
pub mod instance;
pub mod instruction;
pub mod ledger;
pub mod registry;
pub mod types;

pub use amm::{AmmRouter, RouterAdapter};
pub use connector::{Connector, OutboundTransfer};
pub use errors::{Result, SwapError};
pub use instance::{
    Delivery, InstanceConfig, NativeSendParams, Refund, SwapInstance, SwapSent, TokenSendParams,
};
pub use instruction::{OutboundInstruction, RevertContext};
pub use ledger::Ledger;
pub use registry::InteractorRegistry;
pub use types::{Address, Amount, CallContext, ChainId};
