//! One deployed protocol endpoint.
//!
//! Two identical instances run independently, one per chain. The source
//! instance converts the user's input into the bridge asset and hands an
//! encoded instruction to the relay; the destination instance validates
//! the instruction on arrival and executes the destination swap; the
//! origin instance refunds the sender when the relay reports that the
//! destination leg could not complete.

use crate::amm::{AmmRouter, RouterAdapter};
use crate::connector::{Connector, OutboundTransfer};
use crate::errors::{Result, SwapError};
use crate::instruction::{payload_id, OutboundInstruction, RevertContext};
use crate::ledger::Ledger;
use crate::registry::InteractorRegistry;
use crate::types::{Address, Amount, CallContext, ChainId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Deployment parameters of one protocol instance, fixed for its lifetime.
/// Only the peer registry mutates after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    pub chain_id: ChainId,
    /// The instance's own chain-local identity.
    pub address: Address,
    pub owner: Address,
    /// Relay contract; the only identity allowed to invoke the inbound
    /// entry points.
    pub connector: Address,
    pub bridge_asset: Address,
    /// Gas budget attached to every outbound message.
    pub cross_chain_gas: Amount,
}

impl InstanceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address.is_zero() {
            return Err(SwapError::InvalidConfiguration(
                "instance address must be set".to_string(),
            ));
        }
        if self.owner.is_zero() {
            return Err(SwapError::InvalidConfiguration(
                "owner address must be set".to_string(),
            ));
        }
        if self.connector.is_zero() {
            return Err(SwapError::InvalidConfiguration(
                "connector address must be set".to_string(),
            ));
        }
        if self.bridge_asset.is_zero() {
            return Err(SwapError::InvalidConfiguration(
                "bridge asset address must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Arguments for a send paid in native currency; the amount is the value
/// attached to the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeSendParams {
    pub dest_address: Vec<u8>,
    pub dest_out_token: Address,
    pub deliver_bridge_asset_only: bool,
    pub min_out_amount: Amount,
    pub dest_chain_id: ChainId,
    pub deadline: u64,
}

/// Arguments for a send paid in a token the caller has approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSendParams {
    pub origin_input_token: Address,
    pub input_amount: Amount,
    pub dest_address: Vec<u8>,
    pub dest_out_token: Address,
    pub deliver_bridge_asset_only: bool,
    pub min_out_amount: Amount,
    pub dest_chain_id: ChainId,
    pub deadline: u64,
}

/// Result of an accepted send; observability only, correctness never
/// depends on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapSent {
    pub message_id: Vec<u8>,
    pub dest_chain_id: ChainId,
    pub bridge_amount: Amount,
    pub instruction: OutboundInstruction,
}

/// Outcome of a delivered inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub message_id: Vec<u8>,
    pub recipient: Address,
    pub token: Address,
    pub amount: Amount,
}

/// Outcome of a revert refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub message_id: Vec<u8>,
    pub refunded_to: Address,
    pub token: Address,
    pub amount: Amount,
}

/// A protocol instance bound to one chain's router and relay.
#[derive(Debug)]
pub struct SwapInstance<R, C> {
    config: InstanceConfig,
    registry: InteractorRegistry,
    adapter: RouterAdapter<R>,
    connector: C,
    wrapped_native: Address,
}

impl<R: AmmRouter, C: Connector> SwapInstance<R, C> {
    pub fn new(config: InstanceConfig, router: R, connector: C) -> Result<Self> {
        config.validate()?;
        let wrapped_native = router.weth();
        info!(
            chain_id = config.chain_id,
            address = %config.address,
            bridge_asset = %config.bridge_asset,
            "swap instance created"
        );
        Ok(Self {
            registry: InteractorRegistry::new(config.owner),
            adapter: RouterAdapter::new(router, config.bridge_asset),
            config,
            connector,
            wrapped_native,
        })
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    pub fn registry(&self) -> &InteractorRegistry {
        &self.registry
    }

    /// Binds the trusted peer instance for `chain_id`. Owner only.
    pub fn set_peer(
        &self,
        ctx: &CallContext,
        chain_id: ChainId,
        encoded_address: Vec<u8>,
    ) -> Result<()> {
        self.registry.set_peer(ctx, chain_id, encoded_address)
    }

    /// Initiates a cross-chain swap paid in native currency. The attached
    /// value is wrapped and converted to the bridge asset before dispatch.
    pub fn send_from_native(
        &self,
        ctx: &CallContext,
        ledger: &Ledger,
        params: NativeSendParams,
    ) -> Result<SwapSent> {
        let peer = self.require_peer(params.dest_chain_id)?;
        if params.dest_out_token.is_zero() {
            return Err(SwapError::OutTokenInvariant);
        }
        // Checked before any balance moves; an expired deadline would
        // otherwise surface inside the swap with the value already pulled.
        if ctx.now > params.deadline {
            return Err(SwapError::DeadlineExpired {
                deadline: params.deadline,
                now: ctx.now,
            });
        }

        ledger.transfer(
            self.wrapped_native,
            ctx.caller,
            self.config.address,
            ctx.value,
        )?;
        // The source-side conversion has no slippage floor of its own; the
        // instruction's minimum protects the destination swap.
        let bridge_amount = self.adapter.swap_exact_input(
            ledger,
            self.config.address,
            self.wrapped_native,
            self.config.bridge_asset,
            ctx.value,
            0,
            self.config.address,
            params.deadline,
            ctx.now,
        )?;

        self.dispatch(
            ledger,
            peer,
            params.dest_chain_id,
            OutboundInstruction {
                dest_address: params.dest_address,
                dest_out_token: params.dest_out_token,
                deliver_bridge_asset_only: params.deliver_bridge_asset_only,
                min_out_amount: params.min_out_amount,
                source_sender: ctx.caller,
                cross_chain_gas: self.config.cross_chain_gas,
                origin_input_token: self.wrapped_native,
                deadline: params.deadline,
            },
            bridge_amount,
        )
    }

    /// Initiates a cross-chain swap paid in `origin_input_token`, pulled
    /// from the caller. All argument checks pass before any balance moves;
    /// the out-token invariant is enforced even when the input already is
    /// the bridge asset, because the destination still needs a concrete
    /// output token.
    pub fn send_from_token(
        &self,
        ctx: &CallContext,
        ledger: &Ledger,
        params: TokenSendParams,
    ) -> Result<SwapSent> {
        let peer = self.require_peer(params.dest_chain_id)?;
        if params.origin_input_token.is_zero() {
            return Err(SwapError::MissingOriginInputTokenAddress);
        }
        if params.dest_out_token.is_zero() {
            return Err(SwapError::OutTokenInvariant);
        }
        if ctx.now > params.deadline {
            return Err(SwapError::DeadlineExpired {
                deadline: params.deadline,
                now: ctx.now,
            });
        }

        ledger.transfer(
            params.origin_input_token,
            ctx.caller,
            self.config.address,
            params.input_amount,
        )?;
        let bridge_amount = if params.origin_input_token == self.config.bridge_asset {
            // Already the bridge asset: forwarded exactly, never routed
            // through the AMM.
            params.input_amount
        } else {
            self.adapter.swap_exact_input(
                ledger,
                self.config.address,
                params.origin_input_token,
                self.config.bridge_asset,
                params.input_amount,
                0,
                self.config.address,
                params.deadline,
                ctx.now,
            )?
        };

        self.dispatch(
            ledger,
            peer,
            params.dest_chain_id,
            OutboundInstruction {
                dest_address: params.dest_address,
                dest_out_token: params.dest_out_token,
                deliver_bridge_asset_only: params.deliver_bridge_asset_only,
                min_out_amount: params.min_out_amount,
                source_sender: ctx.caller,
                cross_chain_gas: self.config.cross_chain_gas,
                origin_input_token: params.origin_input_token,
                deadline: params.deadline,
            },
            bridge_amount,
        )
    }

    /// Executes an instruction delivered by the relay. Relay only; the
    /// declared origin sender must be the registered peer for the origin
    /// chain. The registry is the sole trust boundary here.
    pub fn on_message(
        &self,
        ctx: &CallContext,
        ledger: &Ledger,
        origin_chain_id: ChainId,
        origin_sender: &[u8],
        bridge_amount: Amount,
        payload: &[u8],
    ) -> Result<Delivery> {
        if ctx.caller != self.config.connector {
            return Err(SwapError::InvalidCaller(ctx.caller));
        }
        if !self.registry.is_peer(origin_chain_id, origin_sender) {
            return Err(SwapError::InvalidZetaMessageCall(origin_chain_id));
        }
        let instruction = OutboundInstruction::decode(payload)?;
        let recipient = Address::decode(&instruction.dest_address).ok_or_else(|| {
            SwapError::MalformedInstruction(
                "destination address is not a local 20-byte address".to_string(),
            )
        })?;
        let message_id = payload_id(payload);

        // The in-flight bridge-asset units arrive with the call and move
        // straight from the relay's balance, so a failed delivery leaves
        // the destination ledger untouched and the value with the relay.
        let (token, amount) = if instruction.deliver_bridge_asset_only
            || instruction.dest_out_token == self.config.bridge_asset
        {
            ledger.transfer(
                self.config.bridge_asset,
                ctx.caller,
                recipient,
                bridge_amount,
            )?;
            (self.config.bridge_asset, bridge_amount)
        } else {
            // A slippage or deadline failure here propagates to the relay
            // as a failed delivery, which triggers the revert path on the
            // origin chain.
            let out = self.adapter.swap_exact_input(
                ledger,
                ctx.caller,
                self.config.bridge_asset,
                instruction.dest_out_token,
                bridge_amount,
                instruction.min_out_amount,
                recipient,
                instruction.deadline,
                ctx.now,
            )?;
            (instruction.dest_out_token, out)
        };

        info!(
            message_id = %hex::encode(&message_id),
            origin_chain_id,
            recipient = %recipient,
            token = %token,
            amount,
            "inbound swap delivered"
        );
        Ok(Delivery {
            message_id,
            recipient,
            token,
            amount,
        })
    }

    /// Compensating action invoked by the relay on the origin chain when
    /// the destination leg could not complete: the returned bridge-asset
    /// units are converted back into the origin input token and credited
    /// to the original sender. The refund takes whatever rate the AMM
    /// gives at reversal time; there is no face-value guarantee.
    #[allow(clippy::too_many_arguments)]
    pub fn on_revert(
        &self,
        ctx: &CallContext,
        ledger: &Ledger,
        origin_sender: &[u8],
        source_chain_id: ChainId,
        dest_chain_id: ChainId,
        dest_address: &[u8],
        bridge_amount_returned: Amount,
        gas_amount: Amount,
        payload: &[u8],
    ) -> Result<Refund> {
        if ctx.caller != self.config.connector {
            return Err(SwapError::InvalidCaller(ctx.caller));
        }
        let context = RevertContext::from_payload(payload, bridge_amount_returned)?;
        let instruction = &context.instruction;
        let refund_to = instruction.source_sender;
        let message_id = payload_id(payload);
        debug!(
            origin_sender = %hex::encode(origin_sender),
            dest_address = %hex::encode(dest_address),
            gas_amount,
            "revert context received"
        );

        let (token, amount) = if instruction.origin_input_token == self.config.bridge_asset {
            ledger.transfer(
                self.config.bridge_asset,
                ctx.caller,
                refund_to,
                bridge_amount_returned,
            )?;
            (self.config.bridge_asset, bridge_amount_returned)
        } else {
            // No minimum and no deadline bound on the refund swap: the
            // original deadline may already have passed by reversal time.
            let out = self.adapter.swap_exact_input(
                ledger,
                ctx.caller,
                self.config.bridge_asset,
                instruction.origin_input_token,
                bridge_amount_returned,
                0,
                refund_to,
                u64::MAX,
                ctx.now,
            )?;
            (instruction.origin_input_token, out)
        };

        warn!(
            message_id = %hex::encode(&message_id),
            source_chain_id,
            dest_chain_id,
            refund_to = %refund_to,
            token = %token,
            amount,
            "swap reverted, origin sender refunded"
        );
        Ok(Refund {
            message_id,
            refunded_to: refund_to,
            token,
            amount,
        })
    }

    fn require_peer(&self, chain_id: ChainId) -> Result<Vec<u8>> {
        let peer = self.registry.peer_of(chain_id);
        if peer.is_empty() {
            return Err(SwapError::InvalidDestinationChainId(chain_id));
        }
        Ok(peer)
    }

    /// Common tail of both send entry points: encode the instruction, fire
    /// the send primitive and move the bridge-asset value to the relay.
    fn dispatch(
        &self,
        ledger: &Ledger,
        peer: Vec<u8>,
        dest_chain_id: ChainId,
        instruction: OutboundInstruction,
        bridge_amount: Amount,
    ) -> Result<SwapSent> {
        let payload = instruction.encode()?;
        let message_id = payload_id(&payload);
        self.connector.send(OutboundTransfer {
            dest_chain_id,
            dest_contract: peer,
            payload,
            bridge_amount,
            gas_limit: self.config.cross_chain_gas,
        })?;
        // Value follows the accepted message; a send the relay rejects
        // leaves the ledger untouched.
        ledger.transfer(
            self.config.bridge_asset,
            self.config.address,
            self.config.connector,
            bridge_amount,
        )?;
        info!(
            message_id = %hex::encode(&message_id),
            dest_chain_id,
            bridge_amount,
            sender = %instruction.source_sender,
            "swap sent"
        );
        Ok(SwapSent {
            message_id,
            dest_chain_id,
            bridge_amount,
            instruction,
        })
    }
}
