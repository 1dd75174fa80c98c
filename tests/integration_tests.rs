//! End-to-end scenarios across two protocol instances joined by a
//! recording relay and constant-product mock routers.

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use multichain_swap::{
    Address, Amount, AmmRouter, CallContext, Connector, InstanceConfig, Ledger, NativeSendParams,
    OutboundTransfer, Result, SwapError, SwapInstance, TokenSendParams,
};

fn addr(n: u8) -> Address {
    let mut raw = [0u8; 20];
    raw[19] = n;
    Address(raw)
}

// One bridge asset, same id on both chains.
const ZETA: u8 = 0xbb;
const WNATIVE: u8 = 0xee;
// Chain A holds BUSD, chain B holds DAI.
const BUSD: u8 = 0x01;
const DAI: u8 = 0x02;

const OWNER: u8 = 0x0a;
const USER: u8 = 0x50;
const RECIPIENT: u8 = 0x60;

/// Constant-product pool router with the usual 0.3% fee; funds move on
/// the chain's ledger like they would through a real exchange.
struct PoolRouter {
    address: Address,
    weth: Address,
    // unordered pair -> oriented reserves for (low, high)
    pools: DashMap<(Address, Address), (Amount, Amount)>,
}

impl PoolRouter {
    fn new(address: Address, weth: Address) -> Self {
        Self {
            address,
            weth,
            pools: DashMap::new(),
        }
    }

    fn add_pool(&self, ledger: &Ledger, a: Address, b: Address, reserve_a: Amount, reserve_b: Amount) {
        let (key, reserves) = if a < b {
            ((a, b), (reserve_a, reserve_b))
        } else {
            ((b, a), (reserve_b, reserve_a))
        };
        ledger.mint(a, self.address, reserve_a).unwrap();
        ledger.mint(b, self.address, reserve_b).unwrap();
        self.pools.insert(key, reserves);
    }

    fn swap_hop(&self, token_in: Address, token_out: Address, amount_in: Amount) -> Result<Amount> {
        let key = if token_in < token_out {
            (token_in, token_out)
        } else {
            (token_out, token_in)
        };
        let mut pool = self
            .pools
            .get_mut(&key)
            .ok_or_else(|| SwapError::Router(format!("no pool for {token_in}/{token_out}")))?;
        let (reserve_low, reserve_high) = *pool;
        let (reserve_in, reserve_out) = if token_in == key.0 {
            (reserve_low, reserve_high)
        } else {
            (reserve_high, reserve_low)
        };
        let amount_in_with_fee = amount_in * 997;
        let out = (amount_in_with_fee * reserve_out) / (reserve_in * 1000 + amount_in_with_fee);
        let (new_low, new_high) = if token_in == key.0 {
            (reserve_low + amount_in, reserve_high - out)
        } else {
            (reserve_low - out, reserve_high + amount_in)
        };
        *pool = (new_low, new_high);
        Ok(out)
    }
}

impl AmmRouter for PoolRouter {
    fn weth(&self) -> Address {
        self.weth
    }

    fn get_amounts_out(
        &self,
        _ledger: &Ledger,
        amount_in: Amount,
        path: &[Address],
    ) -> Result<Vec<Amount>> {
        let mut amounts = vec![amount_in];
        for pair in path.windows(2) {
            let key = if pair[0] < pair[1] {
                (pair[0], pair[1])
            } else {
                (pair[1], pair[0])
            };
            let pool = self
                .pools
                .get(&key)
                .ok_or_else(|| SwapError::Router(format!("no pool for {}/{}", pair[0], pair[1])))?;
            let (reserve_low, reserve_high) = *pool;
            let (reserve_in, reserve_out) = if pair[0] == key.0 {
                (reserve_low, reserve_high)
            } else {
                (reserve_high, reserve_low)
            };
            let current = *amounts.last().unwrap();
            let with_fee = current * 997;
            amounts.push((with_fee * reserve_out) / (reserve_in * 1000 + with_fee));
        }
        Ok(amounts)
    }

    fn swap_exact_tokens_for_tokens(
        &self,
        ledger: &Ledger,
        from: Address,
        amount_in: Amount,
        amount_out_min: Amount,
        path: &[Address],
        to: Address,
        deadline: u64,
        now: u64,
    ) -> Result<Vec<Amount>> {
        if now > deadline {
            return Err(SwapError::DeadlineExpired { deadline, now });
        }
        // Quote first so a failing swap leaves the pools untouched.
        let amounts = self.get_amounts_out(ledger, amount_in, path)?;
        let out = *amounts.last().unwrap();
        if out < amount_out_min {
            return Err(SwapError::SlippageExceeded {
                realized: out,
                minimum: amount_out_min,
            });
        }
        let mut current = amount_in;
        for pair in path.windows(2) {
            current = self.swap_hop(pair[0], pair[1], current)?;
        }
        ledger.transfer(path[0], from, self.address, amount_in)?;
        ledger.transfer(*path.last().unwrap(), self.address, to, current)?;
        Ok(amounts)
    }

    fn add_liquidity_eth(
        &self,
        ledger: &Ledger,
        from: Address,
        token: Address,
        amount_token: Amount,
        _amount_token_min: Amount,
        amount_native_min: Amount,
        _to: Address,
        deadline: u64,
        now: u64,
    ) -> Result<(Amount, Amount, Amount)> {
        if now > deadline {
            return Err(SwapError::DeadlineExpired { deadline, now });
        }
        ledger.transfer(token, from, self.address, amount_token)?;
        ledger.transfer(self.weth, from, self.address, amount_native_min)?;
        Ok((amount_token, amount_native_min, amount_token))
    }
}

/// Records every outbound transfer so the test can replay it on the other
/// side; delivery itself is the relay's job, not the core's.
#[derive(Default)]
struct RecordingConnector {
    sent: Mutex<Vec<OutboundTransfer>>,
}

impl RecordingConnector {
    fn last(&self) -> OutboundTransfer {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

impl Connector for RecordingConnector {
    fn send(&self, transfer: OutboundTransfer) -> Result<()> {
        self.sent.lock().unwrap().push(transfer);
        Ok(())
    }
}

struct Chain {
    instance: SwapInstance<PoolRouter, Arc<RecordingConnector>>,
    connector: Arc<RecordingConnector>,
    connector_address: Address,
    ledger: Ledger,
}

/// Two chains with the bridge asset pooled against each chain's local
/// tokens, peered both ways.
fn setup() -> (Chain, Chain) {
    let ledger_a = Ledger::new();
    let ledger_b = Ledger::new();

    let router_a = PoolRouter::new(addr(0xd1), addr(WNATIVE));
    router_a.add_pool(&ledger_a, addr(BUSD), addr(ZETA), 1_000_000, 1_000_000);
    router_a.add_pool(&ledger_a, addr(WNATIVE), addr(ZETA), 1_000_000, 1_000_000);

    let router_b = PoolRouter::new(addr(0xd2), addr(WNATIVE));
    router_b.add_pool(&ledger_b, addr(ZETA), addr(DAI), 1_000_000, 1_000_000);

    let connector_a = Arc::new(RecordingConnector::default());
    let connector_b = Arc::new(RecordingConnector::default());

    let instance_a = SwapInstance::new(
        InstanceConfig {
            chain_id: 1,
            address: addr(0x1a),
            owner: addr(OWNER),
            connector: addr(0xc1),
            bridge_asset: addr(ZETA),
            cross_chain_gas: 18,
        },
        router_a,
        connector_a.clone(),
    )
    .unwrap();

    let instance_b = SwapInstance::new(
        InstanceConfig {
            chain_id: 2,
            address: addr(0x2b),
            owner: addr(OWNER),
            connector: addr(0xc2),
            bridge_asset: addr(ZETA),
            cross_chain_gas: 18,
        },
        router_b,
        connector_b.clone(),
    )
    .unwrap();

    let owner = CallContext::new(addr(OWNER), 0);
    instance_a
        .set_peer(&owner, 2, instance_b.config().address.encode())
        .unwrap();
    instance_b
        .set_peer(&owner, 1, instance_a.config().address.encode())
        .unwrap();

    (
        Chain {
            instance: instance_a,
            connector: connector_a,
            connector_address: addr(0xc1),
            ledger: ledger_a,
        },
        Chain {
            instance: instance_b,
            connector: connector_b,
            connector_address: addr(0xc2),
            ledger: ledger_b,
        },
    )
}

/// Moves a recorded transfer onto the destination chain the way the relay
/// would: value first, then the callback.
fn deliver(
    source: &Chain,
    dest: &Chain,
    origin_chain_id: u32,
    now: u64,
) -> Result<multichain_swap::Delivery> {
    let transfer = source.connector.last();
    dest.ledger
        .mint(addr(ZETA), dest.connector_address, transfer.bridge_amount)
        .unwrap();
    let ctx = CallContext::new(dest.connector_address, now);
    dest.instance.on_message(
        &ctx,
        &dest.ledger,
        origin_chain_id,
        &source.instance.config().address.encode(),
        transfer.bridge_amount,
        &transfer.payload,
    )
}

fn token_params(origin_input_token: Address, amount: Amount, min_out: Amount) -> TokenSendParams {
    TokenSendParams {
        origin_input_token,
        input_amount: amount,
        dest_address: addr(RECIPIENT).encode(),
        dest_out_token: addr(DAI),
        deliver_bridge_asset_only: false,
        min_out_amount: min_out,
        dest_chain_id: 2,
        deadline: 10_000,
    }
}

#[test]
fn test_bridge_asset_in_token_out_end_to_end() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 10_000).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    let sent = chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(ZETA), 10_000, 9_000))
        .unwrap();

    // Bridge asset in: the in-flight amount is exactly the input, no
    // AMM-induced loss on the source side.
    assert_eq!(sent.bridge_amount, 10_000);
    assert_eq!(chain_a.connector.last().bridge_amount, 10_000);

    let delivery = deliver(&chain_a, &chain_b, 1, 200).unwrap();
    assert_eq!(delivery.recipient, addr(RECIPIENT));
    assert_eq!(delivery.token, addr(DAI));
    assert!(delivery.amount >= 9_000);
    assert_eq!(
        chain_b.ledger.balance_of(addr(DAI), addr(RECIPIENT)),
        delivery.amount
    );
}

#[test]
fn test_unbound_destination_chain_rejected_with_zero_state_change() {
    let (chain_a, _chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 10_000).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    let mut params = token_params(addr(ZETA), 10_000, 0);
    // One greater than any bound id.
    params.dest_chain_id = 3;
    let err = chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, params)
        .unwrap_err();
    assert_eq!(err, SwapError::InvalidDestinationChainId(3));
    assert_eq!(chain_a.ledger.balance_of(addr(ZETA), addr(USER)), 10_000);
    assert!(chain_a.connector.sent.lock().unwrap().is_empty());
}

#[test]
fn test_expired_deadline_send_leaves_no_partial_state() {
    let (chain_a, _chain_b) = setup();
    chain_a.ledger.mint(addr(BUSD), addr(USER), 10_000).unwrap();

    // Deadline already behind the clock: the send must fail before any
    // balance is pulled from the caller.
    let ctx = CallContext::new(addr(USER), 20_000);
    let err = chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(BUSD), 10_000, 0))
        .unwrap_err();
    assert!(matches!(err, SwapError::DeadlineExpired { .. }));
    assert_eq!(chain_a.ledger.balance_of(addr(BUSD), addr(USER)), 10_000);
    assert!(chain_a.connector.sent.lock().unwrap().is_empty());
}

#[test]
fn test_destination_slippage_failure_then_revert_refund() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(BUSD), addr(USER), 10_000).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    // Min-out far above what the destination pool can yield.
    let sent = chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(BUSD), 10_000, 50_000))
        .unwrap();
    assert_eq!(chain_a.ledger.balance_of(addr(BUSD), addr(USER)), 0);
    let in_flight = sent.bridge_amount;

    let err = deliver(&chain_a, &chain_b, 1, 200).unwrap_err();
    assert!(matches!(err, SwapError::SlippageExceeded { .. }));
    // Failed delivery left the recipient untouched.
    assert_eq!(chain_b.ledger.balance_of(addr(DAI), addr(RECIPIENT)), 0);

    // The relay returns the in-flight value to the origin chain and
    // invokes the revert callback with the original instruction.
    let transfer = chain_a.connector.last();
    chain_a
        .ledger
        .mint(addr(ZETA), chain_a.connector_address, in_flight)
        .unwrap();
    let relay = CallContext::new(chain_a.connector_address, 300);
    let refund = chain_a
        .instance
        .on_revert(
            &relay,
            &chain_a.ledger,
            &chain_a.instance.config().address.encode(),
            1,
            2,
            &addr(RECIPIENT).encode(),
            in_flight,
            18,
            &transfer.payload,
        )
        .unwrap();

    assert_eq!(refund.refunded_to, addr(USER));
    assert_eq!(refund.token, addr(BUSD));
    // Refund is the AMM-realized value at reversal time, not the original
    // face value: two pool crossings cost fees.
    assert_eq!(
        chain_a.ledger.balance_of(addr(BUSD), addr(USER)),
        refund.amount
    );
    assert!(refund.amount > 0);
    assert!(refund.amount < 10_000);
}

#[test]
fn test_native_send_end_to_end() {
    let (chain_a, chain_b) = setup();
    chain_a
        .ledger
        .mint(addr(WNATIVE), addr(USER), 5_000)
        .unwrap();

    let ctx = CallContext::new(addr(USER), 100).with_value(5_000);
    let sent = chain_a
        .instance
        .send_from_native(
            &ctx,
            &chain_a.ledger,
            NativeSendParams {
                dest_address: addr(RECIPIENT).encode(),
                dest_out_token: addr(DAI),
                deliver_bridge_asset_only: false,
                min_out_amount: 1,
                dest_chain_id: 2,
                deadline: 10_000,
            },
        )
        .unwrap();
    // Native went through the wrapped-native/bridge pool first.
    assert!(sent.bridge_amount > 0);
    assert!(sent.bridge_amount < 5_000);
    assert_eq!(sent.instruction.origin_input_token, addr(WNATIVE));

    let delivery = deliver(&chain_a, &chain_b, 1, 200).unwrap();
    assert_eq!(
        chain_b.ledger.balance_of(addr(DAI), addr(RECIPIENT)),
        delivery.amount
    );
}

#[test]
fn test_deliver_bridge_asset_only_skips_destination_swap() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 2_500).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    let mut params = token_params(addr(ZETA), 2_500, 0);
    params.deliver_bridge_asset_only = true;
    chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, params)
        .unwrap();

    let delivery = deliver(&chain_a, &chain_b, 1, 200).unwrap();
    assert_eq!(delivery.token, addr(ZETA));
    assert_eq!(delivery.amount, 2_500);
    assert_eq!(chain_b.ledger.balance_of(addr(ZETA), addr(RECIPIENT)), 2_500);
}

#[test]
fn test_inbound_rejects_spoofed_origin_sender() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 1_000).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(ZETA), 1_000, 0))
        .unwrap();
    let transfer = chain_a.connector.last();

    // Authentic payload, spoofed origin sender.
    let relay = CallContext::new(chain_b.connector_address, 200);
    let err = chain_b
        .instance
        .on_message(
            &relay,
            &chain_b.ledger,
            1,
            &addr(0x99).encode(),
            transfer.bridge_amount,
            &transfer.payload,
        )
        .unwrap_err();
    assert_eq!(err, SwapError::InvalidZetaMessageCall(1));
}

#[test]
fn test_out_of_order_operations_are_independent() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 3_000).unwrap();

    let ctx = CallContext::new(addr(USER), 100);
    chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(ZETA), 1_000, 0))
        .unwrap();
    let first = chain_a.connector.last();
    chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, token_params(addr(ZETA), 2_000, 0))
        .unwrap();
    let second = chain_a.connector.last();

    // The relay makes no ordering promise across operations; each
    // instruction is self-contained, so delivering the later send first
    // must work.
    let peer = chain_a.instance.config().address.encode();
    for transfer in [second, first] {
        chain_b
            .ledger
            .mint(addr(ZETA), chain_b.connector_address, transfer.bridge_amount)
            .unwrap();
        let relay = CallContext::new(chain_b.connector_address, 200);
        chain_b
            .instance
            .on_message(
                &relay,
                &chain_b.ledger,
                1,
                &peer,
                transfer.bridge_amount,
                &transfer.payload,
            )
            .unwrap();
    }
    assert!(chain_b.ledger.balance_of(addr(DAI), addr(RECIPIENT)) > 0);
}

#[test]
fn test_round_tripping_same_asset_is_permitted() {
    let (chain_a, chain_b) = setup();
    chain_a.ledger.mint(addr(ZETA), addr(USER), 1_000).unwrap();

    // Destination out token equal to the bridge asset: delivered directly,
    // no destination pool required.
    let ctx = CallContext::new(addr(USER), 100);
    let mut params = token_params(addr(ZETA), 1_000, 0);
    params.dest_out_token = addr(ZETA);
    chain_a
        .instance
        .send_from_token(&ctx, &chain_a.ledger, params)
        .unwrap();

    let delivery = deliver(&chain_a, &chain_b, 1, 200).unwrap();
    assert_eq!(delivery.token, addr(ZETA));
    assert_eq!(delivery.amount, 1_000);
}
