//! AMM router collaborator interface and the bridge-asset router adapter.

use crate::errors::{Result, SwapError};
use crate::ledger::Ledger;
use crate::types::{Address, Amount};
use tracing::debug;

/// Constant-product exchange the protocol routes swaps through. The
/// exchange itself is external; the core only relies on the exact-input
/// swap, `weth()` and path construction, but instances are deployed
/// against the full surface.
pub trait AmmRouter {
    /// Wrapped-native token the router quotes native currency as.
    fn weth(&self) -> Address;

    /// Quotes the amounts along `path` for an exact input, without moving
    /// any balance.
    fn get_amounts_out(
        &self,
        ledger: &Ledger,
        amount_in: Amount,
        path: &[Address],
    ) -> Result<Vec<Amount>>;

    /// Exact-input swap along `path` paid by `from`, delivering the final
    /// output to `to`. Fails when the realized output is below
    /// `amount_out_min` or `now` is past `deadline`.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<Vec<Amount>>;

    /// Adds liquidity against native currency, returning the token amount,
    /// native amount and liquidity units actually deposited.
    #[allow(clippy::too_many_arguments)]
    fn add_liquidity_eth(
        &self,
        ledger: &Ledger,
        from: Address,
        token: Address,
        amount_token: Amount,
        amount_token_min: Amount,
        amount_native_min: Amount,
        to: Address,
        deadline: u64,
        now: u64,
    ) -> Result<(Amount, Amount, Amount)>;
}

impl<R: AmmRouter + ?Sized> AmmRouter for std::sync::Arc<R> {
    fn weth(&self) -> Address {
        (**self).weth()
    }

    fn get_amounts_out(
        &self,
        ledger: &Ledger,
        amount_in: Amount,
        path: &[Address],
    ) -> Result<Vec<Amount>> {
        (**self).get_amounts_out(ledger, amount_in, path)
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
        (**self).swap_exact_tokens_for_tokens(
            ledger,
            from,
            amount_in,
            amount_out_min,
            path,
            to,
            deadline,
            now,
        )
    }

    fn add_liquidity_eth(
        &self,
        ledger: &Ledger,
        from: Address,
        token: Address,
        amount_token: Amount,
        amount_token_min: Amount,
        amount_native_min: Amount,
        to: Address,
        deadline: u64,
        now: u64,
    ) -> Result<(Amount, Amount, Amount)> {
        (**self).add_liquidity_eth(
            ledger,
            from,
            token,
            amount_token,
            amount_token_min,
            amount_native_min,
            to,
            deadline,
            now,
        )
    }
}

/// Routes swaps between arbitrary tokens and the bridge asset.
///
/// The bridge-asset-to-itself case is short-circuited away from the AMM:
/// no such pool may exist, and the amount must move without slippage. The
/// adapter holds no balance between calls; it operates on amounts already
/// sitting with `from` for the duration of one call.
#[derive(Debug)]
pub struct RouterAdapter<R> {
    router: R,
    bridge_asset: Address,
}

impl<R: AmmRouter> RouterAdapter<R> {
    pub fn new(router: R, bridge_asset: Address) -> Self {
        Self {
            router,
            bridge_asset,
        }
    }

    pub fn bridge_asset(&self) -> Address {
        self.bridge_asset
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    /// Swaps `amount_in` of `token_in` held by `from` into `token_out`
    /// delivered to `recipient`, returning the realized output.
    ///
    /// When `token_in == token_out` the AMM is skipped entirely: the
    /// amount moves as-is and `min_out` does not apply.
    #[allow(clippy::too_many_arguments)]
    pub fn swap_exact_input(
        &self,
        ledger: &Ledger,
        from: Address,
        token_in: Address,
        token_out: Address,
        amount_in: Amount,
        min_out: Amount,
        recipient: Address,
        deadline: u64,
        now: u64,
    ) -> Result<Amount> {
        if now > deadline {
            return Err(SwapError::DeadlineExpired { deadline, now });
        }
        if token_in == token_out {
            ledger.transfer(token_in, from, recipient, amount_in)?;
            return Ok(amount_in);
        }
        let path = self.path(token_in, token_out);
        let amounts = self.router.swap_exact_tokens_for_tokens(
            ledger, from, amount_in, min_out, &path, recipient, deadline, now,
        )?;
        let realized = amounts.last().copied().unwrap_or(0);
        if realized < min_out {
            return Err(SwapError::SlippageExceeded {
                realized,
                minimum: min_out,
            });
        }
        debug!(
            token_in = %token_in,
            token_out = %token_out,
            amount_in,
            realized,
            "routed swap through bridge asset"
        );
        Ok(realized)
    }

    /// Builds the swap path through the bridge asset; two hops when one
    /// side already is the bridge asset.
    fn path(&self, token_in: Address, token_out: Address) -> Vec<Address> {
        if token_in == self.bridge_asset || token_out == self.bridge_asset {
            vec![token_in, token_out]
        } else {
            vec![token_in, self.bridge_asset, token_out]
        }
    }
}
