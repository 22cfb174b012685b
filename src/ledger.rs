//! Custody: per-user cash balances and per-user, per-symbol share portfolios.
//!
//! Keyed through `BTreeMap` rather than a hash map so that diagnostic
//! iteration (`Exchange::print_market_summary`, `Exchange::verify_conservation`)
//! is reproducible across runs, even though no single `Ledger` operation
//! itself requires ordered iteration.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::types::{Cash, Quantity, SymbolId, UserId};

/// Holds every user's cash balance and share portfolio.
///
/// Zero share entries are pruned rather than kept at `0`, so `get_portfolio`
/// never returns a symbol mapped to `0`.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: BTreeMap<UserId, Cash>,
    portfolios: BTreeMap<UserId, BTreeMap<SymbolId, Quantity>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new user with an initial cash balance.
    pub fn add_user(&mut self, id: UserId, initial_balance: Cash) -> ExchangeResult<()> {
        if self.balances.contains_key(&id) {
            return Err(ExchangeError::DuplicateUser(id));
        }
        self.balances.insert(id, initial_balance);
        self.portfolios.insert(id, BTreeMap::new());
        debug!(user = id, balance = initial_balance, "user added");
        Ok(())
    }

    pub fn user_exists(&self, id: UserId) -> bool {
        self.balances.contains_key(&id)
    }

    pub fn get_balance(&self, id: UserId) -> ExchangeResult<Cash> {
        self.balances
            .get(&id)
            .copied()
            .ok_or(ExchangeError::UnknownUser(id))
    }

    /// Returns a snapshot copy of `id`'s portfolio. Mutating it does not
    /// affect the ledger.
    pub fn get_portfolio(&self, id: UserId) -> ExchangeResult<BTreeMap<SymbolId, Quantity>> {
        self.portfolios
            .get(&id)
            .cloned()
            .ok_or(ExchangeError::UnknownUser(id))
    }

    /// `0` for an unknown symbol in an otherwise-known user's portfolio, or
    /// for an unknown user — callers that need existence checking should call
    /// [`Self::user_exists`] first. Used internally by the matching engine's
    /// hot path, where allocating an error for "no shares of this symbol" at
    /// every re-validation would be wasteful.
    pub fn shares_of(&self, id: UserId, symbol: &str) -> Quantity {
        self.portfolios
            .get(&id)
            .and_then(|p| p.get(symbol))
            .copied()
            .unwrap_or(0)
    }

    /// Atomically moves `amount` of cash from `from` to `to`. Either both
    /// balances change or neither does.
    pub fn transfer_money(&mut self, from: UserId, to: UserId, amount: Cash) -> ExchangeResult<()> {
        if amount == 0 {
            return Err(ExchangeError::InvalidInput(
                "transfer amount must be > 0".into(),
            ));
        }
        let have = self.get_balance(from)?;
        self.get_balance(to)?; // validates `to` exists
        if have < amount {
            return Err(ExchangeError::InsufficientFunds {
                have,
                need: amount,
            });
        }
        *self.balances.get_mut(&from).expect("checked above") -= amount;
        *self.balances.get_mut(&to).expect("checked above") += amount;
        trace!(from, to, amount, "cash transferred");
        Ok(())
    }

    /// Atomically moves `qty` shares of `symbol` from `from` to `to`. Removes
    /// the symbol entry from `from`'s portfolio when it reaches zero.
    pub fn transfer_stock(
        &mut self,
        from: UserId,
        to: UserId,
        symbol: &str,
        qty: Quantity,
    ) -> ExchangeResult<()> {
        if qty == 0 {
            return Err(ExchangeError::InvalidInput(
                "transfer quantity must be > 0".into(),
            ));
        }
        if !self.balances.contains_key(&from) {
            return Err(ExchangeError::UnknownUser(from));
        }
        if !self.balances.contains_key(&to) {
            return Err(ExchangeError::UnknownUser(to));
        }
        let have = self.shares_of(from, symbol);
        if have < qty {
            return Err(ExchangeError::InsufficientShares { have, need: qty });
        }

        let from_portfolio = self.portfolios.get_mut(&from).expect("checked above");
        let remaining = have - qty;
        if remaining == 0 {
            from_portfolio.remove(symbol);
        } else {
            from_portfolio.insert(symbol.to_string(), remaining);
        }

        let to_portfolio = self.portfolios.get_mut(&to).expect("checked above");
        *to_portfolio.entry(symbol.to_string()).or_insert(0) += qty;
        trace!(from, to, symbol, qty, "stock transferred");
        Ok(())
    }

    /// Mints `qty` shares of `symbol` directly into `to`'s portfolio with no
    /// debit on the other side. Only ever called once per symbol, by
    /// `Exchange::ipo_stock`, to seed the market user's inventory — this is
    /// the sole point at which I4's conservation total for a symbol is
    /// established rather than preserved.
    pub(crate) fn mint_stock(&mut self, to: UserId, symbol: &str, qty: Quantity) {
        let portfolio = self
            .portfolios
            .get_mut(&to)
            .expect("mint_stock called with a registered user");
        *portfolio.entry(symbol.to_string()).or_insert(0) += qty;
    }

    /// Sum of every user's balance — invariant I3 (cash conservation).
    pub fn total_cash(&self) -> Cash {
        self.balances.values().sum()
    }

    pub fn balances(&self) -> &BTreeMap<UserId, Cash> {
        &self.balances
    }

    pub fn portfolios(&self) -> &BTreeMap<UserId, BTreeMap<SymbolId, Quantity>> {
        &self.portfolios
    }
}
