//! The public facade: the single type external callers talk to.
//!
//! `place_order`/`cancel_order`/`get_stock_price`/`clean_invalid_orders` and
//! the rest are all methods here, backed directly by a [`Ledger`] and a
//! per-symbol [`Symbol`] map that this type owns.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::ledger::Ledger;
use crate::matching::{self, ExecutionReport};
use crate::orderbook::BookSnapshot;
use crate::orders::IncomingOrder;
use crate::symbol::Symbol;
use crate::types::{Cash, OrderType, Price, Quantity, Side, SymbolId, UserId};

/// The id of the house account every IPO mints shares into. Fixed, never
/// registered by a caller, always present after [`Exchange::new`].
pub const MARKET_USER_ID: UserId = 0;

/// The default per-share IPO price when a caller doesn't name one.
pub const DEFAULT_IPO_PRICE: Price = 100;

/// The whole exchange: custody ledger plus every listed symbol's book.
#[derive(Debug)]
pub struct Exchange {
    ledger: Ledger,
    symbols: BTreeMap<SymbolId, Symbol>,
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl Exchange {
    /// A fresh exchange with no symbols listed and only the market user
    /// registered.
    pub fn new() -> Self {
        let mut ledger = Ledger::new();
        ledger
            .add_user(MARKET_USER_ID, 0)
            .expect("market user id is unused on a fresh ledger");
        Self {
            ledger,
            symbols: BTreeMap::new(),
        }
    }

    /// Registers `user` with `initial_balance` cash and an empty portfolio.
    pub fn add_user(&mut self, user: UserId, initial_balance: Cash) -> ExchangeResult<()> {
        if user == MARKET_USER_ID {
            return Err(ExchangeError::InvalidInput(
                "user id 0 is reserved for the market".into(),
            ));
        }
        self.ledger.add_user(user, initial_balance)
    }

    pub fn get_user_balance(&self, user: UserId) -> ExchangeResult<Cash> {
        self.ledger.get_balance(user)
    }

    pub fn get_user_portfolio(
        &self,
        user: UserId,
    ) -> ExchangeResult<BTreeMap<SymbolId, Quantity>> {
        self.ledger.get_portfolio(user)
    }

    /// Delegates a direct cash transfer between two registered users.
    pub fn transfer_money(&mut self, from: UserId, to: UserId, amount: Cash) -> ExchangeResult<()> {
        self.ledger.transfer_money(from, to, amount)
    }

    /// Delegates a direct share transfer between two registered users.
    pub fn transfer_stock(
        &mut self,
        from: UserId,
        to: UserId,
        symbol: &str,
        qty: Quantity,
    ) -> ExchangeResult<()> {
        self.ledger.transfer_stock(from, to, symbol, qty)
    }

    /// Lists a new symbol, minting `quantity` shares into the market user's
    /// portfolio. `price` seeds `get_stock_price`'s answer until the first
    /// trade prints; `None` uses [`DEFAULT_IPO_PRICE`].
    pub fn ipo_stock(
        &mut self,
        symbol: impl Into<SymbolId>,
        quantity: Quantity,
        price: Option<Price>,
    ) -> ExchangeResult<()> {
        let symbol = symbol.into();
        if self.symbols.contains_key(&symbol) {
            return Err(ExchangeError::DuplicateSymbol(symbol));
        }
        if quantity == 0 {
            return Err(ExchangeError::InvalidInput(
                "IPO quantity must be > 0".into(),
            ));
        }
        let price = price.unwrap_or(DEFAULT_IPO_PRICE);
        if price == 0 {
            return Err(ExchangeError::InvalidInput("IPO price must be > 0".into()));
        }
        self.ledger.mint_stock(MARKET_USER_ID, &symbol, quantity);
        let mut entry = Symbol::new();
        entry.last_traded_price = Some(price);
        info!(symbol = %symbol, quantity, price, "symbol listed");
        self.symbols.insert(symbol, entry);
        Ok(())
    }

    fn symbol(&self, symbol: &str) -> ExchangeResult<&Symbol> {
        self.symbols
            .get(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    fn symbol_mut(&mut self, symbol: &str) -> ExchangeResult<&mut Symbol> {
        self.symbols
            .get_mut(symbol)
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    /// Submits an order. Validates the symbol and user exist, walks the
    /// matching engine, then rests any unfilled limit-order residue (after
    /// re-checking the taker can still honor it) or silently drops it.
    pub fn place_order(
        &mut self,
        symbol: &str,
        user: UserId,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
    ) -> ExchangeResult<ExecutionReport> {
        if !self.ledger.user_exists(user) {
            return Err(ExchangeError::UnknownUser(user));
        }
        if order_type == OrderType::Limit && limit_price.is_none() {
            return Err(ExchangeError::InvalidInput(
                "a limit order requires a limit price".into(),
            ));
        }
        if order_type == OrderType::Market && limit_price.is_some() {
            return Err(ExchangeError::InvalidInput(
                "a market order must not specify a limit price".into(),
            ));
        }

        let symbol_id = symbol.to_string();
        self.symbol(symbol)?;

        let incoming = IncomingOrder::new(user, side, order_type, quantity, limit_price);
        let entry = self.symbols.get_mut(symbol).expect("checked above");
        let (report, remaining) =
            matching::match_order(&mut self.ledger, &mut entry.book, &symbol_id, incoming)?;

        if let Some(last_fill) = report.fills.last() {
            entry.last_traded_price = Some(last_fill.price);
        }

        if remaining > 0 {
            if let (OrderType::Limit, Some(price)) = (order_type, limit_price) {
                let can_rest = match side {
                    Side::Bid => self
                        .ledger
                        .get_balance(user)
                        .map(|have| have >= price * remaining)
                        .unwrap_or(false),
                    Side::Ask => self.ledger.shares_of(user, &symbol_id) >= remaining,
                };
                if can_rest {
                    let entry = self.symbols.get_mut(symbol).expect("checked above");
                    entry.book.rest(side, price, user, remaining);
                } else {
                    warn!(
                        user,
                        symbol, remaining, "residue dropped: taker can no longer cover it"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Cancels the earliest-posted resting order `user` owns at `(symbol,
    /// side, price)`. Returns the cancelled quantity, or
    /// [`ExchangeError::UnknownOrder`] if none matches.
    pub fn cancel_order(
        &mut self,
        symbol: &str,
        user: UserId,
        side: Side,
        price: Price,
    ) -> ExchangeResult<Quantity> {
        let entry = self.symbol_mut(symbol)?;
        entry
            .book
            .cancel_first(side, price, user)
            .ok_or(ExchangeError::UnknownOrder)
    }

    /// A full snapshot of `symbol`'s resting orders, both sides.
    pub fn get_stock_orders(&self, symbol: &str) -> ExchangeResult<BookSnapshot> {
        Ok(self.symbol(symbol)?.book.snapshot(symbol))
    }

    pub fn get_last_traded_price(&self, symbol: &str) -> ExchangeResult<Option<Price>> {
        Ok(self.symbol(symbol)?.last_traded_price)
    }

    pub fn get_lowest_ask(&self, symbol: &str) -> ExchangeResult<Option<Price>> {
        Ok(self.symbol(symbol)?.book.best_ask())
    }

    pub fn get_highest_bid(&self, symbol: &str) -> ExchangeResult<Option<Price>> {
        Ok(self.symbol(symbol)?.book.best_bid())
    }

    /// The best single number to quote for `symbol` right now: the last
    /// traded price if one exists, else the midpoint of the best bid/ask if
    /// both are resting, else whichever single side is resting, else `None`
    /// for a symbol with no trade history and an empty book.
    pub fn get_stock_price(&self, symbol: &str) -> ExchangeResult<Option<Price>> {
        let entry = self.symbol(symbol)?;
        if let Some(last) = entry.last_traded_price {
            return Ok(Some(last));
        }
        let bid = entry.book.best_bid();
        let ask = entry.book.best_ask();
        Ok(match (bid, ask) {
            (Some(b), Some(a)) => Some((b + a) / 2),
            (None, Some(a)) => Some(a),
            (Some(b), None) => Some(b),
            (None, None) => None,
        })
    }

    /// Drops every resting order across every symbol whose owner can no
    /// longer honor it: a bid whose owner's cash has fallen below
    /// `price * quantity`, or an ask whose owner's share balance has fallen
    /// below `quantity`. Resting orders carry no escrow, so this is the only
    /// mechanism that reconciles the book with reality between fills.
    pub fn clean_invalid_orders(&mut self) {
        let ledger = &self.ledger;
        for (symbol_id, entry) in self.symbols.iter_mut() {
            let book = &mut entry.book;
            book.sweep(Side::Bid, |price, order| {
                ledger
                    .get_balance(order.owner)
                    .map(|have| have >= price * order.quantity)
                    .unwrap_or(false)
            });
            book.sweep(Side::Ask, |_price, order| {
                ledger.shares_of(order.owner, symbol_id) >= order.quantity
            });
        }
    }

    /// `(total cash across every user, total shares of every symbol across
    /// every user)` — invariants I3/I4. Callers assert these stay constant
    /// across any sequence of trades and transfers.
    pub fn verify_conservation(&self) -> (Cash, BTreeMap<SymbolId, Quantity>) {
        let total_cash = self.ledger.total_cash();
        let mut total_shares: BTreeMap<SymbolId, Quantity> = BTreeMap::new();
        for portfolio in self.ledger.portfolios().values() {
            for (symbol, &qty) in portfolio {
                *total_shares.entry(symbol.clone()).or_insert(0) += qty;
            }
        }
        (total_cash, total_shares)
    }

    /// Emits a structured log line per symbol summarizing best bid/ask and
    /// last price, for operator-facing diagnostics. Not part of the typed
    /// contract: callers that need this programmatically should call
    /// [`Self::get_stock_price`]/[`Self::get_lowest_ask`]/[`Self::get_highest_bid`]
    /// directly instead of parsing log output.
    pub fn print_market_summary(&self) {
        for (symbol, entry) in &self.symbols {
            info!(
                symbol = %symbol,
                last_price = ?entry.last_traded_price,
                best_bid = ?entry.book.best_bid(),
                best_ask = ?entry.book.best_ask(),
                "market summary"
            );
        }
    }
}
