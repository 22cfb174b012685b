//! The matching walk: crosses an incoming order against the resting book on
//! the opposite side, re-validating each maker's solvency at the moment of
//! the fill rather than trusting the book.
//!
//! A stale maker (one whose cash or shares moved elsewhere after resting)
//! is skipped *in place*, leaving it for a later taker without breaking FIFO
//! for the makers behind it. A plain pop-front/push-back queue can't express
//! "leave it exactly where it was"; walking the level by index and only
//! removing indices that actually filled can.

use tracing::{debug, trace};

use crate::errors::{ExchangeError, ExchangeResult};
use crate::ledger::Ledger;
use crate::orders::IncomingOrder;
use crate::orderbook::OrderBook;
use crate::types::{Cash, Price, Quantity, Side, SymbolId, UserId};

/// One completed trade between a taker and a resting maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub price: Price,
    pub quantity: Quantity,
    pub maker_id: UserId,
    pub taker_id: UserId,
}

/// The outcome of `Exchange::place_order`: how much filled, at what total
/// notional, and the individual trades that made it up. A limit order's
/// unfilled residue (if any) is not reported here — it is either resting in
/// the book afterward or silently dropped; callers can check the book or the
/// ledger to see which.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionReport {
    pub filled_qty: Quantity,
    pub notional: Cash,
    pub fills: Vec<Fill>,
}

impl ExecutionReport {
    fn push(&mut self, fill: Fill) {
        self.notional += fill.price * fill.quantity;
        self.filled_qty += fill.quantity;
        self.fills.push(fill);
    }
}

/// Can `owner` honor handing over `quantity` shares of `symbol` as the
/// maker of an ask? `quantity` from a resting bid's cash side is verified
/// by the symmetric closure built in [`match_order`].
fn maker_can_sell(ledger: &Ledger, owner: UserId, symbol: &str, quantity: Quantity) -> bool {
    ledger.shares_of(owner, symbol) >= quantity
}

/// Can `owner` honor paying `price * quantity` cash as the maker of a bid?
fn maker_can_buy(ledger: &Ledger, owner: UserId, price: Price, quantity: Quantity) -> bool {
    ledger
        .get_balance(owner)
        .map(|have| have >= price * quantity)
        .unwrap_or(false)
}

/// Walks the book on `incoming.side.opposite()`, filling against resting
/// orders price-then-time until `incoming`'s quantity is exhausted, a limit
/// price stops crossing, or the book runs dry. Returns the execution report
/// and the unfilled remainder (0 for a fully filled order).
///
/// Pre-checks the taker's own solvency for the *whole* requested quantity
/// before walking a single level: a taker that can't possibly afford (or
/// doesn't hold) the full order is rejected outright rather than partially
/// filled.
pub(crate) fn match_order(
    ledger: &mut Ledger,
    book: &mut OrderBook,
    symbol: &SymbolId,
    incoming: IncomingOrder,
) -> ExchangeResult<(ExecutionReport, Quantity)> {
    if incoming.quantity == 0 {
        return Err(ExchangeError::InvalidInput(
            "order quantity must be > 0".into(),
        ));
    }
    if let Some(price) = incoming.limit_price {
        if price == 0 {
            return Err(ExchangeError::InvalidInput(
                "limit price must be > 0".into(),
            ));
        }
    }

    pre_check_taker(ledger, book, symbol, incoming)?;

    let opposite = incoming.side.opposite();
    let mut report = ExecutionReport::default();
    let mut remaining = incoming.quantity;

    let mut exhausted_levels = Vec::new();
    let price_levels: Vec<Price> = match opposite {
        Side::Bid => book.side(opposite).keys().rev().copied().collect(),
        Side::Ask => book.side(opposite).keys().copied().collect(),
    };

    'levels: for price in price_levels {
        if remaining == 0 {
            break;
        }
        if let Some(limit) = incoming.limit_price {
            let crosses = match incoming.side {
                Side::Bid => price <= limit,
                Side::Ask => price >= limit,
            };
            if !crosses {
                break;
            }
        }

        let queue_len = book
            .side(opposite)
            .get(&price)
            .map(|q| q.len())
            .unwrap_or(0);
        let mut filled_indices = Vec::new();

        for idx in 0..queue_len {
            if remaining == 0 {
                break;
            }
            let (maker_id, resting_qty) = {
                let queue = book.side(opposite).get(&price).expect("level present");
                let Some(order) = queue.get(idx) else {
                    continue;
                };
                (order.owner, order.quantity)
            };

            let trade_qty = remaining.min(resting_qty);

            let solvent = match incoming.side {
                Side::Bid => maker_can_sell(ledger, maker_id, symbol, trade_qty),
                Side::Ask => maker_can_buy(ledger, maker_id, price, trade_qty),
            };
            if !solvent {
                trace!(maker_id, price, "stale maker skipped");
                continue;
            }

            let (buyer, seller) = match incoming.side {
                Side::Bid => (incoming.taker, maker_id),
                Side::Ask => (maker_id, incoming.taker),
            };
            ledger.transfer_money(buyer, seller, price * trade_qty)?;
            ledger.transfer_stock(seller, buyer, symbol, trade_qty)?;

            report.push(Fill {
                price,
                quantity: trade_qty,
                maker_id,
                taker_id: incoming.taker,
            });
            remaining -= trade_qty;
            debug!(maker_id, taker_id = incoming.taker, price, trade_qty, "fill");

            let new_resting = resting_qty - trade_qty;
            if new_resting == 0 {
                filled_indices.push(idx);
            } else {
                let queue = book
                    .side_mut(opposite)
                    .get_mut(&price)
                    .expect("level present");
                queue[idx].quantity = new_resting;
            }
        }

        if !filled_indices.is_empty() {
            let queue = book
                .side_mut(opposite)
                .get_mut(&price)
                .expect("level present");
            for &idx in filled_indices.iter().rev() {
                queue.remove(idx);
            }
            if queue.is_empty() {
                exhausted_levels.push(price);
            }
        }

        if remaining == 0 {
            break 'levels;
        }
    }

    for price in exhausted_levels {
        book.side_mut(opposite).remove(&price);
    }

    Ok((report, remaining))
}

/// Rejects a taker up front if it cannot possibly cover the whole order: a
/// bid taker needs `limit_price` (or, for a market order, the current best
/// ask) times quantity in cash; an ask taker needs that many shares on hand.
/// A market bid against an empty ask side has no reference price to size
/// against, so the funds check is skipped entirely and the walk below simply
/// fills zero — this is not a rejection.
fn pre_check_taker(
    ledger: &Ledger,
    book: &OrderBook,
    symbol: &SymbolId,
    incoming: IncomingOrder,
) -> ExchangeResult<()> {
    match incoming.side {
        Side::Bid => {
            let reference_price = match incoming.limit_price {
                Some(p) => Some(p),
                None => book.best_ask(),
            };
            if let Some(reference_price) = reference_price {
                let need = reference_price * incoming.quantity;
                let have = ledger.get_balance(incoming.taker)?;
                if have < need {
                    return Err(ExchangeError::InsufficientFunds { have, need });
                }
            }
        }
        Side::Ask => {
            let have = ledger.shares_of(incoming.taker, symbol);
            if have < incoming.quantity {
                return Err(ExchangeError::InsufficientShares {
                    have,
                    need: incoming.quantity,
                });
            }
        }
    }
    Ok(())
}
