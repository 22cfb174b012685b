//! Per-symbol order book: two price-ordered maps of FIFO queues.
//!
//! `BTreeMap` gives O(log N) access to the best price on either side
//! (`iter().next_back()` for bids, `iter().next()` for asks) and ordered
//! iteration outward from it; `VecDeque` per level is the append/front-drain
//! FIFO queue price-time priority needs.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::orders::RestingOrder;
use crate::types::{Price, Quantity, Side, SymbolId, UserId};

/// One price level of a [`BookSnapshot`]: the price and the orders resting
/// there, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub orders: Vec<(UserId, Quantity)>,
}

/// A point-in-time, owned copy of both sides of a symbol's book.
///
/// `bids` is ordered best (highest price) first; `asks` is ordered best
/// (lowest price) first. Mutating a snapshot never affects the live book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: SymbolId,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// Buy and sell resting orders for a single symbol.
///
/// Price levels are never left empty: draining a level's queue to empty
/// removes the level itself (invariant I6).
#[derive(Debug, Default)]
pub struct OrderBook {
    pub(crate) bids: BTreeMap<Price, VecDeque<RestingOrder>>,
    pub(crate) asks: BTreeMap<Price, VecDeque<RestingOrder>>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn side_map(&self, side: Side) -> &BTreeMap<Price, VecDeque<RestingOrder>> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<RestingOrder>> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Highest resting bid price, or `None` if the bid side is empty.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Lowest resting ask price, or `None` if the ask side is empty.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Appends a resting order to the back of `price`'s queue on `side`,
    /// creating the level if this is the first order at that price.
    pub(crate) fn rest(&mut self, side: Side, price: Price, owner: UserId, quantity: Quantity) {
        trace!(?side, price, owner, quantity, "order rests in book");
        self.side_map_mut(side)
            .entry(price)
            .or_default()
            .push_back(RestingOrder::new(owner, quantity));
    }

    /// Removes the *first* (earliest-posted) resting order at `(side,
    /// price)` owned by `owner` and returns its quantity. Prunes the level if
    /// it becomes empty. `None` if the level doesn't exist or no order there
    /// belongs to `owner`.
    pub(crate) fn cancel_first(
        &mut self,
        side: Side,
        price: Price,
        owner: UserId,
    ) -> Option<Quantity> {
        let map = self.side_map_mut(side);
        let queue = map.get_mut(&price)?;
        let pos = queue.iter().position(|o| o.owner == owner)?;
        let removed = queue.remove(pos).expect("position just found");
        if queue.is_empty() {
            map.remove(&price);
        }
        Some(removed.quantity)
    }

    /// Drops every resting order on `side` for which `keep` returns `false`,
    /// pruning any level left empty. Used by `Exchange::clean_invalid_orders`
    /// to sweep out orders whose owner can no longer honor them. `keep`
    /// receives the order's price alongside the order itself since a bid's
    /// validity depends on `price * quantity`, not quantity alone.
    pub(crate) fn sweep<F>(&mut self, side: Side, mut keep: F)
    where
        F: FnMut(Price, &RestingOrder) -> bool,
    {
        let map = self.side_map_mut(side);
        let mut empty_levels = Vec::new();
        for (&price, queue) in map.iter_mut() {
            queue.retain(|order| keep(price, order));
            if queue.is_empty() {
                empty_levels.push(price);
            }
        }
        for price in empty_levels {
            map.remove(&price);
        }
    }

    /// A snapshot of both sides, bids descending and asks ascending, each
    /// level's orders in FIFO (insertion) order.
    pub fn snapshot(&self, symbol: impl Into<SymbolId>) -> BookSnapshot {
        let to_levels = |map: &BTreeMap<Price, VecDeque<RestingOrder>>, rev: bool| {
            let iter: Box<dyn Iterator<Item = (&Price, &VecDeque<RestingOrder>)>> = if rev {
                Box::new(map.iter().rev())
            } else {
                Box::new(map.iter())
            };
            iter.map(|(&price, orders)| BookLevel {
                price,
                orders: orders.iter().map(|o| (o.owner, o.quantity)).collect(),
            })
            .collect()
        };
        BookSnapshot {
            symbol: symbol.into(),
            bids: to_levels(&self.bids, true),
            asks: to_levels(&self.asks, false),
        }
    }

    pub(crate) fn side(&self, side: Side) -> &BTreeMap<Price, VecDeque<RestingOrder>> {
        self.side_map(side)
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<RestingOrder>> {
        self.side_map_mut(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_bid_and_ask_track_extremes() {
        let mut book = OrderBook::new();
        book.rest(Side::Bid, 99, 1, 5);
        book.rest(Side::Bid, 101, 2, 5);
        book.rest(Side::Ask, 105, 3, 5);
        book.rest(Side::Ask, 103, 4, 5);
        assert_eq!(book.best_bid(), Some(101));
        assert_eq!(book.best_ask(), Some(103));
    }

    #[test]
    fn cancel_first_removes_only_the_first_matching_order_and_prunes_empty_levels() {
        let mut book = OrderBook::new();
        book.rest(Side::Bid, 99, 1, 5);
        let cancelled = book.cancel_first(Side::Bid, 99, 1);
        assert_eq!(cancelled, Some(5));
        assert_eq!(book.best_bid(), None);
        assert!(!book.bids.contains_key(&99));
    }

    #[test]
    fn cancel_first_is_none_for_missing_level_or_owner() {
        let mut book = OrderBook::new();
        book.rest(Side::Bid, 99, 1, 5);
        assert_eq!(book.cancel_first(Side::Bid, 100, 1), None);
        assert_eq!(book.cancel_first(Side::Bid, 99, 2), None);
    }

    #[test]
    fn sweep_drops_orders_failing_the_predicate_and_keeps_others() {
        let mut book = OrderBook::new();
        book.rest(Side::Ask, 100, 1, 5);
        book.rest(Side::Ask, 100, 2, 5);
        book.sweep(Side::Ask, |_price, o| o.owner != 1);
        let remaining = &book.asks[&100];
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].owner, 2);
    }

    #[test]
    fn sweep_prunes_a_level_left_fully_empty() {
        let mut book = OrderBook::new();
        book.rest(Side::Ask, 100, 1, 5);
        book.sweep(Side::Ask, |_price, _o| false);
        assert!(!book.asks.contains_key(&100));
    }

    #[test]
    fn snapshot_orders_bids_descending_and_asks_ascending() {
        let mut book = OrderBook::new();
        book.rest(Side::Bid, 99, 1, 5);
        book.rest(Side::Bid, 101, 2, 5);
        book.rest(Side::Ask, 105, 3, 5);
        book.rest(Side::Ask, 103, 4, 5);
        let snap = book.snapshot("T");
        assert_eq!(
            snap.bids.iter().map(|l| l.price).collect::<Vec<_>>(),
            vec![101, 99]
        );
        assert_eq!(
            snap.asks.iter().map(|l| l.price).collect::<Vec<_>>(),
            vec![103, 105]
        );
    }

    #[test]
    fn snapshot_preserves_fifo_order_within_a_level() {
        let mut book = OrderBook::new();
        book.rest(Side::Ask, 100, 1, 4);
        book.rest(Side::Ask, 100, 2, 6);
        let snap = book.snapshot("T");
        assert_eq!(snap.asks[0].orders, vec![(1, 4), (2, 6)]);
    }
}
