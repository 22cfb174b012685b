//! A single tradable symbol: its book and the last price it traded at.

use crate::orderbook::OrderBook;
use crate::types::Price;

/// One symbol's resting orders plus the last price a trade printed at.
///
/// `last_traded_price` is seeded at listing and from then on only ever
/// updated by a fill — it never resets, so it still answers
/// `Exchange::get_stock_price` long after the book that set it has gone
/// flat. Last-traded-price takes priority over the book midpoint.
#[derive(Debug, Default)]
pub struct Symbol {
    pub(crate) book: OrderBook,
    pub(crate) last_traded_price: Option<Price>,
}

impl Symbol {
    pub fn new() -> Self {
        Self::default()
    }
}
