//! The two order representations: a [`RestingOrder`] that actually lives in
//! the book, and the ephemeral parameters of an incoming order that exists
//! only for the duration of `Exchange::place_order`.

use serde::{Deserialize, Serialize};

use crate::types::{OrderType, Price, Quantity, Side, UserId};

/// An unfilled (or partially filled) limit order sitting in the book,
/// waiting for a counterparty.
///
/// Carries no order id: `Exchange::cancel_order` identifies a resting order
/// purely by `(symbol, side, price, owner)`, so there is nothing here for an
/// id to address that the public contract exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub owner: UserId,
    pub quantity: Quantity,
}

impl RestingOrder {
    pub fn new(owner: UserId, quantity: Quantity) -> Self {
        Self { owner, quantity }
    }
}

/// The parameters of an order on its way into the matching engine. Exists
/// only for the duration of one `place_order` call — never stored.
#[derive(Debug, Clone, Copy)]
pub struct IncomingOrder {
    pub taker: UserId,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub limit_price: Option<Price>,
}

impl IncomingOrder {
    pub fn new(
        taker: UserId,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        limit_price: Option<Price>,
    ) -> Self {
        Self {
            taker,
            side,
            order_type,
            quantity,
            limit_price,
        }
    }
}
