//! Shared scalar types and the string-token side/order-type enums.
//!
//! `Side` and `OrderType` round-trip through the canonical external spellings
//! (`"bid"`/`"ask"`, `"market"`/`"limit"`) via `FromStr` + `Display` plus serde
//! over the same string form, so a caller embedding this core behind its own
//! wire format gets the tokens for free.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Integer user id. `0` is reserved for the market user (see [`crate::MARKET_USER_ID`]).
pub type UserId = u64;

/// A unit of stock. Always a positive integer when resting or filled.
pub type Quantity = u64;

/// A price, in whatever smallest unit the caller has standardized on (e.g. cents).
pub type Price = u64;

/// A cash balance, in the same unit as [`Price`].
pub type Cash = u64;

/// A symbol identifier, e.g. `"TECH"`.
pub type SymbolId = String;

/// Side of the book: buy intent or sell intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// The opposite side of the book a taker on this side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bid" => Ok(Side::Bid),
            "ask" => Ok(Side::Ask),
            other => Err(format!("unsupported side `{other}`")),
        }
    }
}

/// Market orders execute immediately at any available opposite price and
/// never rest; limit orders rest any unfilled residue at `limit_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(format!("unsupported order type `{other}`")),
        }
    }
}
