//! A continuous-auction, price-time-priority matching engine with an
//! integrated custody ledger.
//!
//! [`Exchange`] is the single entry point: list a symbol with
//! [`Exchange::ipo_stock`], register traders with [`Exchange::add_user`], and
//! submit orders with [`Exchange::place_order`]. The book behind each symbol
//! holds no escrow — resting orders are re-validated against the ledger at
//! the moment they would fill, not when they're posted — so cash and shares
//! stay freely transferable outside the book at all times.
//!
//! This crate has no transport, no persistence, and no process boundary of
//! its own: it is a library meant to be embedded behind whatever wire
//! protocol or storage layer a caller needs.

pub mod errors;
pub mod exchange;
pub mod ledger;
pub mod matching;
pub mod orderbook;
pub mod orders;
pub mod symbol;
pub mod types;

pub use errors::{ExchangeError, ExchangeResult};
pub use exchange::{Exchange, DEFAULT_IPO_PRICE, MARKET_USER_ID};
pub use matching::{ExecutionReport, Fill};
pub use orderbook::{BookLevel, BookSnapshot};
pub use orders::RestingOrder;
pub use types::{Cash, OrderType, Price, Quantity, Side, SymbolId, UserId};
