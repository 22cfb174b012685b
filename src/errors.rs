//! The error taxonomy for the exchange core.
//!
//! Every rejection gets its own tagged variant rather than a single catch-all
//! error. Message text is diagnostic only, not part of the contract —
//! callers match on the variant, not the `Display` string.

use thiserror::Error;

use crate::types::{Cash, Quantity, SymbolId, UserId};

/// Every way a public [`crate::Exchange`] operation can be rejected.
///
/// There are no fatal errors in the core: every variant is a rejection of a
/// single call, and state is left unchanged when one is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(SymbolId),

    #[error("no matching resting order")]
    UnknownOrder,

    #[error("user {0} already exists")]
    DuplicateUser(UserId),

    #[error("symbol `{0}` already exists")]
    DuplicateSymbol(SymbolId),

    #[error("insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: Cash, need: Cash },

    #[error("insufficient shares: have {have}, need {need}")]
    InsufficientShares { have: Quantity, need: Quantity },
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
