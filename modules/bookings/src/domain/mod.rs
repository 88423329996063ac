//! Pure booking lifecycle logic: predicates, step derivation and the
//! caller-side refund quote. Nothing in here performs I/O.

pub mod predicates;
pub mod refund_quote;
pub mod step;

pub use refund_quote::{refund_quote, RefundQuote};
pub use step::{derive_step, AdminAction, Step};
