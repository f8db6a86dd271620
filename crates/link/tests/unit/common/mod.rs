//! Common type tests.


/// Error display and conversion.
pub mod error;
