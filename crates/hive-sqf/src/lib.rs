//! SQF value model for the Hive persistence layer.
//!
//! The game server exchanges data with the hive as nested arrays written in
//! SQF literal syntax, e.g. `[329,[11173,3155.13,0.0039]]` for a worldspace
//! or `[["ItemMap"],["ItemBandage",2]]` for an inventory. The same text is
//! stored verbatim in array-typed database columns.
//!
//! # Modules
//!
//! - [`value`] -- the [`Value`] tree, stringification, and coercions
//! - [`parse`] -- text to [`Value`] parsing
//! - [`error`] -- [`ParseError`] and [`CoercionError`]
//!
//! Malformed text fails with [`ParseError`]. Well-formed text of the wrong
//! shape (a string where a number was expected) fails later, at coercion
//! time, with [`CoercionError`].

pub mod error;
pub mod parse;
pub mod value;

pub use error::{CoercionError, ParseError, ParseErrorKind};
pub use parse::parse;
pub use value::{Value, ValueKind};
