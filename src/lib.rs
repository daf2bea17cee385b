//! # smview
//!
//! This crate provides immutable, queryable views over source maps, a compact binary
//! encoding of them ("memdb"), and flattening of indexed source maps.
//!
//! ## Getting Started
//!
//! ```
//! use smview::{DumpOptions, View};
//!
//! let json = br#"{"version":3,"sources":["a.js"],"names":["x"],"mappings":"AAAA,CAAC"}"#;
//! let view = View::from_json_slice(json).unwrap();
//!
//! // Find the token covering line 0, column 5
//! let found = view.lookup_token(0, 5).unwrap();
//! assert_eq!(found.to_string(), "a.js:0:1");
//!
//! // Store the view as memdb and load it again
//! let memdb = view.to_memdb(DumpOptions::default()).unwrap();
//! let view = View::from_memdb(&memdb).unwrap();
//! assert_eq!(view.token_count(), 2);
//! ```
//!
//! ## Overview
//!
//! ### `BorrowedView`
//!
//! [BorrowedView] is a view containing borrowed or owned strings. Parsing JSON borrows
//! strings from the input wherever no unescaping is needed, decoding memdb borrows
//! every string from the buffer.
//!
//! ### `View`
//!
//! [View] is a view that owns all its internal strings,
//! providing a more straightforward and safe API for users who do not need
//! to manage the lifetimes of the strings manually.
//!
//! ### `Index` and `ViewOrIndex`
//!
//! [Index] is an indexed source map made of offset [Section]s. It cannot be queried
//! until it is flattened into a view with [Index::into_view].
//! [ViewOrIndex] parses either kind from the same input.
//!
//! ### `Token`
//!
//! [Token] presents one mapping from a generated [Position] to an original one.
//!
//! ## Features
//!
//! - `builder`: Enables [ViewBuilder] and functions like [Tokens::new] for manual construction of views.
//!

mod boundary;
mod error;
mod finder;
mod hint;
mod index;
mod memdb;
mod splitter;
mod token;
mod tokens;
mod view;
mod vlq;

pub use boundary::*;
pub use error::*;
pub use finder::*;
pub use index::*;
pub use memdb::DumpOptions;
pub use token::*;
pub use tokens::*;
pub use view::*;
