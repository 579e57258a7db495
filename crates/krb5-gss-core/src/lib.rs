#![cfg_attr(doc, doc = include_str!("../README.md"))]
#![warn(missing_docs)]

#[macro_use]
mod macros;

mod codec;
mod cursor;
mod error;

// Flat API hierarchy of common traits and types

pub use self::codec::*;
pub use self::cursor::*;
pub use self::error::*;
