//! A fast, streaming parser for DNS zone files.
//!
//! This crate reads zone master files — the textual representation of DNS
//! resource records defined in [RFC 1035] section 5 and extended by
//! [RFC 3597] — and delivers a stream of wire-format records to a caller
//! supplied sink. It is built for bulk data: inputs of megabytes to
//! gigabytes, processed with bounded memory at throughput limited by the
//! memory system rather than the lexer.
//!
//! The heart of the crate is a two-stage tokenizer. A block scanner
//! classifies the input in 64 byte blocks into structural bit masks, using
//! SIMD instructions where the target provides them, and records the
//! position of every token on a tape. A materializer drains the tape and
//! produces typed tokens — [`Contiguous`], [`Quoted`], [`LineFeed`],
//! [`EndOfFile`] — with escape sequences, comments, parenthesized line
//! groups, and `$INCLUDE` files accounted for. Record parsing sits on top
//! and can be bypassed entirely by driving [`Parser::lex`] yourself.
//!
//! # Example
//!
//! ```
//! use zonescan::{Accept, Options, Parser, ScannedRecord};
//!
//! struct Count(usize);
//!
//! impl Accept for Count {
//!     fn add(&mut self, _record: &ScannedRecord) -> Result<(), i32> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//! }
//!
//! let options = Options {
//!     origin: "example.com.".into(),
//!     ..Default::default()
//! };
//! let mut count = Count(0);
//! zonescan::Parser::parse_string(
//!     &options,
//!     "www 3600 IN A 192.0.2.1\n",
//!     &mut count,
//! ).unwrap();
//! assert_eq!(count.0, 1);
//! ```
//!
//! [RFC 1035]: https://tools.ietf.org/html/rfc1035
//! [RFC 3597]: https://tools.ietf.org/html/rfc3597
//! [`Contiguous`]: TokenCode::Contiguous
//! [`Quoted`]: TokenCode::Quoted
//! [`LineFeed`]: TokenCode::LineFeed
//! [`EndOfFile`]: TokenCode::EndOfFile

#![allow(clippy::manual_range_contains)]

mod bits;
mod simd;
mod source;

pub mod error;
pub mod iana;
pub mod log;
pub mod parser;
pub mod scanner;

pub use self::error::{Code, Error};
pub use self::iana::{Class, Rtype};
pub use self::log::{Category, Log, Site};
pub use self::parser::{Accept, Options, Parser, ScannedRecord};
pub use self::scanner::{Token, TokenCode};

/// The number of bytes consumed by the scanner at a time.
pub const BLOCK_SIZE: usize = 64;

/// The number of bytes read from the input per refill.
pub const WINDOW_SIZE: usize = 16384;

/// The number of tape slots reserved per block on the fast path.
pub(crate) const BLOCK_INDEXES: usize = 5;

/// The capacity of the index tape.
///
/// The tape must be able to hold every index from a single worst-case
/// block (64 consecutive line feeds). In practice a block carries a
/// handful; reserving enough to index a whole window keeps the scanner
/// out of the refill path most of the time.
pub(crate) const TAPE_SIZE: usize = 256 * BLOCK_INDEXES + BLOCK_SIZE;
