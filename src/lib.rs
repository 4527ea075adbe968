//! Pure Rust implementation of the memlz compression format.
//!
//! memlz trades ratio for speed: instead of searching for matches it keeps
//! a 65536-entry cache of recently seen machine words, keyed by a 16-bit
//! multiplicative hash, and replaces each word that is still in the cache
//! with its two-byte hash. Runs of identical words short-circuit into RLE
//! blocks, stretches that refuse to compress are passed through verbatim,
//! and a periodic probe picks between 4- and 8-byte words. Everything on
//! the wire is little endian.
//!
//! The unit of work is a [frame](crate::frame): one `compress` call in,
//! one frame out, self-delimited and introspectable from its first
//! [`HEADER_LEN`] bytes. For one-off buffers use [`compress`] /
//! [`decompress`]; for a long stream cut into packets, keep a [`Session`]
//! on each side and use [`stream_compress`] / [`stream_decompress`] so
//! the word caches carry over between frames.
//!
//! ```
//! let frame = memlz::compress_to_vec(b"fast fast fast fast fast fast fast!");
//! let back = memlz::decompress_to_vec(&frame).unwrap();
//! assert_eq!(&back, b"fast fast fast fast fast fast fast!");
//! ```

#![forbid(unsafe_code)]

pub mod block;
pub mod frame;
mod session;
mod varint;

pub use crate::block::DecodeError;
pub use crate::frame::{
    compress, compress_to_vec, compressed_len, decompress, decompress_to_vec, decompressed_len,
    max_compressed_len, stream_compress, stream_decompress, DecompressError, HEADER_LEN,
};
pub use crate::session::Session;
