//! Block decoders.
//!
//! Every read from the compressed stream goes through [`Source`] and every
//! write through [`Dest`]; both refuse to step outside the windows the
//! frame header declared. That refusal is the decoder's entire safety
//! story: nothing in this module can touch memory beyond the two
//! caller-supplied slices, no matter how hostile the input.

use byteorder::{ByteOrder, LE};
use fehler::throws;
use thiserror::Error;

use super::{Word, WORDS_PER_BLOCK};
use crate::varint;

/// Errors while decoding the block stream inside a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum DecodeError {
    #[error("block stream ended prematurely. Either the frame was truncated or its compressed-length field lies.")]
    UnexpectedEnd,
    #[error("a block tried to write past the declared decompressed length. You are decoding corrupted input.")]
    OutputOverrun,
    #[error("unknown block tag {0:#04x}. This is not a memlz block stream, or it has been damaged in transit.")]
    UnknownBlockTag(u8),
}
type Error = DecodeError;

/// Read cursor over the compressed window of one frame.
pub(crate) struct Source<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Source<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Source { buf, pos: 0 }
    }

    #[throws]
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let end = self.pos.checked_add(n).ok_or(Error::UnexpectedEnd)?;
        let piece = self.buf.get(self.pos..end).ok_or(Error::UnexpectedEnd)?;
        self.pos = end;
        piece
    }

    #[throws]
    pub fn read_u8(&mut self) -> u8 {
        self.take(1)?[0]
    }

    #[throws]
    pub fn read_u16(&mut self) -> u16 {
        LE::read_u16(self.take(2)?)
    }

    #[throws]
    pub fn read_word<W: Word>(&mut self) -> W {
        W::load(self.take(W::WIDTH)?)
    }

    /// Read a varint: peek the width byte, then take the whole field.
    #[throws]
    pub fn read_varint(&mut self) -> u64 {
        let first = *self.buf.get(self.pos).ok_or(Error::UnexpectedEnd)?;
        varint::read(self.take(varint::encoded_width(first))?)
    }
}

/// Write cursor over the decompressed window of one frame.
pub(crate) struct Dest<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Dest<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Dest { buf, pos: 0 }
    }

    #[throws]
    fn grab(&mut self, n: usize) -> &mut [u8] {
        let end = self.pos.checked_add(n).ok_or(Error::OutputOverrun)?;
        let piece = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(Error::OutputOverrun)?;
        self.pos = end;
        piece
    }

    #[throws]
    pub fn put(&mut self, bytes: &[u8]) {
        self.grab(bytes.len())?.copy_from_slice(bytes);
    }

    #[throws]
    pub fn put_word<W: Word>(&mut self, word: W) {
        word.store(self.grab(W::WIDTH)?);
    }
}

/// Decode an UNCOMPRESSED block; returns the length the stream claims to
/// cover.
///
/// The copy runs in 8-byte chunks, so a hostile claim that is not a
/// multiple of 8 advances the output by less than it returns; the frame
/// loop's stall check deals with streams built around that gap.
#[throws]
pub(crate) fn decode_uncompressed(src: &mut Source, dst: &mut Dest) -> u64 {
    let claimed = src.read_varint()?;
    for _ in 0..claimed / 8 {
        let chunk = src.take(8)?;
        dst.put(chunk)?;
    }
    claimed
}

/// Decode an RLE block; returns the bytes written.
#[throws]
pub(crate) fn decode_rle(src: &mut Source, dst: &mut Dest) -> u64 {
    let count = src.read_varint()?;
    let pattern = src.take(8)?;
    for _ in 0..count {
        dst.put(pattern)?;
    }
    count * 8
}

/// Decode one slot, mirroring the encoder: a set flag bit means a 16-bit
/// cache reference, a clear one a literal word that refreshes the cache.
#[throws]
fn decode_word<W: Word>(src: &mut Source, dst: &mut Dest, cache: &mut [W], flags: u16, slot: usize) {
    let word = if flags & (1 << (WORDS_PER_BLOCK - 1 - slot)) != 0 {
        cache[src.read_u16()? as usize]
    } else {
        let word = src.read_word::<W>()?;
        cache[word.hash() as usize] = word;
        word
    };
    dst.put_word(word)?;
}

/// Decode one full NORMAL block of 16 words.
#[throws]
pub(crate) fn decode_group<W: Word>(src: &mut Source, dst: &mut Dest, cache: &mut [W]) {
    let flags = src.read_u16()?;
    for slot in 0..WORDS_PER_BLOCK {
        decode_word(src, dst, cache, flags, slot)?;
    }
}

/// Decode the partial block before the final byte tail: `slots` words
/// under one left-justified flags word.
#[throws]
pub(crate) fn decode_tail<W: Word>(src: &mut Source, dst: &mut Dest, cache: &mut [W], slots: usize) {
    debug_assert!(slots > 0 && slots < WORDS_PER_BLOCK);
    let flags = src.read_u16()?;
    for slot in 0..slots {
        decode_word(src, dst, cache, flags, slot)?;
    }
}
