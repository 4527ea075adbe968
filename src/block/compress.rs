//! Block encoders.
//!
//! Everything here appends to a [`Sink`] positioned somewhere inside the
//! caller's destination buffer; the frame layer owns the surrounding
//! header/tail bookkeeping and decides which encoder runs when.

use byteorder::{ByteOrder, LE};

use super::{Word, MIN_RLE_WORDS, RAW_CHUNK, RLE, UNCOMPRESSED, WORDS_PER_BLOCK};
use crate::varint;

/// Write cursor over the caller's destination buffer.
///
/// Compression cannot fail: the caller promises `max_compressed_len`
/// capacity, so running off the end of this buffer is a broken caller
/// contract and panics via the slice bounds check rather than corrupting
/// anything.
pub(crate) struct Sink<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Sink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Sink { buf, pos: 0 }
    }

    /// Bytes written so far, counting skipped reservations.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Jump over `n` bytes to be patched later.
    pub fn skip(&mut self, n: usize) {
        self.pos += n;
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf[self.pos] = v;
        self.pos += 1;
    }

    pub fn put_u16(&mut self, v: u16) {
        LE::write_u16(&mut self.buf[self.pos..self.pos + 2], v);
        self.pos += 2;
    }

    pub fn put_word<W: Word>(&mut self, word: W) {
        word.store(&mut self.buf[self.pos..self.pos + W::WIDTH]);
        self.pos += W::WIDTH;
    }

    pub fn put_slice(&mut self, bytes: &[u8]) {
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    pub fn put_varint(&mut self, value: u64, width: usize) {
        varint::write(&mut self.buf[self.pos..], value, width);
        self.pos += width;
    }

    /// Reserve two bytes for a flags word; returns the patch offset.
    pub fn reserve_u16(&mut self) -> usize {
        let at = self.pos;
        self.pos += 2;
        at
    }

    pub fn patch_u16(&mut self, at: usize, v: u16) {
        LE::write_u16(&mut self.buf[at..at + 2], v);
    }

    /// Backfill a varint into a previously skipped region.
    pub fn patch_varint(&mut self, at: usize, value: u64, width: usize) {
        varint::write(&mut self.buf[at..], value, width);
    }

    /// Append `byte` until the cursor reaches `len` (no-op if already past).
    pub fn pad_to(&mut self, len: usize, byte: u8) {
        while self.pos < len {
            self.put_u8(byte);
        }
    }
}

/// Probe for a run of identical 8-byte words at the start of `src` and
/// emit an RLE block if the run is long enough.
///
/// Returns the input bytes consumed, or `None` when the run is below
/// [`MIN_RLE_WORDS`] and a NORMAL block should be tried instead.
pub(crate) fn encode_rle(out: &mut Sink, src: &[u8]) -> Option<usize> {
    let words = src.len() / 8;
    let mut run = 1;
    while run < words && LE::read_u64(&src[run * 8..]) == LE::read_u64(src) {
        run += 1;
    }
    if run < MIN_RLE_WORDS {
        return None;
    }

    out.put_u8(RLE);
    out.put_varint(run as u64, varint::width_for(run as u64));
    out.put_slice(&src[..8]);
    Some(run * 8)
}

/// Encode one slot: a 16-bit cache reference on a hit, the literal word
/// (refreshing the cache) on a miss. Shifts the hit bit into `flags`.
fn encode_word<W: Word>(out: &mut Sink, cache: &mut [W], word: W, flags: &mut u16) {
    let hash = word.hash();
    *flags <<= 1;
    if cache[hash as usize] == word {
        *flags |= 1;
        out.put_u16(hash);
    } else {
        cache[hash as usize] = word;
        out.put_word(word);
    }
}

/// Encode one full NORMAL block of 16 words.
///
/// The tag byte is written unconditionally; `None` means `src` cannot fill
/// a block and the round loop must fall through to the tail. The orphaned
/// tag stays in the stream on purpose; the decoder reads it to learn the
/// tail's word width.
pub(crate) fn encode_group<W: Word>(out: &mut Sink, cache: &mut [W], src: &[u8]) -> Option<u16> {
    out.put_u8(W::TAG);
    if src.len() < WORDS_PER_BLOCK * W::WIDTH {
        return None;
    }

    let flags_at = out.reserve_u16();
    let mut flags = 0;
    for slot in 0..WORDS_PER_BLOCK {
        let word = W::load(&src[slot * W::WIDTH..]);
        encode_word(out, cache, word, &mut flags);
    }
    out.patch_u16(flags_at, flags);
    Some(flags)
}

/// Copy a [`RAW_CHUNK`]-byte span verbatim behind an UNCOMPRESSED tag.
pub(crate) fn encode_uncompressed(out: &mut Sink, src: &[u8]) {
    out.put_u8(UNCOMPRESSED);
    out.put_varint(RAW_CHUNK as u64, varint::width_for(RAW_CHUNK as u64));
    out.put_slice(&src[..RAW_CHUNK]);
}

/// Encode the partial block that follows the round loop: up to 15
/// single-word slots under one flags word, flags left-justified over the
/// unused low bits. Returns the bytes consumed; the remainder (shorter
/// than one word) is the caller's to copy verbatim.
pub(crate) fn encode_tail<W: Word>(out: &mut Sink, cache: &mut [W], src: &[u8]) -> usize {
    debug_assert!(src.len() < WORDS_PER_BLOCK * W::WIDTH);
    if src.len() < W::WIDTH {
        return 0;
    }

    let flags_at = out.reserve_u16();
    let mut flags = 0;
    let mut slots_left = WORDS_PER_BLOCK;
    let mut consumed = 0;
    while src.len() - consumed >= W::WIDTH {
        let word = W::load(&src[consumed..]);
        encode_word(out, cache, word, &mut flags);
        consumed += W::WIDTH;
        slots_left -= 1;
    }
    out.patch_u16(flags_at, flags << slots_left);
    consumed
}
