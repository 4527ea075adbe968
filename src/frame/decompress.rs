//! Frame decompression.

use fehler::{throw, throws};
use thiserror::Error;

use super::{HEADER_FIELDS, HEADER_LEN};
use crate::block::{
    decode_group, decode_rle, decode_tail, decode_uncompressed, DecodeError, Dest, Source,
    MIN_ADVANCE, NORMAL32, NORMAL64, RLE, UNCOMPRESSED, WORDS_PER_BLOCK,
};
use crate::session::Session;
use crate::varint;

/// Errors when decompressing a memlz frame.
///
/// Any of these means the frame produced no usable output; the
/// destination contents are unspecified and the stream should be
/// abandoned (or both sessions reset at an agreed boundary).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum DecompressError {
    #[error("the frame's block stream is damaged")]
    Block(#[from] DecodeError),
    #[error("the input ends before the frame does (need {needed} bytes, got {have})")]
    TruncatedInput { needed: usize, have: usize },
    #[error("the header claims {compressed} compressed bytes for {decompressed} decompressed bytes, which no encoder output can reach")]
    ImplausibleLength { compressed: u64, decompressed: u64 },
    #[error("the destination buffer cannot hold this frame (need {needed} bytes, got {have})")]
    OutputBufferTooSmall { needed: u64, have: usize },
    #[error("the block stream stopped making progress; this frame was crafted to spin the decoder and has been rejected")]
    Stalled,
}
type Error = DecompressError;

impl From<DecompressError> for std::io::Error {
    fn from(e: DecompressError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    }
}

/// Decompress one frame of a stream into `dst`, returning the bytes
/// written (always exactly what the header declared).
///
/// The session must have seen every previous frame of the stream, in
/// order, since the matching reset boundary. `dst` needs
/// [`decompressed_len`](super::decompressed_len)`(src)` bytes of room and
/// `src` must contain the whole frame; both are checked, not assumed.
#[throws]
pub fn stream_decompress(dst: &mut [u8], src: &[u8], session: &mut Session) -> usize {
    if src.len() < HEADER_LEN {
        throw!(Error::TruncatedInput {
            needed: HEADER_LEN,
            have: src.len(),
        });
    }
    let decompressed_len = varint::read(src);
    let field_width = varint::encoded_width(src[0]);
    let compressed_len = varint::read(&src[field_width..]);

    // 128-bit math so a hostile 2^64-ish claim cannot overflow the bound
    let plausible_max = 68u128 * u128::from(decompressed_len) / 64 + 100;
    if u128::from(compressed_len) > plausible_max {
        throw!(Error::ImplausibleLength {
            compressed: compressed_len,
            decompressed: decompressed_len,
        });
    }
    if compressed_len > src.len() as u64 {
        throw!(Error::TruncatedInput {
            needed: compressed_len as usize,
            have: src.len(),
        });
    }
    if decompressed_len > dst.len() as u64 {
        throw!(Error::OutputBufferTooSmall {
            needed: decompressed_len,
            have: dst.len(),
        });
    }

    let header_len = HEADER_FIELDS * field_width;
    let window = &src[..compressed_len as usize];
    let body = window.get(header_len..).ok_or(DecodeError::UnexpectedEnd)?;
    let mut rd = Source::new(body);
    let mut wr = Dest::new(&mut dst[..decompressed_len as usize]);

    // `missing` mirrors the encoder's countdown. It is deliberately
    // wrapping: a block claiming more than what is left drives it past
    // zero, and the stall check below catches the wrap one iteration
    // later, before unbounded work can happen.
    let mut missing = decompressed_len;
    let mut last_missing = 0u64;

    let wordlen = loop {
        if last_missing != 0 && missing > last_missing + MIN_ADVANCE {
            throw!(Error::Stalled);
        }
        last_missing = missing;

        match rd.read_u8()? {
            UNCOMPRESSED => {
                let claimed = decode_uncompressed(&mut rd, &mut wr)?;
                missing = missing.wrapping_sub(claimed);
            }
            RLE => {
                let written = decode_rle(&mut rd, &mut wr)?;
                missing = missing.wrapping_sub(written);
            }
            NORMAL64 => {
                if missing < (WORDS_PER_BLOCK * 8) as u64 {
                    break 8;
                }
                decode_group::<u64>(&mut rd, &mut wr, &mut session.hash64)?;
                missing -= (WORDS_PER_BLOCK * 8) as u64;
            }
            NORMAL32 => {
                if missing < (WORDS_PER_BLOCK * 4) as u64 {
                    break 4;
                }
                decode_group::<u32>(&mut rd, &mut wr, &mut session.hash32)?;
                missing -= (WORDS_PER_BLOCK * 4) as u64;
            }
            other => throw!(DecodeError::UnknownBlockTag(other)),
        }
    };

    let slots = (missing / wordlen) as usize;
    if slots > 0 {
        if wordlen == 8 {
            decode_tail::<u64>(&mut rd, &mut wr, &mut session.hash64, slots)?;
        } else {
            decode_tail::<u32>(&mut rd, &mut wr, &mut session.hash32, slots)?;
        }
        missing %= wordlen;
    }
    if missing > 0 {
        let tail = rd.take(missing as usize)?;
        wr.put(tail)?;
    }

    session.total_input += compressed_len;
    session.total_output += decompressed_len;
    decompressed_len as usize
}

/// Decompress a single independent frame with a throwaway session.
#[throws]
pub fn decompress(dst: &mut [u8], src: &[u8]) -> usize {
    let mut session = Session::new();
    stream_decompress(dst, src, &mut session)?
}

/// Decompress a single independent frame into a freshly sized buffer.
///
/// The buffer is sized from the frame header, so feeding this untrusted
/// input hands the allocation decision to the attacker; prefer
/// [`decompress`] with your own cap when that matters.
#[throws]
pub fn decompress_to_vec(src: &[u8]) -> Vec<u8> {
    if src.len() < HEADER_LEN {
        throw!(Error::TruncatedInput {
            needed: HEADER_LEN,
            have: src.len(),
        });
    }
    let mut dst = vec![0; super::decompressed_len(src)];
    let len = decompress(&mut dst, src)?;
    dst.truncate(len);
    dst
}
