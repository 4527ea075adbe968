//! Frame compression: the round loop that drives the block encoders.

use std::cmp;

use super::{max_compressed_len, HEADER_FIELDS, HEADER_LEN, PADDING};
use crate::block::{
    encode_group, encode_rle, encode_tail, encode_uncompressed, Sink, RAW_CHUNK, WORDS_PER_BLOCK,
};
use crate::session::Session;
use crate::varint;

/// Cumulative input after which all-literal blocks start spilling into
/// UNCOMPRESSED side blocks; before that the word caches are too cold for
/// "no hits" to mean "incompressible".
const INCOMPRESSIBLE_WARMUP: u64 = 4 * 128;

/// Compress one frame of a stream.
///
/// Appends nothing to the session's history except what the format
/// requires: the word caches, the totals and the width selector all carry
/// over to the next call. Returns the frame length, never less than
/// [`HEADER_LEN`].
///
/// `dst` must hold at least [`max_compressed_len`]`(src.len())` bytes;
/// anything smaller is a contract violation and panics.
pub fn stream_compress(dst: &mut [u8], src: &[u8], session: &mut Session) -> usize {
    // both header fields get the width of the largest value either could
    // take, so the layout is known before the block stream is sized
    let widest = cmp::max(max_compressed_len(src.len()), src.len());
    let field_width = varint::width_for(widest as u64);
    let header_len = HEADER_FIELDS * field_width;

    let mut out = Sink::new(dst);
    out.skip(header_len);
    let mut cursor = 0;

    loop {
        session.tick(out.pos());

        if let Some(consumed) = encode_rle(&mut out, &src[cursor..]) {
            cursor += consumed;
            continue;
        }

        let flags = if session.wordlen == 8 {
            encode_group::<u64>(&mut out, &mut session.hash64, &src[cursor..])
        } else {
            encode_group::<u32>(&mut out, &mut session.hash32, &src[cursor..])
        };
        let flags = match flags {
            Some(flags) => flags,
            // the orphaned tag byte stays in the stream; the decoder
            // needs it to learn the tail width
            None => break,
        };
        cursor += WORDS_PER_BLOCK * session.wordlen;

        if flags == 0
            && session.total_input + cursor as u64 >= INCOMPRESSIBLE_WARMUP
            && src.len() - cursor >= RAW_CHUNK
        {
            encode_uncompressed(&mut out, &src[cursor..]);
            cursor += RAW_CHUNK;
        }
    }

    cursor += if session.wordlen == 8 {
        encode_tail::<u64>(&mut out, &mut session.hash64, &src[cursor..])
    } else {
        encode_tail::<u32>(&mut out, &mut session.hash32, &src[cursor..])
    };
    // whatever is shorter than one word goes out verbatim, no framing
    out.put_slice(&src[cursor..]);

    out.pad_to(HEADER_LEN, PADDING);
    let compressed_len = out.pos();

    out.patch_varint(0, src.len() as u64, field_width);
    out.patch_varint(field_width, compressed_len as u64, field_width);

    session.total_input += src.len() as u64;
    session.total_output += compressed_len as u64;
    compressed_len
}

/// Compress a single independent frame with a throwaway session.
pub fn compress(dst: &mut [u8], src: &[u8]) -> usize {
    let mut session = Session::new();
    stream_compress(dst, src, &mut session)
}

/// Compress a single independent frame into a freshly sized buffer.
pub fn compress_to_vec(src: &[u8]) -> Vec<u8> {
    let mut dst = vec![0; max_compressed_len(src.len())];
    let len = compress(&mut dst, src);
    dst.truncate(len);
    dst
}
