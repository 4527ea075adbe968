//! Per-stream codec state.
//!
//! A [`Session`] is what makes the word matcher adaptive across frames: the
//! two word caches survive from one frame to the next, so a decoder fed the
//! same frames in the same order reconstructs the exact same caches. The
//! session also carries the width-selector bookkeeping, which only the
//! encoder consults (the decoder learns the width from block tags).

/// Slots in each word cache; hashes are 16 bits wide.
pub(crate) const HASH_SLOTS: usize = 1 << 16;

/// Input bytes one nominal round consumes (16 words at the 8-byte width).
const ROUND_BYTES: usize = 128;

/// Input window over which each word width is probed.
const PROBE_LEN: usize = 16 * 1024;

/// Input distance after which the probe cycle starts over.
const BLOCK_LEN: usize = 256 * 1024;

/// Shared state of one compression or decompression stream.
///
/// Create it (or [`reset`](Session::reset) an old one) before the first
/// frame, then pass it to every `stream_compress`/`stream_decompress` call
/// in order. Both directions mutate the word caches symmetrically, so the
/// decoding side must see the frames in encode order, starting from the
/// same reset boundary. A session must not be shared between streams.
pub struct Session {
    pub(crate) hash64: Box<[u64]>,
    pub(crate) hash32: Box<[u32]>,
    pub(crate) total_input: u64,
    pub(crate) total_output: u64,
    /// Rounds since the probe cycle last restarted.
    probe_mod: usize,
    /// Currently selected word width in bytes, 4 or 8.
    pub(crate) wordlen: usize,
    cs4: u64,
    cs8: u64,
}

impl Session {
    /// Fresh state, ready for the first frame.
    ///
    /// This allocates the two word caches (~768 KiB); nothing else in the
    /// codec allocates.
    pub fn new() -> Self {
        Session {
            hash64: vec![0; HASH_SLOTS].into_boxed_slice(),
            hash32: vec![0; HASH_SLOTS].into_boxed_slice(),
            total_input: 0,
            total_output: 0,
            probe_mod: 0,
            wordlen: 8,
            cs4: 0,
            cs8: 0,
        }
    }

    /// Forget all history: zero both word caches and every counter, back to
    /// the 8-byte width.
    ///
    /// Encoder and decoder must reset at the same frame boundary, otherwise
    /// their caches diverge and the output is garbage (though still
    /// memory-safe to produce).
    pub fn reset(&mut self) {
        for slot in self.hash64.iter_mut() {
            *slot = 0;
        }
        for slot in self.hash32.iter_mut() {
            *slot = 0;
        }
        self.total_input = 0;
        self.total_output = 0;
        self.probe_mod = 0;
        self.wordlen = 8;
        self.cs4 = 0;
        self.cs8 = 0;
    }

    /// One encoder round: advance the probe counter and maybe switch the
    /// word width.
    ///
    /// The selector compresses one probe window at the 8-byte width, one at
    /// the 4-byte width, keeps whichever produced less output for the rest
    /// of the cycle, and starts over every `BLOCK_LEN` of input. Output is
    /// measured through `frame_out_pos` (the current frame's write position)
    /// on top of the totals, so RLE and UNCOMPRESSED bytes bias the samples
    /// slightly; the probe windows are large enough that the comparison
    /// still lands the right way on real data.
    pub(crate) fn tick(&mut self, frame_out_pos: usize) {
        self.probe_mod += 1;
        let out_so_far = self.total_output + frame_out_pos as u64;

        if self.probe_mod == PROBE_LEN / ROUND_BYTES {
            self.cs8 = out_so_far - self.cs8;
            self.cs4 = out_so_far;
            self.wordlen = 4;
        } else if self.probe_mod == 3 * PROBE_LEN / ROUND_BYTES {
            self.cs4 = out_so_far - self.cs4;
            if self.cs8 < self.cs4 {
                self.wordlen = 8;
            }
        } else if self.probe_mod == (BLOCK_LEN + PROBE_LEN) / ROUND_BYTES {
            self.wordlen = 8;
            self.probe_mod = 0;
            self.cs8 = out_so_far;
            self.cs4 = 0;
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
