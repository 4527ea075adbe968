//! End-to-end behavior of the codec on realistic and hostile corpora.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use memlz::{DecompressError, Session, HEADER_LEN};

/// Compress, sanity-check the frame against its own header, decompress,
/// compare. Returns the frame for further poking.
fn roundtrip(data: &[u8]) -> Vec<u8> {
    let mut frame = vec![0u8; memlz::max_compressed_len(data.len())];
    let written = memlz::compress(&mut frame, data);

    assert!(written >= HEADER_LEN, "frames are never shorter than the header");
    assert!(written <= memlz::max_compressed_len(data.len()), "bound violated");
    assert_eq!(memlz::compressed_len(&frame[..HEADER_LEN]), written);
    assert_eq!(memlz::decompressed_len(&frame[..HEADER_LEN]), data.len());
    frame.truncate(written);

    let mut decompressed = vec![0u8; data.len()];
    let read = memlz::decompress(&mut decompressed, &frame).expect("fresh frame must decode");
    assert_eq!(read, data.len());
    assert_eq!(decompressed, data, "roundtrip diverged");
    frame
}

fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    rng.fill_bytes(&mut data);
    data
}

/// A few hundred KiB of vaguely English text.
fn english(len: usize) -> Vec<u8> {
    let corpus = "It is a truth universally acknowledged, that a codec in \
                  possession of a good throughput, must be in want of a block \
                  format. The word cache remembers what the wire already said, \
                  and says it again in two bytes. ";
    corpus.bytes().cycle().take(len).collect()
}

#[test]
fn empty_input_is_a_minimum_frame() {
    let frame = roundtrip(&[]);
    assert_eq!(frame.len(), HEADER_LEN);
    assert_eq!(memlz::decompressed_len(&frame), 0);
}

#[test]
fn lengths_around_every_boundary() {
    // word, block and header-width boundaries all get a partial-tail case
    for &len in &[1, 3, 4, 5, 7, 8, 9, 63, 64, 65, 127, 128, 129, 2047, 2048, 2049] {
        roundtrip(&random_bytes(len as u64, len));
        roundtrip(&english(len));
        roundtrip(&vec![0u8; len]);
    }
}

#[test]
fn zeros_are_dominated_by_rle() {
    let frame = roundtrip(&vec![0u8; 4096]);
    assert!(
        frame.len() < 32,
        "4096 zeros should collapse to one RLE block, got {} bytes",
        frame.len()
    );
    assert!(frame.contains(&b'D'));
}

#[test]
fn random_data_stays_under_the_bound() {
    let data = random_bytes(7, 1 << 20);
    let frame = roundtrip(&data);
    // incompressible input expands a little and flows through
    // UNCOMPRESSED blocks, but never past the advertised bound
    assert!(frame.len() > data.len());
    assert!(frame.len() <= memlz::max_compressed_len(data.len()));
}

#[test]
fn english_text_roundtrips() {
    roundtrip(&english(100 * 1024));
}

#[test]
fn alternating_runs_and_noise() {
    // 10 * (8 KiB of zeros + 8 KiB of noise): RLE and UNCOMPRESSED blocks
    // have to interleave correctly
    let mut data = Vec::new();
    for i in 0..10 {
        data.extend_from_slice(&vec![0u8; 8 * 1024]);
        data.extend_from_slice(&random_bytes(i, 8 * 1024));
    }
    roundtrip(&data);
}

#[test]
fn streaming_partitions_concatenate() {
    let data = english(300 * 1024);

    // cut the input into frames of wildly uneven sizes, empty ones included
    let parts = [1usize, 7, 0, 64, 333, 4096, 0, 65_536];
    let mut enc = Session::new();
    let mut stream = Vec::new();
    let mut cursor = 0;
    let mut frame = vec![0u8; memlz::max_compressed_len(data.len())];
    'chop: loop {
        for &part in &parts {
            if cursor >= data.len() {
                break 'chop;
            }
            let part = part.min(data.len() - cursor);
            let written =
                memlz::stream_compress(&mut frame, &data[cursor..cursor + part], &mut enc);
            stream.extend_from_slice(&frame[..written]);
            cursor += part;
        }
    }

    // walk the concatenated stream with nothing but the headers
    let mut dec = Session::new();
    let mut output = Vec::new();
    let mut pos = 0;
    while pos < stream.len() {
        let total = memlz::compressed_len(&stream[pos..pos + HEADER_LEN]);
        let frame = &stream[pos..pos + total];
        let mut packet = vec![0u8; memlz::decompressed_len(frame)];
        let read = memlz::stream_decompress(&mut packet, frame, &mut dec).unwrap();
        output.extend_from_slice(&packet[..read]);
        pos += total;
    }
    assert_eq!(output, data);
}

#[test]
fn sessions_reset_to_identical_output() {
    let data = english(64 * 1024);
    let mut frame_a = vec![0u8; memlz::max_compressed_len(data.len())];
    let mut frame_b = vec![0u8; memlz::max_compressed_len(data.len())];

    let mut session = Session::new();
    let a = memlz::stream_compress(&mut frame_a, &data, &mut session);
    let _ = memlz::stream_compress(&mut frame_b, &data, &mut session);
    session.reset();
    let b = memlz::stream_compress(&mut frame_b, &data, &mut session);
    assert_eq!(frame_a[..a], frame_b[..b], "reset must erase all history");
}

#[test]
fn stale_session_produces_garbage_but_no_panic() {
    // decode frame 2 without having seen frame 1: the output is undefined
    // by contract, but it must stay memory safe and in-bounds
    let data = english(32 * 1024);
    let mut enc = Session::new();
    let mut frame1 = vec![0u8; memlz::max_compressed_len(data.len())];
    let mut frame2 = vec![0u8; memlz::max_compressed_len(data.len())];
    let _ = memlz::stream_compress(&mut frame1, &data, &mut enc);
    let n2 = memlz::stream_compress(&mut frame2, &data, &mut enc);
    frame2.truncate(n2);

    let mut fresh = Session::new();
    let mut out = vec![0u8; data.len()];
    match memlz::stream_decompress(&mut out, &frame2, &mut fresh) {
        Ok(read) => assert_eq!(read, data.len()),
        Err(_) => {}
    }
}

#[test]
fn declared_four_gigabytes_in_a_tiny_frame_is_rejected() {
    // decompressed_len = 2^32 declared by a frame of compressed_len 18
    let mut frame = vec![0u8; HEADER_LEN];
    frame[0] = 0b1100_0000;
    frame[1..9].copy_from_slice(&(1u64 << 32).to_le_bytes());
    frame[9] = 0b1100_0000;
    frame[10..18].copy_from_slice(&18u64.to_le_bytes());

    let mut dst = vec![0u8; 1 << 16];
    assert!(memlz::decompress(&mut dst, &frame).is_err());
}

#[test]
fn header_mutations_never_panic() {
    // flip every byte of a real header and decode; any result is fine,
    // any panic or overrun is not
    let data = english(10_000);
    let mut frame = memlz::compress_to_vec(&data);
    let mut dst = vec![0u8; data.len()];
    for at in 0..HEADER_LEN {
        for bit in 0..8 {
            frame[at] ^= 1 << bit;
            let _ = memlz::decompress(&mut dst, &frame);
            frame[at] ^= 1 << bit;
        }
    }
    // and the pristine frame still decodes
    assert_eq!(memlz::decompress(&mut dst, &frame).unwrap(), data.len());
}

#[test]
fn payload_mutations_never_panic() {
    let data = random_bytes(99, 4096);
    let pristine = memlz::compress_to_vec(&data);
    let mut dst = vec![0u8; data.len()];
    let mut rng = StdRng::seed_from_u64(123);
    for _ in 0..2000 {
        let mut frame = pristine.clone();
        let at = HEADER_LEN + (rng.next_u32() as usize) % (frame.len() - HEADER_LEN);
        frame[at] ^= 1 + (rng.next_u32() % 255) as u8;
        match memlz::decompress(&mut dst, &frame) {
            Ok(read) => assert_eq!(read, data.len()),
            Err(_) => {}
        }
    }
}

#[test]
fn random_garbage_never_panics() {
    let mut rng = StdRng::seed_from_u64(4242);
    let mut dst = vec![0u8; 1 << 16];
    for _ in 0..2000 {
        let len = (rng.next_u32() as usize) % 512;
        let garbage = random_bytes(rng.next_u64(), len);
        match memlz::decompress(&mut dst, &garbage) {
            Ok(read) => assert_eq!(read, memlz::decompressed_len(&garbage)),
            Err(_) => {}
        }
    }
}

#[test]
fn truncated_frames_never_decode() {
    let data = english(2000);
    let frame = memlz::compress_to_vec(&data);
    let mut dst = vec![0u8; data.len()];
    for keep in 0..frame.len() {
        // every cut lands inside the declared compressed length, so the
        // decoder must refuse before reading a single block
        assert!(matches!(
            memlz::decompress(&mut dst, &frame[..keep]),
            Err(DecompressError::TruncatedInput { .. })
        ));
    }
}
