#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let compressed = memlz::compress_to_vec(data);
    assert!(compressed.len() <= memlz::max_compressed_len(data.len()));
    assert!(compressed.len() >= memlz::HEADER_LEN);

    let mut out = vec![0u8; data.len()];
    let read = memlz::decompress(&mut out, &compressed)
        .expect("a frame we just produced must decode");
    assert_eq!(read, data.len());
    assert_eq!(&out[..], data);
});
