#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < memlz::HEADER_LEN {
        return;
    }
    // the header is attacker-controlled; cap the allocation it can demand
    let declared = memlz::decompressed_len(&data[..memlz::HEADER_LEN]);
    let mut out = vec![0u8; declared.min(1 << 24)];
    match memlz::decompress(&mut out, data) {
        Ok(read) => assert_eq!(read, declared),
        Err(_) => {}
    }
});
