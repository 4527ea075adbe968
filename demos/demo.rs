//! File and pipe front-ends for the codec.
//!
//! One-shot files:  `demo c infile outfile` / `demo d infile outfile`
//! Streaming pipes: `demo c < infile > outfile` / `demo d < infile > outfile`
//!
//! Pipe mode cuts stdin into 1 MiB packets and runs them through a single
//! session, so the word caches warm up across packet boundaries; the
//! decoding side walks the stream frame by frame using only the 18-byte
//! headers.

use std::env;
use std::fs;
use std::io::{self, Read, Write};

use memlz::{Session, HEADER_LEN};

const PACKET: usize = 1024 * 1024;

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.len() {
        3 if args[0] == "c" => {
            let input = fs::read(&args[1])?;
            fs::write(&args[2], memlz::compress_to_vec(&input))
        }
        3 if args[0] == "d" => {
            let input = fs::read(&args[1])?;
            let output = memlz::decompress_to_vec(&input)?;
            fs::write(&args[2], output)
        }
        1 if args[0] == "c" => pipe_compress(),
        1 if args[0] == "d" => pipe_decompress(),
        _ => {
            eprintln!("Compress:   demo c infile outfile   or   demo c < infile > outfile");
            eprintln!("Decompress: demo d infile outfile   or   demo d < infile > outfile");
            Ok(())
        }
    }
}

fn pipe_compress() -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut session = Session::new();
    let mut packet = Vec::with_capacity(PACKET);
    let mut frame = vec![0u8; memlz::max_compressed_len(PACKET)];
    loop {
        packet.clear();
        reader.by_ref().take(PACKET as u64).read_to_end(&mut packet)?;
        if packet.is_empty() {
            break;
        }
        let written = memlz::stream_compress(&mut frame, &packet, &mut session);
        writer.write_all(&frame[..written])?;
    }
    writer.flush()
}

fn pipe_decompress() -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut session = Session::new();
    let mut frame = Vec::new();
    loop {
        frame.resize(HEADER_LEN, 0);
        match reader.read_exact(&mut frame[..HEADER_LEN]) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }

        let total = memlz::compressed_len(&frame);
        if total < HEADER_LEN {
            return Err(io::ErrorKind::InvalidData.into());
        }
        frame.resize(total, 0);
        reader.read_exact(&mut frame[HEADER_LEN..])?;

        let mut packet = vec![0u8; memlz::decompressed_len(&frame)];
        let written = memlz::stream_decompress(&mut packet, &frame, &mut session)?;
        writer.write_all(&packet[..written])?;
    }
    writer.flush()
}
