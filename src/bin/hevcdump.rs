//! Reads an HEVC Annex-B file in 2 MiB chunks and prints one line per
//! coded slice.

use std::env;
use std::fs::File;
use std::io::Read;
use std::process;

use hevcsynt::Parser;

const CHUNK_SIZE: usize = 2 * 1024 * 1024;

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: hevcdump input-video");
        process::exit(1);
    };

    let mut file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("unable to open {}: {}", path, err);
            process::exit(1);
        }
    };

    let mut parser = Parser::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match file.read(&mut buffer) {
            Ok(n) => n,
            Err(err) => {
                eprintln!("read error: {}", err);
                process::exit(1);
            }
        };
        if n == 0 {
            break;
        }
        let result = parser.parse_chunk(&buffer[..n], |slice| {
            println!(
                "slice nal_type={} slice_type={:?} poc={} bytes={}",
                slice.header.nal_unit_type.0,
                slice.header.body.slice_type,
                slice.poc,
                slice.start_code_len + slice.nalu.len(),
            );
        });
        if let Err(err) = result {
            eprintln!("parse error: {}", err);
            process::exit(1);
        }
    }
}
