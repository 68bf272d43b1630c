#![no_main]

//! Parser fuzzer.
//!
//! Parsing must never panic, and any tree the parser accepts must print
//! back out to something the parser accepts again, equal to the first tree.

use libfuzzer_sys::fuzz_target;

use thane::gml::{parse, parse_config};

fuzz_target!(|data: &str| {
    if let Ok(body) = parse(data) {
        let printed = body.to_string();
        match parse(&printed) {
            Ok(reparsed) => assert_eq!(reparsed, body),
            Err(e) => panic!("printed tree failed to reparse: {e}"),
        }
    }
    let _ = parse_config(data);
});
