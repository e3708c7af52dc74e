//! Fuzz the tensor reader
//!
//! Any byte string is either rejected with an error or read into a tensor
//! that preprocessing accepts.

#![no_main]

use libfuzzer_sys::fuzz_target;
use nclusterbox::config::ShiftMode;
use nclusterbox::reader::TupleReader;
use nclusterbox::tensor::preprocess;

fuzz_target!(|data: &[u8]| {
    let Some((&flags, text)) = data.split_first() else {
        return;
    };
    let boolean = flags & 1 == 1;
    if let Ok(raw) = TupleReader::new(" ", ",", boolean).read(text, "fuzz") {
        // Sparse storage only: the dense one allocates the whole area
        preprocess(raw, ShiftMode::Mean, 1.0).expect("a tensor read is always valid");
    }
});
