#![no_main]

use ironlink::framing::LineFramer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Feed the input whole, then again in arbitrary small chunks; the
    // framer must produce identical lines either way and never panic.
    let mut whole = LineFramer::new();
    let expected: Vec<String> = whole.push(data);

    let mut chunked = LineFramer::new();
    let mut produced = Vec::new();
    let mut rest = data;
    let mut step = 1;
    while !rest.is_empty() {
        let take = step.min(rest.len());
        let (chunk, tail) = rest.split_at(take);
        produced.extend(chunked.push(chunk));
        rest = tail;
        step = (step % 7) + 1;
    }

    assert_eq!(produced, expected);
    assert_eq!(chunked.pending(), whole.pending());

    for line in &expected {
        // Emitted lines are non-empty and carry no terminator.
        assert!(!line.is_empty());
        assert!(!line.ends_with('\n'));
    }
});
