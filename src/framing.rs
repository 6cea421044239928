use std::borrow::Cow;

use bytes::BytesMut;
use unicode_normalization::{is_nfc, UnicodeNormalization};

/// Splits an inbound byte stream into complete IRC lines.
///
/// Bytes accumulate until a CRLF terminator; the trailing partial line
/// is carried across chunks, so a line may arrive in any number of
/// pieces — including pieces that split a multi-byte UTF-8 sequence.
/// Each complete line is decoded lossily (malformed bytes become
/// U+FFFD) and normalized to NFC before being surfaced. Empty lines
/// are discarded. The framer itself never fails.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::new(),
        }
    }

    /// Feed one inbound chunk, returning the complete lines it closed,
    /// in order, with terminators stripped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = find_crlf(&self.buffer) {
            let framed = self.buffer.split_to(pos + 2);
            let payload = &framed[..pos];
            if payload.is_empty() {
                continue;
            }
            lines.push(normalize(String::from_utf8_lossy(payload)));
        }
        lines
    }

    /// Bytes held back waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_crlf(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\r\n")
}

fn normalize(text: Cow<'_, str>) -> String {
    if is_nfc(&text) {
        text.into_owned()
    } else {
        text.nfc().collect()
    }
}
