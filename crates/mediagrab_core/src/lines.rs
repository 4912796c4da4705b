use bytes::{Buf, BytesMut};

/// Reassembles newline-terminated lines from arbitrary byte chunks.
///
/// Splitting happens on raw bytes, so a multi-byte UTF-8 sequence cut across
/// two chunks is decoded only once its line is complete.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: BytesMut,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every line it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw = self.pending.split_to(pos);
            self.pending.advance(1);
            lines.push(decode_line(&raw));
        }
        lines
    }

    /// Bytes buffered after the last newline.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Takes the unterminated trailing fragment, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = self.pending.split();
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
