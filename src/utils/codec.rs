// src/utils/codec.rs

//! Text decoding for board payloads.

use encoding_rs::{EUC_JP, Encoding, SHIFT_JIS};

/// Byte encodings used by the supported sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    ShiftJis,
    EucJp,
}

impl TextEncoding {
    fn encoding(self) -> &'static Encoding {
        match self {
            TextEncoding::ShiftJis => SHIFT_JIS,
            TextEncoding::EucJp => EUC_JP,
        }
    }

    /// Decode `bytes`, replacing malformed sequences with U+FFFD.
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _, had_errors) = self.encoding().decode(bytes);
        if had_errors {
            log::debug!("{:?} payload contained malformed sequences", self);
        }
        text.into_owned()
    }

    /// Encode `text` into this encoding (unmappable characters become
    /// numeric character references).
    pub fn encode(self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding().encode(text);
        bytes.into_owned()
    }
}
