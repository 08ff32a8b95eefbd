//! Recovery of entry names stored in an unknown legacy encoding.
//!
//! ZIP entry names are raw bytes. Archives written by older tools on Japanese,
//! Korean or Chinese systems store them in the local code page without setting
//! the UTF-8 flag, so the bytes have to be guessed back into text before they
//! can be shown or compared.
//!
//! [`recover`] keeps valid UTF-8 untouched and otherwise tries a fixed list of
//! legacy encodings, most likely first. A candidate only wins if it decodes
//! without a single malformed sequence and the result contains no C0 control
//! characters other than tab, newline and carriage return.
//!
//! # Example
//!
//! ```rust
//! use zipcull::encoding::recover;
//!
//! // "日本語.txt" in Shift-JIS
//! let raw = b"\x93\xfa\x96\x7b\x8c\xea.txt";
//! assert_eq!(recover(raw), "日本語.txt");
//!
//! // Already UTF-8: returned unchanged
//! assert_eq!(recover("café.txt".as_bytes()), "café.txt");
//! ```

use std::borrow::Cow;

use encoding_rs::{
    BIG5, EUC_JP, EUC_KR, Encoding, GBK, ISO_2022_JP, SHIFT_JIS, UTF_16BE, UTF_16LE, WINDOWS_1252,
};

/// Candidate encodings, in the order they are tried.
pub const CANDIDATES: [&Encoding; 9] = [
    SHIFT_JIS,
    EUC_JP,
    ISO_2022_JP,
    EUC_KR,
    GBK,
    BIG5,
    WINDOWS_1252,
    UTF_16BE,
    UTF_16LE,
];

/// How a name was turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The bytes were already valid UTF-8.
    Utf8,
    /// A candidate legacy encoding decoded the bytes cleanly.
    Legacy(&'static Encoding),
    /// No candidate was accepted; Shift-JIS was forced with replacement characters.
    ///
    /// Replacement decoding cannot fail, so this is also the last resort.
    ForcedShiftJis,
}

impl Source {
    /// Returns the name of the encoding that produced the text.
    pub fn encoding_name(&self) -> &'static str {
        match self {
            Source::Utf8 => "UTF-8",
            Source::Legacy(encoding) => encoding.name(),
            Source::ForcedShiftJis => SHIFT_JIS.name(),
        }
    }
}

/// A recovered entry name together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery<'a> {
    /// The recovered text.
    pub text: Cow<'a, str>,
    /// How the text was obtained.
    pub source: Source,
}

impl Recovery<'_> {
    /// Consumes the recovery and returns the owned text.
    pub fn into_text(self) -> String {
        self.text.into_owned()
    }
}

/// Recovers a Unicode name from raw entry name bytes.
///
/// This is a pure function: the same bytes always recover to the same text.
pub fn recover(raw: &[u8]) -> String {
    detect(raw).into_text()
}

/// Recovers a Unicode name and reports which encoding was used.
///
/// Valid UTF-8 is borrowed without any decoding attempt.
pub fn detect(raw: &[u8]) -> Recovery<'_> {
    if let Ok(text) = std::str::from_utf8(raw) {
        return Recovery {
            text: Cow::Borrowed(text),
            source: Source::Utf8,
        };
    }

    for encoding in CANDIDATES {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(raw) {
            if !has_control_chars(&text) {
                return Recovery {
                    text: Cow::Owned(text.into_owned()),
                    source: Source::Legacy(encoding),
                };
            }
        }
    }

    let (text, _) = SHIFT_JIS.decode_without_bom_handling(raw);
    Recovery {
        text: Cow::Owned(text.into_owned()),
        source: Source::ForcedShiftJis,
    }
}

/// Returns `true` if `text` contains a C0 control character other than
/// tab, newline or carriage return.
pub fn has_control_chars(text: &str) -> bool {
    text.chars()
        .any(|c| c < ' ' && c != '\t' && c != '\n' && c != '\r')
}
