//! Conversion between the stream's external encoding and UTF-8.
//!
//! Framing always happens on raw external bytes. Each framed record is
//! converted before it is split, and each encoded row is converted back
//! before it is written.

use std::borrow::Cow;

use crate::enums::Encoding;
use crate::error::MalformedReason;
use crate::utils::is_valid_utf8;

pub trait Transcoder: Send {
    /// External bytes to UTF-8.
    fn to_internal<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>, MalformedReason>;

    /// UTF-8 to external bytes.
    fn to_external<'a>(&self, internal: &'a [u8]) -> Result<Cow<'a, [u8]>, MalformedReason>;

    /// Encoding of the bytes `to_internal` returns. The field splitters walk
    /// lines in this encoding.
    fn internal_encoding(&self) -> Encoding {
        Encoding::Utf8
    }
}

/// Built-in conversions.
///
/// UTF-8 is validated and passed through; LATIN1 maps byte-for-byte. The
/// double-byte encodings pass through untouched, so callers that need real
/// conversion install their own [`Transcoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinTranscoder {
    encoding: Encoding,
}

impl BuiltinTranscoder {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }
}

impl Transcoder for BuiltinTranscoder {
    fn to_internal<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, [u8]>, MalformedReason> {
        match self.encoding {
            Encoding::Utf8 if is_valid_utf8(raw) => Ok(Cow::Borrowed(raw)),
            Encoding::Utf8 => Err(MalformedReason::InvalidEncoding(self.encoding.name())),
            Encoding::Latin1 if raw.is_ascii() => Ok(Cow::Borrowed(raw)),
            Encoding::Latin1 => {
                let s: String = raw.iter().map(|&b| b as char).collect();
                Ok(Cow::Owned(s.into_bytes()))
            }
            _ => Ok(Cow::Borrowed(raw)),
        }
    }

    fn to_external<'a>(&self, internal: &'a [u8]) -> Result<Cow<'a, [u8]>, MalformedReason> {
        match self.encoding {
            Encoding::Latin1 if !internal.is_ascii() => {
                let s = std::str::from_utf8(internal)
                    .map_err(|_| MalformedReason::InvalidEncoding(Encoding::Utf8.name()))?;
                s.chars()
                    .map(|c| u8::try_from(u32::from(c)).map_err(|_| MalformedReason::UntranslatableCharacter("LATIN1")))
                    .collect::<Result<Vec<u8>, _>>()
                    .map(Cow::Owned)
            }
            _ => Ok(Cow::Borrowed(internal)),
        }
    }

    fn internal_encoding(&self) -> Encoding {
        // double-byte lines pass through unconverted
        if self.encoding.embeds_ascii() { self.encoding } else { Encoding::Utf8 }
    }
}
