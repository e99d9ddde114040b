use std::fmt;

use memchr::memmem;

use crate::constants::MAX_DATA_DISPLAY;

/// A length-capped copy of raw row bytes, kept for diagnostics.
///
/// Anything longer than [`MAX_DATA_DISPLAY`] bytes is clipped on a UTF-8
/// character boundary and rendered with a trailing `...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayBytes {
    bytes: Vec<u8>,
    truncated: bool,
}

impl DisplayBytes {
    pub fn new(data: &[u8]) -> Self {
        limit_printout(data)
    }

    /// The retained (possibly clipped) bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Display for DisplayBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes))?;
        if self.truncated {
            f.write_str("...")?;
        }
        Ok(())
    }
}

/// Make sure we never quote an unreasonable amount of row data in a message.
#[inline]
pub fn limit_printout(data: &[u8]) -> DisplayBytes {
    if data.len() <= MAX_DATA_DISPLAY {
        return DisplayBytes { bytes: data.to_vec(), truncated: false };
    }
    let mut cut = MAX_DATA_DISPLAY;
    // don't leave half a character behind
    while cut > 0 && (data[cut] & 0xC0) == 0x80 {
        cut -= 1;
    }
    DisplayBytes { bytes: data[..cut].to_vec(), truncated: true }
}

/// Count consecutive `val` bytes immediately before `pos`, never looking
/// left of the window start.
#[inline]
pub fn count_preceding(window: &[u8], pos: usize, val: u8) -> usize {
    window[..pos].iter().rev().take_while(|&&b| b == val).count()
}

/// Position of the first occurrence of `needle` in `haystack` at or after `from`.
#[inline]
pub fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() || haystack.len() - from < needle.len() {
        return None;
    }
    memmem::find(&haystack[from..], needle).map(|p| p + from)
}

#[inline]
pub fn is_valid_utf8(bytes: &[u8]) -> bool {
    std::str::from_utf8(bytes).is_ok()
}
