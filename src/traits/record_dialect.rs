//! Seam between the record decoder and the per-dialect grammars.
//!
//! A dialect does two jobs:
//! - **framing**: find where the record starting at a buffer position ends,
//!   resumably across chunks;
//! - **splitting**: cut one framed record into de-escaped fields.

use crate::enums::FrameStep;
use crate::error::MalformedReason;
use crate::models::buffers::ring_buffer::ScanWindow;
use crate::models::splitters::arena::FieldArena;

/// How a split call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitEnd {
    /// Fields appended to the arena by this call.
    pub fields: usize,
    /// The call stopped at `stop_at_field` with a delimiter still pending,
    /// so a later call can resume from the cursor.
    pub stopped_at_delimiter: bool,
}

pub trait RecordDialect {
    /// Locate the end of the record that begins at `start`.
    ///
    /// Scanning state survives a `NeedMore`, so the next call after more
    /// bytes arrive continues where this one stopped rather than rescanning.
    fn find_record_end(&mut self, window: &ScanWindow<'_>, start: usize) -> FrameStep;

    /// Split `line` into fields starting at `*cursor`, appending them to `arena`.
    ///
    /// Stops early after `stop_at_field` fields when given. `*cursor` is left
    /// at the first unread byte.
    fn split(
        &mut self,
        line: &[u8],
        cursor: &mut usize,
        stop_at_field: Option<usize>,
        arena: &mut FieldArena,
    ) -> Result<SplitEnd, MalformedReason>;

    /// The buffer dropped `shift` bytes from its front.
    fn rebase(&mut self, shift: usize);
}
