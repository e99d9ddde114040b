//! Single-row error handling.
//!
//! Under [`RejectPolicy::SkipBadRows`] a malformed record or a failed field
//! conversion is logged and skipped, and reading continues with the next
//! record until the reject limit is reached.

use tracing::{error, warn};

use crate::constants::REJECT_PERCENT_THRESHOLD;
use crate::error::{CodecError, ConfigError, RowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectLimit {
    /// Abort once this many rows were rejected.
    Rows(u64),
    /// Abort once this percentage of processed rows were rejected. Checked
    /// every `REJECT_PERCENT_THRESHOLD` rows.
    Percent(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectPolicy {
    /// The first bad row fails the whole read.
    #[default]
    AllOrNothing,
    SkipBadRows { limit: RejectLimit },
}

impl RejectPolicy {
    pub fn skip_rows(limit: u64) -> Result<Self, ConfigError> {
        if limit < 2 {
            return Err(ConfigError::RejectRows(limit));
        }
        Ok(RejectPolicy::SkipBadRows { limit: RejectLimit::Rows(limit) })
    }

    pub fn skip_percent(percent: u32) -> Result<Self, ConfigError> {
        if !(1..=100).contains(&percent) {
            return Err(ConfigError::RejectPercent(percent));
        }
        Ok(RejectPolicy::SkipBadRows { limit: RejectLimit::Percent(percent) })
    }
}

/// A row skipped under [`RejectPolicy::SkipBadRows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub record: u64,
    pub offset: u64,
    /// Error message, with `, column <name>` when a column is known.
    pub message: String,
    /// Leading bytes of the record.
    pub raw: Vec<u8>,
}

impl RejectedRow {
    pub fn from_error(err: &RowError) -> Self {
        let message = match err {
            RowError::Malformed(m) => m.reason.to_string(),
            RowError::Decode(d) => format!("{}, column {}", d.source, d.column_name),
        };
        Self { record: err.record(), offset: err.offset(), message, raw: err.raw().as_bytes().to_vec() }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RejectTracker {
    policy: RejectPolicy,
    processed: u64,
    rejected: Vec<RejectedRow>,
}

impl RejectTracker {
    pub fn new(policy: RejectPolicy) -> Self {
        Self { policy, processed: 0, rejected: Vec::new() }
    }

    pub fn policy(&self) -> RejectPolicy {
        self.policy
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn take_rejected(&mut self) -> Vec<RejectedRow> {
        std::mem::take(&mut self.rejected)
    }

    pub fn accept(&mut self) {
        self.processed += 1;
    }

    /// Record a bad row. Returns the error when the policy does not allow
    /// skipping it, or when the limit is now reached.
    pub fn reject(&mut self, err: RowError) -> Result<(), CodecError> {
        self.processed += 1;
        let limit = match self.policy {
            RejectPolicy::AllOrNothing => return Err(err.into()),
            RejectPolicy::SkipBadRows { limit } => limit,
        };

        let row = RejectedRow::from_error(&err);
        warn!(record = row.record, offset = row.offset, reason = %row.message, "rejected row");
        self.rejected.push(row);
        let rejected = self.rejected.len() as u64;

        let reached = match limit {
            RejectLimit::Rows(n) => rejected >= n,
            RejectLimit::Percent(p) => {
                self.processed % REJECT_PERCENT_THRESHOLD == 0 && rejected * 100 / self.processed >= u64::from(p)
            }
        };
        if reached {
            error!(rejected, processed = self.processed, "reject limit reached, aborting");
            return Err(CodecError::RejectLimit { rejected, last: err });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ColumnDecodeError, FieldDecodeError, MalformedReason, MalformedRecord};
    use crate::utils::DisplayBytes;

    fn malformed(record: u64) -> RowError {
        RowError::Malformed(MalformedRecord {
            reason: MalformedReason::ExtraData,
            record,
            offset: record * 10,
            data: DisplayBytes::new(b"a\tb\tc"),
        })
    }

    #[test]
    fn test_all_or_nothing_reraises() {
        let mut t = RejectTracker::new(RejectPolicy::AllOrNothing);
        assert!(matches!(t.reject(malformed(1)), Err(CodecError::Row(_))));
    }

    #[test]
    fn test_rows_limit() {
        let mut t = RejectTracker::new(RejectPolicy::skip_rows(3).unwrap());
        t.accept();
        assert!(t.reject(malformed(2)).is_ok());
        assert!(t.reject(malformed(3)).is_ok());
        match t.reject(malformed(4)) {
            Err(CodecError::RejectLimit { rejected, .. }) => assert_eq!(rejected, 3),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(t.rejected()[0].message, "extra data after last expected column");
        assert_eq!(t.rejected()[0].offset, 20);
    }

    #[test]
    fn test_percent_limit_checked_at_threshold() {
        let mut t = RejectTracker::new(RejectPolicy::skip_percent(10).unwrap());
        for i in 0..REJECT_PERCENT_THRESHOLD - 1 {
            if i % 5 == 0 {
                assert!(t.reject(malformed(i)).is_ok());
            } else {
                t.accept();
            }
        }
        // 61 of 300 rejected
        assert!(matches!(t.reject(malformed(300)), Err(CodecError::RejectLimit { .. })));
    }

    #[test]
    fn test_decode_message_names_column() {
        let err = RowError::Decode(ColumnDecodeError {
            column: 1,
            column_name: "qty".into(),
            record: 5,
            offset: 40,
            value: DisplayBytes::new(b"x"),
            source: FieldDecodeError::new("invalid input syntax for type integer: \"x\""),
        });
        let row = RejectedRow::from_error(&err);
        assert_eq!(row.message, "invalid input syntax for type integer: \"x\", column qty");
        assert_eq!(row.raw, b"x");
    }

    #[test]
    fn test_limit_validation() {
        assert_eq!(RejectPolicy::skip_rows(1), Err(ConfigError::RejectRows(1)));
        assert_eq!(RejectPolicy::skip_percent(0), Err(ConfigError::RejectPercent(0)));
        assert!(RejectPolicy::skip_percent(100).is_ok());
    }
}
