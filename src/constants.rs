// --- Delimited text defaults ---

pub const DEFAULT_FRAME_ALLOCATION_SIZE: usize = 64 * 1024; // 64 KiB

pub const TEXT_DEFAULT_DELIMITER: &str = "\t";
pub const CSV_DEFAULT_DELIMITER: &str = ",";
pub const TEXT_DEFAULT_NULL: &str = "\\N";
pub const CSV_DEFAULT_NULL: &str = "";
pub const CSV_DEFAULT_QUOTE: u8 = b'"';
pub const TEXT_DEFAULT_ESCAPE: u8 = b'\\';
pub const DEFAULT_END_OF_STREAM: [u8; 2] = *b"\\.";

/// Longest stretch of row data quoted back in an error message.
pub const MAX_DATA_DISPLAY: usize = 100;

/// Rows that must be seen before a percentage reject limit is enforced.
pub const REJECT_PERCENT_THRESHOLD: u64 = 300;

// Characters that cannot act as a TEXT delimiter, since they carry
// meaning after an escape.
pub const TEXT_RESERVED_DELIMITERS: &[u8] = b"\\.abcdefghijklmnopqrstuvwxyz0123456789";

// --- Binary framing ---

pub const BINARY_SIGNATURE: &[u8; 8] = b"PXF\n\xff\r\n\0";
pub const BINARY_SIGNATURE_LEN: usize = 8;
pub const BINARY_HEADER_LEN: usize = 16; // signature + flags + extension length
pub const BINARY_FLAG_WITH_OIDS: i32 = 1 << 16;
pub const FIELD_LENGTH_PREFIX: usize = 4;
pub const NULL_FIELD_LENGTH: i32 = -1;

pub const ROW_MARKER_DATA: u8 = 0x02;
pub const ROW_MARKER_END: u8 = 0x01;
pub const ROW_MARKER_ERROR: u8 = 0x03;
