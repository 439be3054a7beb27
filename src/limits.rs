//! Hard limits on untrusted input.

pub const MAX_ZONES: usize = 10_000;
pub const MAX_SLOTS: usize = 100_000;
pub const MAX_STAFF: usize = 100_000;

/// Upper bound on a single zone's or slot's capacity.
pub const MAX_CAPACITY: u32 = 1_000_000;

pub const MAX_NAME_LEN: usize = 256;
pub const MAX_ORDER_LINES: usize = 512;

/// Longest request line accepted on the wire, in bytes.
pub const MAX_LINE_LEN: usize = 64 * 1024;
