//! System-wide tunables.

/// Maximum number of active inodes held in memory.
pub const NINODE: usize = 50;
/// Open files per process.
pub const NOFILE: usize = 16;
/// Buffers in the block I/O cache.
pub const NBUF: usize = 30;
/// Entries in the device switch table.
pub const NDEV: usize = 10;
/// Device number of the file system root disk.
pub const ROOT_DEV: u32 = 1;
