use super::{
    repr::{InodeNo, InodeType},
    DeviceNo,
};

/// File metadata, as reported by `fstat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Device holding the file system.
    pub dev: DeviceNo,
    /// Inode number.
    pub ino: InodeNo,
    /// Type of file.
    pub ty: InodeType,
    /// Number of links to the file.
    pub nlink: i16,
    /// Size of the file in bytes.
    pub size: u64,
}
