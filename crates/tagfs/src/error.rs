use thiserror::Error;

/// Recoverable failures surfaced to the caller.
///
/// Invariant violations (corrupt metadata, lock protocol breaches,
/// allocator exhaustion) panic instead; see the module docs in
/// [`crate::fs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("bad file descriptor")]
    BadFileDescriptor,
    #[error("file descriptor not readable")]
    NotReadable,
    #[error("file descriptor not writable")]
    NotWritable,
    #[error("non-directory component in path")]
    NotADirectory,
    #[error("file system entry not found")]
    EntryNotFound,
    #[error("entry already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    DirectoryNotEmpty,
    #[error("cannot link across devices")]
    CrossDeviceLink,
    #[error("operation not permitted on a directory")]
    IsADirectory,
    #[error("invalid file name")]
    InvalidName,
    #[error("offset out of range")]
    InvalidOffset,
    #[error("file too large")]
    FileTooLarge,
    #[error("no such device")]
    NoDevice,
    #[error("too many open files")]
    TooManyOpenFiles,
    #[error("invalid tag key")]
    InvalidTagKey,
    #[error("tag value too large")]
    TagValueTooLarge,
    #[error("tag block full")]
    TagBlockFull,
    #[error("tag not found")]
    TagNotFound,
}
