//! A teaching-grade block file system with per-file key/value tags.
//!
//! The crate turns raw block I/O (the `bio` crate) into a POSIX-shaped
//! namespace of files and directories over reference-counted, lockable
//! inodes, plus one extension: every regular file may carry a block of
//! key/value tags.
//!
//! The pieces an embedding kernel supplies are kept at arm's length:
//! the block device behind the buffer cache, the park/wake primitive
//! behind [`sync`], the device handlers behind the switch table, and
//! the syscall marshalling in front of [`syscall`]. Everything else,
//! from the allocation bitmap to path resolution, lives here and runs
//! the same under a kernel or a host test.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod file;
pub mod fs;
pub mod param;
pub mod proc;
pub mod sync;
pub mod syscall;

pub use bio::{BlockDevice, BLOCK_SIZE};

pub use self::{
    error::FsError,
    fs::{mkfs::mkfs, stat::Stat, FileSystem},
    proc::Process,
    syscall::OpenFlags,
};
