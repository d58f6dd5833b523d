//! File system implementation.
//!
//! Five layers:
//!   + Blocks: allocator for raw disk blocks.
//!   + Inodes: inode allocator, reading, writing, metadata.
//!   + Directories: inodes with special contents (list of other inodes!)
//!   + Names: paths like /usr/alice/notes.txt for convenient naming.
//!   + Tags: per-file key/value records held in a side block.
//!
//! This module contains the low-level file system manipulation
//! routines. The (higher-level) system call entry points are in
//! `syscall.rs`.
//!
//! Recoverable failures travel as [`FsError`]; invariant violations
//! (corrupt metadata, double frees, lock protocol breaches, allocator
//! exhaustion) panic.

use core::fmt;

use alloc::sync::Arc;

use bio::{BlockCache, BlockDevice, BlockHandle};
use spin::{Mutex, Once};

use crate::{
    error::FsError,
    file::{device::DeviceTable, Device},
    param::{NBUF, ROOT_DEV},
};

use self::repr::SuperBlock;

pub use self::repr::{BlockNo, InodeNo};

mod data_block;
pub mod inode;
pub mod mkfs;
pub mod ops;
pub mod path;
pub mod repr;
pub mod stat;

/// Device number of a disk holding a file system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct DeviceNo(u32);

impl fmt::Display for DeviceNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl DeviceNo {
    pub const ROOT: Self = Self(ROOT_DEV);

    #[must_use]
    pub const fn new(n: u32) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

pub(crate) type DiskHandle<'a> = BlockHandle<'a, Arc<dyn BlockDevice>>;

/// A mounted file system.
///
/// Owns the block cache over the backing device, the cached super
/// block, the in-memory inode table, and the device switch table.
pub struct FileSystem {
    dev: DeviceNo,
    cache: BlockCache<Arc<dyn BlockDevice>>,
    sb: Once<SuperBlock>,
    itable: Mutex<inode::table::InodeTable>,
    devices: DeviceTable,
}

impl FileSystem {
    /// Mounts the file system found on `device`.
    ///
    /// The super block is read (and checked) on first use, not here.
    pub fn new(device: Arc<dyn BlockDevice>) -> Self {
        Self {
            dev: DeviceNo::ROOT,
            cache: BlockCache::new(device, NBUF),
            sb: Once::new(),
            itable: Mutex::new(inode::table::InodeTable::new()),
            devices: DeviceTable::new(),
        }
    }

    /// Returns a reference to the root directory inode.
    pub fn root(&self) -> inode::Inode<'_> {
        inode::Inode::get(self, self.dev, InodeNo::ROOT)
    }

    /// Reads the super block, caching it on first use.
    pub(crate) fn superblock(&self) -> &SuperBlock {
        self.sb.call_once(|| {
            let bh = self.get_block(self.dev, SuperBlock::BLOCK_NO);
            let bg = bh.lock();
            let sb: &SuperBlock = bg.data();
            assert_eq!(sb.magic, SuperBlock::FS_MAGIC, "bad file system magic");
            log::debug!(
                "super block: size={} nblocks={} ninodes={}",
                sb.size,
                sb.nblocks,
                sb.ninodes
            );
            *sb
        })
    }

    /// Gets the buffer holding block `bno` of device `dev`.
    pub(crate) fn get_block(&self, dev: DeviceNo, bno: BlockNo) -> DiskHandle<'_> {
        assert_eq!(dev, self.dev, "unknown device: dev={dev}");
        self.cache.get(bno.as_index())
    }

    /// Registers the handlers for device major number `major`.
    pub fn register_device(&self, major: usize, dev: Device) {
        self.devices.register(major, dev);
    }

    pub(crate) fn device(&self, major: i16) -> Result<Device, FsError> {
        self.devices.get(major)
    }
}
