//! Open file objects.
//!
//! A [`File`] is what a file descriptor names: an inode or device plus
//! the open mode and, for inode files, the shared byte offset. `dup`'d
//! descriptors share one `File`; dropping the last one releases the
//! underlying inode reference.

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    error::FsError,
    fs::{inode::Inode, stat::Stat},
};

pub(crate) mod device;

pub use self::device::Device;

pub struct File<'fs> {
    readable: bool,
    writable: bool,
    kind: FileKind<'fs>,
}

enum FileKind<'fs> {
    /// Regular file or directory; reads and writes move the offset.
    Inode {
        inode: Inode<'fs>,
        off: AtomicUsize,
    },
    /// Device node; reads and writes go through the device switch.
    Device { inode: Inode<'fs> },
}

impl<'fs> File<'fs> {
    pub(crate) fn new_inode(inode: Inode<'fs>, readable: bool, writable: bool) -> Self {
        Self {
            readable,
            writable,
            kind: FileKind::Inode {
                inode,
                off: AtomicUsize::new(0),
            },
        }
    }

    pub(crate) fn new_device(inode: Inode<'fs>, readable: bool, writable: bool) -> Self {
        Self {
            readable,
            writable,
            kind: FileKind::Device { inode },
        }
    }

    #[must_use]
    pub fn readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// The backing inode, for inode-backed files only.
    pub(crate) fn backing_inode(&self) -> Option<&Inode<'fs>> {
        match &self.kind {
            FileKind::Inode { inode, .. } => Some(inode),
            FileKind::Device { .. } => None,
        }
    }

    /// Reads from the file at its current offset, advancing it.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize, FsError> {
        if !self.readable {
            return Err(FsError::NotReadable);
        }
        match &self.kind {
            FileKind::Inode { inode, off } => {
                let mut lip = inode.lock();
                let n = lip.read(off.load(Ordering::Relaxed), dst)?;
                off.fetch_add(n, Ordering::Relaxed);
                Ok(n)
            }
            FileKind::Device { inode } => inode.lock().read(0, dst),
        }
    }

    /// Writes to the file at its current offset, advancing it.
    ///
    /// A write that cannot complete in full is an error.
    pub fn write(&self, src: &[u8]) -> Result<usize, FsError> {
        if !self.writable {
            return Err(FsError::NotWritable);
        }
        match &self.kind {
            FileKind::Inode { inode, off } => {
                let mut lip = inode.lock();
                let n = lip.write(off.load(Ordering::Relaxed), src)?;
                off.fetch_add(n, Ordering::Relaxed);
                if n != src.len() {
                    return Err(FsError::FileTooLarge);
                }
                Ok(n)
            }
            FileKind::Device { inode } => inode.lock().write(0, src),
        }
    }

    /// Reports metadata of the underlying inode.
    pub fn stat(&self) -> Stat {
        match &self.kind {
            FileKind::Inode { inode, .. } | FileKind::Device { inode } => inode.lock().stat(),
        }
    }
}
