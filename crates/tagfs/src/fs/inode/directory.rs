//! Directories.
//!
//! A directory is a file whose content is a sequence of fixed-size
//! entries, each a name and an inode number.

use core::mem::size_of;

use dataview::PodMethods as _;

use crate::error::FsError;
use crate::fs::{
    repr::{DirEntry, InodeType},
    DeviceNo, InodeNo,
};

use super::{Inode, LockedInode};

impl<'fs, 'i> LockedInode<'fs, 'i> {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.ty() == InodeType::Dir
    }

    /// Views the inode as a directory, if it is one.
    pub fn as_dir<'l>(&'l mut self) -> Option<DirInode<'fs, 'i, 'l>> {
        self.is_dir().then_some(DirInode(self))
    }
}

/// A locked inode known to be a directory.
pub struct DirInode<'fs, 'i, 'l>(&'l mut LockedInode<'fs, 'i>);

impl<'fs, 'i> DirInode<'fs, 'i, '_> {
    #[must_use]
    pub fn dev(&self) -> DeviceNo {
        self.0.dev()
    }

    #[must_use]
    pub fn ino(&self) -> InodeNo {
        self.0.ino()
    }

    pub fn inner(&mut self) -> &mut LockedInode<'fs, 'i> {
        self.0
    }

    /// Looks up `name`.
    ///
    /// Returns an unlocked reference to the entry's inode and the byte
    /// offset of the entry.
    pub fn lookup(&mut self, name: &[u8]) -> Option<(Inode<'fs>, usize)> {
        let size = self.0.data().size as usize;
        for off in (0..size).step_by(size_of::<DirEntry>()) {
            let de = self.0.read_as::<DirEntry>(off).unwrap();
            let Some(ino) = de.inum() else { continue };
            if !de.is_same_name(name) {
                continue;
            }
            return Some((Inode::get(self.0.fs, self.0.dev, ino), off));
        }
        None
    }

    /// Writes the new entry (`name`, `ino`) into the directory.
    ///
    /// The first free entry is reused; the directory grows when none is
    /// free. Fails if `name` is already present.
    pub fn link(&mut self, name: &[u8], ino: InodeNo) -> Result<(), FsError> {
        if self.lookup(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let size = self.0.data().size as usize;
        assert_eq!(size % size_of::<DirEntry>(), 0, "ragged directory size");

        let (mut de, off) = (0..size)
            .step_by(size_of::<DirEntry>())
            .map(|off| (self.0.read_as::<DirEntry>(off).unwrap(), off))
            .find(|(de, _)| de.inum().is_none())
            .unwrap_or((DirEntry::zeroed(), size));

        de.set_name(name);
        de.set_inum(Some(ino));
        self.0.write_data(off, &de)
    }

    /// Returns `true` when the directory holds nothing besides `.` and
    /// `..`.
    pub fn is_empty(&mut self) -> bool {
        let size = self.0.data().size as usize;
        for off in (2 * size_of::<DirEntry>()..size).step_by(size_of::<DirEntry>()) {
            let de = self.0.read_as::<DirEntry>(off).unwrap();
            if de.inum().is_some() {
                return false;
            }
        }
        true
    }
}
