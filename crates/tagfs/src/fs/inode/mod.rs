//! Inodes.
//!
//! An inode describes a single unnamed file. The inode disk structure
//! holds metadata: the file's type, its size, the number of links
//! referring to it, the list of blocks holding the file's content, and
//! the address of its tag block.
//!
//! The inodes are laid out sequentially on disk starting at block 2.
//! Each inode has a number, indicating its position on the disk.
//!
//! The file system keeps a table of in-use inodes in memory to provide
//! a place for synchronizing access to inodes used by several
//! processes. An inode and its in-memory representation go through a
//! sequence of states before the rest of the code may use them:
//!
//! * Allocation: an inode is allocated if its type (on disk) is
//!   non-zero. [`Inode::alloc`] allocates; dropping the last reference
//!   frees the disk inode again when its link count is zero.
//!
//! * Referencing in table: a table slot is free when no [`Inode`]
//!   refers to it. The reference count is the strong count of the
//!   slot's shared data: [`Inode::get`] finds or creates a slot entry,
//!   cloning takes another reference, dropping releases one.
//!
//! * Valid: the copied disk fields are present only once the inode has
//!   been locked; the first [`Inode::lock`] reads them from disk. A
//!   recycled slot starts invalid again.
//!
//! * Locked: code may examine and modify the fields and content of an
//!   inode only while holding the [`LockedInode`] it got from
//!   [`Inode::lock`].
//!
//! A typical sequence is:
//!
//! ```text
//! let ip = Inode::get(fs, dev, ino);
//! let mut lip = ip.lock();
//! ... examine and modify through lip ...
//! drop(lip);              // unlock
//! drop(ip);               // release the reference
//! ```
//!
//! Locking is separate from getting so that system calls can keep a
//! long-term reference to an inode (as an open file does) and lock it
//! only for short periods, and so that path lookup can release a
//! directory's lock before descending into the entry it found. The
//! table spinlock is held only for identity bookkeeping: acquiring a
//! busy inode waits on the sleep lock with no spinlock held, so long
//! disk I/O under one inode's lock never delays lookups of others.
//!
//! Dropping the last reference to an unlinked inode destroys it: the
//! check happens under the table lock, the sleep lock is taken (which
//! cannot wait, as no other reference exists), the table lock is
//! released, and only then does truncation perform its disk I/O.

use alloc::sync::{Arc, Weak};

use crate::sync::{SleepLock, SleepLockGuard};

use super::{
    repr::{self, BlockNo, InodeNo, InodeType, NDIRECT},
    stat::Stat,
    DeviceNo, FileSystem,
};

mod content;
mod directory;
pub(crate) mod table;
mod tags;

pub use directory::DirInode;

pub(super) type InodeDataPtr = Arc<SleepLock<Option<InodeData>>>;
pub(super) type InodeDataWeak = Weak<SleepLock<Option<InodeData>>>;

/// In-memory copy of a disk inode's fields.
pub(crate) struct InodeData {
    pub(crate) ty: InodeType,
    pub(crate) major: i16,
    pub(crate) minor: i16,
    pub(crate) nlink: i16,
    pub(crate) size: u32,
    pub(crate) addrs: [Option<BlockNo>; NDIRECT + 1],
    pub(crate) tags: Option<BlockNo>,
}

impl InodeData {
    fn from_repr(d: &repr::Dinode) -> Self {
        let ty = InodeType::from_repr(d.ty).expect("unknown inode type on disk");
        let mut addrs = [None; NDIRECT + 1];
        for (dst, src) in addrs.iter_mut().zip(&d.addrs) {
            if *src != 0 {
                *dst = Some(BlockNo::new(*src));
            }
        }
        Self {
            ty,
            major: d.major,
            minor: d.minor,
            nlink: d.nlink,
            size: d.size,
            addrs,
            tags: if d.tags != 0 {
                Some(BlockNo::new(d.tags))
            } else {
                None
            },
        }
    }

    fn write_repr(&self, d: &mut repr::Dinode) {
        d.ty = self.ty as i16;
        d.major = self.major;
        d.minor = self.minor;
        d.nlink = self.nlink;
        d.size = self.size;
        for (dst, src) in d.addrs.iter_mut().zip(&self.addrs) {
            *dst = src.map_or(0, |bn| bn.value());
        }
        d.tags = self.tags.map_or(0, |bn| bn.value());
    }
}

/// A counted reference to an in-memory inode.
///
/// Cloning takes another reference; dropping releases one, destroying
/// the disk inode when the last reference to an unlinked inode goes.
pub struct Inode<'fs> {
    fs: &'fs FileSystem,
    dev: DeviceNo,
    ino: InodeNo,
    data: InodeDataPtr,
}

impl<'fs> Inode<'fs> {
    /// Finds the in-memory inode `(dev, ino)`, creating the table entry
    /// if needed.
    ///
    /// Does not read the disk; callers that need the on-disk fields
    /// lock the result first. Panics when the table is full.
    pub fn get(fs: &'fs FileSystem, dev: DeviceNo, ino: InodeNo) -> Self {
        let data = fs
            .itable
            .lock()
            .get_or_insert(dev, ino)
            .expect("out of in-memory inodes");
        Self { fs, dev, ino, data }
    }

    /// Allocates a fresh on-disk inode of type `ty` on `dev`.
    ///
    /// The first free slot in the inode area is claimed by writing the
    /// type. Returns an unlocked reference; panics when no inode is
    /// free.
    pub fn alloc(fs: &'fs FileSystem, dev: DeviceNo, ty: InodeType) -> Self {
        let sb = fs.superblock();
        for ino in 1..sb.ninodes {
            let ino = InodeNo::new(ino);
            let bh = fs.get_block(dev, sb.inode_block(ino));
            let mut bg = bh.lock();
            let dip = bg.data_mut::<repr::InodeBlock>().dinode_mut(ino);
            if dip.is_free() {
                dip.allocate(ty);
                bg.write();
                drop(bg);
                drop(bh);
                return Self::get(fs, dev, ino);
            }
        }
        log::warn!("no inodes");
        panic!("out of inodes");
    }

    #[must_use]
    pub fn dev(&self) -> DeviceNo {
        self.dev
    }

    #[must_use]
    pub fn ino(&self) -> InodeNo {
        self.ino
    }

    /// Locks the inode, reading its fields from disk on first use.
    pub fn lock<'a>(&'a self) -> LockedInode<'fs, 'a> {
        let guard = self.data.lock();
        LockedInode::load(self.fs, self.dev, self.ino, guard)
    }

    /// Releases this reference (drop, spelled out).
    pub fn put(self) {}
}

impl Clone for Inode<'_> {
    /// Takes another counted reference to the same inode.
    fn clone(&self) -> Self {
        Self {
            fs: self.fs,
            dev: self.dev,
            ino: self.ino,
            data: Arc::clone(&self.data),
        }
    }
}

impl Drop for Inode<'_> {
    /// Releases one reference.
    ///
    /// The last reference to an inode whose link count reached zero
    /// truncates it and frees the disk inode. The decision is made
    /// under the table lock; the sleep lock acquisition cannot wait
    /// because no other reference exists; the disk I/O runs with the
    /// table lock released.
    fn drop(&mut self) {
        let table = self.fs.itable.lock();
        if Arc::strong_count(&self.data) > 1 {
            return;
        }

        let Some(guard) = self.data.try_lock() else {
            panic!("sole inode reference is locked");
        };
        let unlinked = matches!(&*guard, Some(data) if data.nlink == 0);
        if !unlinked {
            return;
        }
        drop(table);

        let mut locked = LockedInode {
            fs: self.fs,
            dev: self.dev,
            ino: self.ino,
            guard,
        };
        locked.truncate();
        locked.free_on_disk();
    }
}

/// Exclusive access to an inode's fields and content.
///
/// Dropping unlocks. The lock may be held across disk I/O; the inode
/// table stays available to other threads the whole time.
pub struct LockedInode<'fs, 'i> {
    fs: &'fs FileSystem,
    dev: DeviceNo,
    ino: InodeNo,
    guard: SleepLockGuard<'i, Option<InodeData>>,
}

impl<'fs, 'i> LockedInode<'fs, 'i> {
    fn load(
        fs: &'fs FileSystem,
        dev: DeviceNo,
        ino: InodeNo,
        mut guard: SleepLockGuard<'i, Option<InodeData>>,
    ) -> Self {
        if guard.is_none() {
            let sb = fs.superblock();
            let bh = fs.get_block(dev, sb.inode_block(ino));
            let bg = bh.lock();
            let dip = bg.data::<repr::InodeBlock>().dinode(ino);
            assert!(!dip.is_free(), "inode {ino} in use but free on disk");
            *guard = Some(InodeData::from_repr(dip));
        }
        Self {
            fs,
            dev,
            ino,
            guard,
        }
    }

    #[must_use]
    pub fn dev(&self) -> DeviceNo {
        self.dev
    }

    #[must_use]
    pub fn ino(&self) -> InodeNo {
        self.ino
    }

    #[must_use]
    pub fn ty(&self) -> InodeType {
        self.data().ty
    }

    #[must_use]
    pub fn nlink(&self) -> i16 {
        self.data().nlink
    }

    #[must_use]
    pub fn size(&self) -> u32 {
        self.data().size
    }

    #[must_use]
    pub fn major(&self) -> i16 {
        self.data().major
    }

    /// Copies out stat information.
    #[must_use]
    pub fn stat(&self) -> Stat {
        Stat {
            dev: self.dev,
            ino: self.ino,
            ty: self.ty(),
            nlink: self.nlink(),
            size: u64::from(self.size()),
        }
    }

    pub(crate) fn data(&self) -> &InodeData {
        self.guard.as_ref().unwrap()
    }

    pub(crate) fn data_mut(&mut self) -> &mut InodeData {
        self.guard.as_mut().unwrap()
    }

    /// Unlocks the inode (drop, spelled out).
    pub fn unlock(self) {}
}
