//! Inode content.
//!
//! The content associated with an inode lives in blocks on the disk.
//! The first [`NDIRECT`] block numbers are listed in `addrs`; the next
//! [`NINDIRECT`] are listed in the block named by `addrs[NDIRECT]`.

use core::mem::size_of;

use dataview::{Pod, PodMethods as _};

use crate::error::FsError;
use crate::fs::{
    data_block,
    repr::{self, BlockNo, InodeType, BLOCK_SIZE, MAXFILE, NDIRECT, NINDIRECT},
};

use super::LockedInode;

impl LockedInode<'_, '_> {
    /// Returns the disk address of the `i`th content block, allocating
    /// it (and the indirect block) on first use.
    ///
    /// Panics when `i` lies beyond the largest representable file.
    fn block_map(&mut self, i: usize) -> BlockNo {
        if i < NDIRECT {
            if let Some(bn) = self.data().addrs[i] {
                return bn;
            }
            let bn = data_block::alloc(self.fs, self.dev);
            self.data_mut().addrs[i] = Some(bn);
            return bn;
        }

        let i = i - NDIRECT;
        assert!(i < NINDIRECT, "content block index out of range");

        // Load the indirect block, allocating it on first use.
        let (ind, fresh) = match self.data().addrs[NDIRECT] {
            Some(bn) => (bn, false),
            None => {
                let bn = data_block::alloc(self.fs, self.dev);
                self.data_mut().addrs[NDIRECT] = Some(bn);
                (bn, true)
            }
        };

        if !fresh {
            let bh = self.fs.get_block(self.dev, ind);
            let bg = bh.lock();
            if let Some(bn) = bg.data::<repr::IndirectBlock>().get(i) {
                return bn;
            }
        }

        let bn = data_block::alloc(self.fs, self.dev);
        let bh = self.fs.get_block(self.dev, ind);
        let mut bg = bh.lock();
        bg.data_mut::<repr::IndirectBlock>().set(i, bn);
        bg.write();
        bn
    }

    /// Reads up to `dst.len()` bytes at byte offset `off`.
    ///
    /// Device inodes dispatch to the registered device handler. An
    /// offset beyond end of file is an error; a read crossing end of
    /// file is clamped. Returns the number of bytes read.
    pub fn read(&mut self, off: usize, dst: &mut [u8]) -> Result<usize, FsError> {
        if self.ty() == InodeType::Device {
            let dev = self.fs.device(self.major())?;
            return (dev.read)(dst);
        }

        let size = self.size() as usize;
        if off > size || off.checked_add(dst.len()).is_none() {
            return Err(FsError::InvalidOffset);
        }
        let n = usize::min(dst.len(), size - off);

        let mut tot = 0;
        while tot < n {
            let pos = off + tot;
            let bn = self.block_map(pos / BLOCK_SIZE);
            let bh = self.fs.get_block(self.dev, bn);
            let bg = bh.lock();
            let m = usize::min(n - tot, BLOCK_SIZE - pos % BLOCK_SIZE);
            dst[tot..tot + m].copy_from_slice(&bg.bytes()[pos % BLOCK_SIZE..][..m]);
            tot += m;
        }
        Ok(tot)
    }

    /// Reads the value of type `T` stored at byte offset `off`.
    pub(crate) fn read_as<T: Pod>(&mut self, off: usize) -> Result<T, FsError> {
        let mut value = T::zeroed();
        let read = self.read(off, value.as_bytes_mut())?;
        if read != size_of::<T>() {
            return Err(FsError::InvalidOffset);
        }
        Ok(value)
    }

    /// Writes `src` at byte offset `off`, growing the file as needed.
    ///
    /// Device inodes dispatch to the registered device handler. An
    /// offset beyond end of file is an error. The write is clamped at
    /// the largest representable file; the returned count falls short
    /// of `src.len()` when that happens.
    pub fn write(&mut self, off: usize, src: &[u8]) -> Result<usize, FsError> {
        if self.ty() == InodeType::Device {
            let dev = self.fs.device(self.major())?;
            return (dev.write)(src);
        }

        let size = self.size() as usize;
        if off > size || off.checked_add(src.len()).is_none() {
            return Err(FsError::InvalidOffset);
        }
        let n = usize::min(src.len(), MAXFILE * BLOCK_SIZE - off);

        let mut tot = 0;
        while tot < n {
            let pos = off + tot;
            let bn = self.block_map(pos / BLOCK_SIZE);
            let bh = self.fs.get_block(self.dev, bn);
            let mut bg = bh.lock();
            let m = usize::min(n - tot, BLOCK_SIZE - pos % BLOCK_SIZE);
            bg.bytes_mut()[pos % BLOCK_SIZE..][..m].copy_from_slice(&src[tot..tot + m]);
            bg.write();
            tot += m;
        }

        if off + tot > size {
            self.data_mut().size = u32::try_from(off + tot).unwrap();
        }
        // The loop may have grown `addrs` even when the size is
        // unchanged, so the inode goes back to disk either way.
        self.update();
        Ok(tot)
    }

    /// Writes the value `data` at byte offset `off`.
    pub(crate) fn write_data<T: Pod>(&mut self, off: usize, data: &T) -> Result<(), FsError> {
        let written = self.write(off, data.as_bytes())?;
        if written != size_of::<T>() {
            return Err(FsError::FileTooLarge);
        }
        Ok(())
    }

    /// Copies the in-memory inode out to its slot in the inode blocks.
    ///
    /// Must be called after every change to a field that lives on disk.
    pub fn update(&self) {
        let sb = self.fs.superblock();
        let bh = self.fs.get_block(self.dev, sb.inode_block(self.ino));
        let mut bg = bh.lock();
        self.data()
            .write_repr(bg.data_mut::<repr::InodeBlock>().dinode_mut(self.ino));
        bg.write();
    }

    /// Discards the file's content: every direct block, the indirect
    /// chain, and the tag block, leaving a zero-length file.
    pub fn truncate(&mut self) {
        for i in 0..NDIRECT {
            if let Some(bn) = self.data_mut().addrs[i].take() {
                data_block::free(self.fs, self.dev, bn);
            }
        }

        if let Some(ind) = self.data_mut().addrs[NDIRECT].take() {
            {
                let bh = self.fs.get_block(self.dev, ind);
                let mut bg = bh.lock();
                for bn in bg.data_mut::<repr::IndirectBlock>().drain() {
                    data_block::free(self.fs, self.dev, bn);
                }
            }
            data_block::free(self.fs, self.dev, ind);
        }

        if let Some(bn) = self.data_mut().tags.take() {
            data_block::free(self.fs, self.dev, bn);
        }

        self.data_mut().size = 0;
        self.update();
    }

    /// Marks the on-disk inode free and invalidates the in-memory copy.
    pub(super) fn free_on_disk(mut self) {
        self.data_mut().ty = InodeType::Free;
        self.update();
        *self.guard = None;
    }
}
