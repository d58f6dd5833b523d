//! Per-file tags.
//!
//! A regular file may carry one block of key/value records, named by
//! the inode's tag block address. The block is allocated on the first
//! successful set and freed with the rest of the content on
//! truncation. Each mutation is a single buffered write, so an
//! overwrite of an existing key is atomic.

use crate::error::FsError;
use crate::fs::{
    data_block,
    repr::{BlockNo, TagBlock, TAG_KEY_MAX, TAG_VALUE_MAX},
};

use super::LockedInode;

fn check_key(key: &[u8]) -> Result<(), FsError> {
    if key.is_empty() || key.len() > TAG_KEY_MAX || key.contains(&0) {
        return Err(FsError::InvalidTagKey);
    }
    Ok(())
}

impl LockedInode<'_, '_> {
    /// Attaches `key` -> `value`, overwriting a present `key` in place.
    pub fn set_tag(&mut self, key: &[u8], value: &[u8]) -> Result<(), FsError> {
        check_key(key)?;
        if value.len() > TAG_VALUE_MAX {
            return Err(FsError::TagValueTooLarge);
        }

        let bn = self.tag_block_or_alloc();
        let bh = self.fs.get_block(self.dev, bn);
        let mut bg = bh.lock();
        let tags = bg.data_mut::<TagBlock>();
        let slot = match tags.position(key) {
            Some(i) => i,
            None => tags.first_free().ok_or(FsError::TagBlockFull)?,
        };
        tags.record_mut(slot).set(key, value);
        bg.write();
        Ok(())
    }

    /// Copies the value of `key` into `dst`.
    ///
    /// Returns the stored length, which may exceed `dst.len()`; a
    /// caller seeing that retries with a larger buffer.
    pub fn get_tag(&mut self, key: &[u8], dst: &mut [u8]) -> Result<usize, FsError> {
        check_key(key)?;
        let bn = self.data().tags.ok_or(FsError::TagNotFound)?;
        let bh = self.fs.get_block(self.dev, bn);
        let bg = bh.lock();
        let tags = bg.data::<TagBlock>();
        let slot = tags.position(key).ok_or(FsError::TagNotFound)?;
        let value = tags.record(slot).value();
        let n = usize::min(value.len(), dst.len());
        dst[..n].copy_from_slice(&value[..n]);
        Ok(value.len())
    }

    /// Detaches the tag `key`.
    pub fn remove_tag(&mut self, key: &[u8]) -> Result<(), FsError> {
        check_key(key)?;
        let bn = self.data().tags.ok_or(FsError::TagNotFound)?;
        let bh = self.fs.get_block(self.dev, bn);
        let mut bg = bh.lock();
        let tags = bg.data_mut::<TagBlock>();
        let slot = tags.position(key).ok_or(FsError::TagNotFound)?;
        tags.record_mut(slot).clear();
        bg.write();
        Ok(())
    }

    fn tag_block_or_alloc(&mut self) -> BlockNo {
        if let Some(bn) = self.data().tags {
            return bn;
        }
        let bn = data_block::alloc(self.fs, self.dev);
        self.data_mut().tags = Some(bn);
        self.update();
        bn
    }
}
