use alloc::sync::{Arc, Weak};

use crate::{param::NINODE, sync::SleepLock};

use super::{InodeDataPtr, InodeDataWeak};
use crate::fs::{DeviceNo, InodeNo};

/// The in-memory inode table.
///
/// One spinlock guards identity; a slot holds only a weak reference, so
/// the strong count of the shared data is exactly the inode's reference
/// count and a dead weak reference marks the slot reusable.
pub(crate) struct InodeTable {
    slots: [Option<(DeviceNo, InodeNo, InodeDataWeak)>; NINODE],
}

impl InodeTable {
    pub(crate) const fn new() -> Self {
        Self {
            slots: [const { None }; NINODE],
        }
    }

    /// Finds the live entry for `(dev, ino)` or claims a free slot.
    ///
    /// Identity only: never reads the disk. Returns `None` when every
    /// slot is in use.
    pub(super) fn get_or_insert(&mut self, dev: DeviceNo, ino: InodeNo) -> Option<InodeDataPtr> {
        let mut empty = None;
        for (i, entry) in self.slots.iter_mut().enumerate() {
            let Some(body) = entry else {
                empty.get_or_insert(i);
                continue;
            };
            if let Some(data) = Weak::upgrade(&body.2) {
                if body.0 == dev && body.1 == ino {
                    return Some(data);
                }
                continue;
            }
            // The last holder is gone; the slot is reusable.
            *entry = None;
            empty.get_or_insert(i);
        }

        let i = empty?;
        let data = Arc::new(SleepLock::new(None));
        self.slots[i] = Some((dev, ino, Arc::downgrade(&data)));
        Some(data)
    }
}
