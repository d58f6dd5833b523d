//! Buffered block I/O.
//!
//! The cache holds a fixed number of in-memory copies of disk blocks so
//! that hot blocks are read once and so that concurrent users of one
//! block are serialized by its buffer lock. [`BlockCache::get`] returns a
//! counted handle; locking the handle yields the block bytes, reading
//! them from the device on first use. Writes go through to the device
//! when the holder calls [`BlockGuard::write`].
//!
//! An unreferenced buffer keeps its contents and is recycled least
//! recently used when a new block needs a slot.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::{sync::Arc, vec::Vec};

use dataview::{Pod, PodMethods as _};
use spin::{Mutex, MutexGuard};

/// Size of one disk block in bytes.
pub const BLOCK_SIZE: usize = 512;

/// A device addressable in [`BLOCK_SIZE`] units.
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, index: usize, data: &mut [u8; BLOCK_SIZE]);
    fn write_block(&self, index: usize, data: &[u8; BLOCK_SIZE]);
}

impl<T: BlockDevice + ?Sized> BlockDevice for Arc<T> {
    fn read_block(&self, index: usize, data: &mut [u8; BLOCK_SIZE]) {
        (**self).read_block(index, data);
    }

    fn write_block(&self, index: usize, data: &[u8; BLOCK_SIZE]) {
        (**self).write_block(index, data);
    }
}

/// Block bytes, aligned so they can be viewed as any on-disk structure.
#[repr(C, align(8))]
struct BlockBytes([u8; BLOCK_SIZE]);

struct Buf {
    /// `true` once the bytes have been read from the device.
    valid: bool,
    bytes: BlockBytes,
}

struct Slot {
    /// Block index held by this slot, `usize::MAX` when never used.
    index: usize,
    /// Outstanding [`BlockHandle`]s. A slot with `refcnt > 0` keeps its
    /// identity.
    refcnt: u32,
    /// Recency stamp taken when `refcnt` drops to zero.
    stamp: u64,
    buf: Arc<Mutex<Buf>>,
}

struct SlotList {
    slots: Vec<Slot>,
    tick: u64,
}

/// A write-through cache of disk blocks.
pub struct BlockCache<D> {
    device: D,
    list: Mutex<SlotList>,
}

impl<D: BlockDevice> BlockCache<D> {
    /// Creates a cache of `nbuf` buffers over `device`.
    pub fn new(device: D, nbuf: usize) -> Self {
        assert!(nbuf > 0);
        let slots = (0..nbuf)
            .map(|_| Slot {
                index: usize::MAX,
                refcnt: 0,
                stamp: 0,
                buf: Arc::new(Mutex::new(Buf {
                    valid: false,
                    bytes: BlockBytes([0; BLOCK_SIZE]),
                })),
            })
            .collect();
        Self {
            device,
            list: Mutex::new(SlotList { slots, tick: 0 }),
        }
    }

    /// Returns a handle on the buffer holding block `index`, or `None`
    /// when every buffer is referenced.
    ///
    /// No device I/O happens here; the block is read when the handle is
    /// first locked.
    pub fn try_get(&self, index: usize) -> Option<BlockHandle<'_, D>> {
        let mut list = self.list.lock();

        if let Some(slot) = list.slots.iter_mut().find(|s| s.index == index) {
            slot.refcnt += 1;
            let buf = Arc::clone(&slot.buf);
            return Some(BlockHandle {
                cache: self,
                index,
                buf,
            });
        }

        // Not cached: recycle the least recently used unreferenced slot.
        let slot = list
            .slots
            .iter_mut()
            .filter(|s| s.refcnt == 0)
            .min_by_key(|s| s.stamp)?;
        slot.index = index;
        slot.refcnt = 1;
        slot.buf.lock().valid = false;
        let buf = Arc::clone(&slot.buf);
        Some(BlockHandle {
            cache: self,
            index,
            buf,
        })
    }

    /// Like [`Self::try_get`], but panics when every buffer is in use.
    pub fn get(&self, index: usize) -> BlockHandle<'_, D> {
        match self.try_get(index) {
            Some(handle) => handle,
            None => panic!("block cache exhausted"),
        }
    }
}

/// A counted reference to one cached block.
pub struct BlockHandle<'a, D> {
    cache: &'a BlockCache<D>,
    index: usize,
    buf: Arc<Mutex<Buf>>,
}

impl<D> Drop for BlockHandle<'_, D> {
    fn drop(&mut self) {
        let mut list = self.cache.list.lock();
        list.tick += 1;
        let tick = list.tick;
        let slot = list
            .slots
            .iter_mut()
            .find(|s| s.index == self.index)
            .expect("referenced slot must stay in the cache");
        slot.refcnt -= 1;
        if slot.refcnt == 0 {
            slot.stamp = tick;
        }
    }
}

impl<'a, D: BlockDevice> BlockHandle<'a, D> {
    /// The block number this handle refers to.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Locks the buffer and returns its bytes, reading them from the
    /// device if this is the first access since the slot was recycled.
    pub fn lock(&self) -> BlockGuard<'_, D> {
        let mut buf = self.buf.lock();
        if !buf.valid {
            self.cache.device.read_block(self.index, &mut buf.bytes.0);
            buf.valid = true;
        }
        BlockGuard {
            device: &self.cache.device,
            index: self.index,
            buf,
        }
    }
}

/// Exclusive access to the bytes of one cached block.
pub struct BlockGuard<'a, D> {
    device: &'a D,
    index: usize,
    buf: MutexGuard<'a, Buf>,
}

impl<D: BlockDevice> BlockGuard<'_, D> {
    #[must_use]
    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.buf.bytes.0
    }

    #[must_use]
    pub fn bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.buf.bytes.0
    }

    /// Views the block as a POD structure.
    #[must_use]
    pub fn data<T: Pod>(&self) -> &T {
        self.bytes().as_data_view().get(0)
    }

    /// Views the block as a mutable POD structure.
    #[must_use]
    pub fn data_mut<T: Pod>(&mut self) -> &mut T {
        self.bytes_mut().as_data_view_mut().get_mut(0)
    }

    pub fn fill_zero(&mut self) {
        self.buf.bytes.0.fill(0);
    }

    /// Writes the buffer out to the device.
    pub fn write(&mut self) {
        self.device.write_block(self.index, &self.buf.bytes.0);
    }
}
