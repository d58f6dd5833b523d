use std::sync::{Arc, Mutex};

use tagfs::{
    fs::repr::{BPB, IPB},
    mkfs, BlockDevice, FileSystem, BLOCK_SIZE,
};

pub const DISK_BLOCKS: u32 = 1024;
pub const DISK_INODES: u32 = 64;

/// First bitmap block of the test geometry.
pub const BMAP_START: usize = 2 + (DISK_INODES as usize).div_ceil(IPB);

/// Blocks in use right after `mkfs`: boot, super, inode and bitmap
/// blocks, and the root directory's content block.
pub const FRESH_USED: u32 = BMAP_START as u32 + 1 + 1;

pub struct MemDisk {
    blocks: Mutex<Vec<[u8; BLOCK_SIZE]>>,
}

impl MemDisk {
    pub fn new(size: u32) -> Self {
        Self {
            blocks: Mutex::new(vec![[0; BLOCK_SIZE]; size as usize]),
        }
    }

    pub fn block(&self, index: usize) -> [u8; BLOCK_SIZE] {
        self.blocks.lock().unwrap()[index]
    }
}

impl BlockDevice for MemDisk {
    fn read_block(&self, index: usize, data: &mut [u8; BLOCK_SIZE]) {
        data.copy_from_slice(&self.blocks.lock().unwrap()[index]);
    }

    fn write_block(&self, index: usize, data: &[u8; BLOCK_SIZE]) {
        self.blocks.lock().unwrap()[index].copy_from_slice(data);
    }
}

pub fn fresh_disk() -> Arc<MemDisk> {
    let disk = Arc::new(MemDisk::new(DISK_BLOCKS));
    mkfs(&*disk, DISK_BLOCKS, DISK_INODES);
    disk
}

pub fn fresh_fs() -> (Arc<MemDisk>, FileSystem) {
    let disk = fresh_disk();
    let fs = FileSystem::new(disk.clone());
    (disk, fs)
}

/// Counts the blocks marked in use by the on-disk allocation bitmap.
pub fn used_blocks(disk: &MemDisk) -> u32 {
    assert!(DISK_BLOCKS as usize <= BPB);
    let bmap = disk.block(BMAP_START);
    (0..DISK_BLOCKS as usize)
        .filter(|&bno| bmap[bno / 8] & (1 << (bno % 8)) != 0)
        .count() as u32
}
