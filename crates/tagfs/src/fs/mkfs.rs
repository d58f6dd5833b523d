//! Disk image construction.
//!
//! Lays an empty file system onto a raw device: the boot hole, the
//! super block, the inode blocks with the root directory in inode 1,
//! the allocation bitmap, and one data block holding the root's `.`
//! and `..` entries (both naming the root itself).

use core::mem::size_of;

use dataview::PodMethods as _;

use bio::{BlockDevice, BLOCK_SIZE};

use super::repr::{
    BlockNo, BmapBlock, Dinode, DirEntry, InodeBlock, InodeNo, InodeType, SuperBlock, BPB,
};

/// Formats `device` as an empty file system of `size` blocks with room
/// for `ninodes` inodes.
pub fn mkfs(device: &dyn BlockDevice, size: u32, ninodes: u32) {
    let sb = SuperBlock {
        magic: SuperBlock::FS_MAGIC,
        size,
        nblocks: 0,
        ninodes,
    };
    let nmeta = sb.data_start();
    assert!(nmeta < size, "disk too small for its own metadata");
    let sb = SuperBlock {
        nblocks: size - nmeta,
        ..sb
    };

    log::debug!(
        "mkfs: {} meta blocks ({} inode, {} bitmap), {} data blocks, {} total",
        nmeta,
        sb.num_inode_blocks(),
        sb.num_bitmap_blocks(),
        sb.nblocks,
        size
    );

    for bno in 0..size {
        device.write_block(bno as usize, &[0; BLOCK_SIZE]);
    }

    let mut block = [0; BLOCK_SIZE];
    block[..size_of::<SuperBlock>()].copy_from_slice(sb.as_bytes());
    device.write_block(SuperBlock::BLOCK_NO.as_index(), &block);

    // The root directory: inode 1, one content block, two entries.
    let root_block = BlockNo::new(nmeta);
    let mut dino = Dinode::zeroed();
    dino.ty = InodeType::Dir as i16;
    dino.nlink = 1;
    dino.size = (2 * size_of::<DirEntry>()) as u32;
    dino.addrs[0] = root_block.value();

    let mut iblock = InodeBlock::zeroed();
    *iblock.dinode_mut(InodeNo::ROOT) = dino;
    device.write_block(
        sb.inode_block(InodeNo::ROOT).as_index(),
        iblock.as_bytes().try_into().unwrap(),
    );

    let mut dot = DirEntry::zeroed();
    dot.set_name(b".");
    dot.set_inum(Some(InodeNo::ROOT));
    let mut dotdot = DirEntry::zeroed();
    dotdot.set_name(b"..");
    dotdot.set_inum(Some(InodeNo::ROOT));

    let mut block = [0; BLOCK_SIZE];
    block[..size_of::<DirEntry>()].copy_from_slice(dot.as_bytes());
    block[size_of::<DirEntry>()..2 * size_of::<DirEntry>()].copy_from_slice(dotdot.as_bytes());
    device.write_block(root_block.as_index(), &block);

    // Every meta block plus the root's content block is in use.
    let used = nmeta as usize + 1;
    assert!(used <= BPB, "metadata overflows the first bitmap block");
    let mut bmap = BmapBlock::zeroed();
    for bno in 0..used {
        bmap.set_bit(bno);
    }
    device.write_block(
        sb.bmap_block(0).as_index(),
        bmap.as_bytes().try_into().unwrap(),
    );
}
