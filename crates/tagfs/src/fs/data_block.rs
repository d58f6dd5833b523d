use super::{
    repr::{BlockNo, BmapBlock, BPB},
    DeviceNo, FileSystem,
};

/// Zeros a block on disk.
pub(super) fn zero(fs: &FileSystem, dev: DeviceNo, bno: BlockNo) {
    let bh = fs.get_block(dev, bno);
    let mut bg = bh.lock();
    bg.fill_zero();
    bg.write();
}

/// Allocates a zeroed data block: the first clear bit in the bitmap.
///
/// Panics when no block is free.
pub(super) fn alloc(fs: &FileSystem, dev: DeviceNo) -> BlockNo {
    let sb = fs.superblock();
    let size = sb.size as usize;
    for base in (0..size).step_by(BPB) {
        let bh = fs.get_block(dev, sb.bmap_block(base));
        let mut bg = bh.lock();
        let Some(bit) = (0..BPB)
            .take_while(|bi| base + bi < size)
            .find(|bi| !bg.data::<BmapBlock>().bit(*bi))
        else {
            continue;
        };
        bg.data_mut::<BmapBlock>().set_bit(bit);
        bg.write();
        drop(bg);
        drop(bh);

        let bno = BlockNo::new(u32::try_from(base + bit).unwrap());
        zero(fs, dev, bno);
        return bno;
    }
    log::warn!("out of data blocks");
    panic!("out of data blocks");
}

/// Frees a disk block: zeroes it and clears its bitmap bit.
///
/// Panics when the block was already free.
pub(super) fn free(fs: &FileSystem, dev: DeviceNo, bno: BlockNo) {
    zero(fs, dev, bno);

    let sb = fs.superblock();
    let bh = fs.get_block(dev, sb.bmap_block(bno.as_index()));
    let mut bg = bh.lock();
    let bit = bno.as_index() % BPB;
    assert!(bg.data::<BmapBlock>().bit(bit), "freeing a free block");
    bg.data_mut::<BmapBlock>().clear_bit(bit);
    bg.write();
}
