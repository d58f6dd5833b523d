//! Whole-stack tests of the namespace, file I/O, and reclamation.

mod common;

use std::thread;

use common::{fresh_fs, used_blocks, FRESH_USED};
use tagfs::{
    file::Device, fs::repr::InodeType, syscall, FsError, OpenFlags, Process, BLOCK_SIZE,
};

#[test]
fn write_then_read_back() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/a",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    assert_eq!(syscall::write(&proc, fd, b"hello").unwrap(), 5);
    syscall::close(&mut proc, fd).unwrap();

    let fd = syscall::open(&fs, &mut proc, b"/a", OpenFlags::RDONLY).unwrap();
    let mut buf = [0; 16];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf[..5], b"hello");

    let st = syscall::fstat(&proc, fd).unwrap();
    assert_eq!(st.size, 5);
    assert_eq!(st.ty, InodeType::File);
    assert_eq!(st.nlink, 1);
}

#[test]
fn read_write_respect_open_mode() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/a",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    let mut buf = [0; 8];
    assert_eq!(
        syscall::read(&proc, fd, &mut buf),
        Err(FsError::NotReadable)
    );
    syscall::close(&mut proc, fd).unwrap();

    let fd = syscall::open(&fs, &mut proc, b"/a", OpenFlags::RDONLY).unwrap();
    assert_eq!(syscall::write(&proc, fd, b"x"), Err(FsError::NotWritable));

    assert_eq!(
        syscall::read(&proc, 7, &mut buf),
        Err(FsError::BadFileDescriptor)
    );
    assert_eq!(
        syscall::read(&proc, 99, &mut buf),
        Err(FsError::BadFileDescriptor)
    );
}

#[test]
fn create_is_idempotent_for_regular_files() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd1 = syscall::open(
        &fs,
        &mut proc,
        b"/f",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    assert_eq!(syscall::write(&proc, fd1, b"data").unwrap(), 4);

    let fd2 = syscall::open(&fs, &mut proc, b"/f", OpenFlags::CREATE).unwrap();
    let ino1 = syscall::fstat(&proc, fd1).unwrap().ino;
    let ino2 = syscall::fstat(&proc, fd2).unwrap().ino;
    assert_eq!(ino1, ino2);
    assert_eq!(syscall::fstat(&proc, fd2).unwrap().size, 4);

    // A directory under the same name is a different story.
    assert_eq!(syscall::mkdir(&fs, &proc, b"/f"), Err(FsError::AlreadyExists));
}

#[test]
fn directories_create_and_unlink() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    syscall::mkdir(&fs, &proc, b"/d").unwrap();
    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/d/f",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    syscall::close(&mut proc, fd).unwrap();

    syscall::unlink(&fs, &proc, b"/d/f").unwrap();
    syscall::unlink(&fs, &proc, b"/d").unwrap();
    assert_eq!(
        syscall::open(&fs, &mut proc, b"/d", OpenFlags::RDONLY),
        Err(FsError::EntryNotFound)
    );
}

#[test]
fn unlink_refuses_nonempty_directories_and_dots() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    syscall::mkdir(&fs, &proc, b"/d").unwrap();
    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/d/f",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    syscall::close(&mut proc, fd).unwrap();

    assert_eq!(
        syscall::unlink(&fs, &proc, b"/d"),
        Err(FsError::DirectoryNotEmpty)
    );
    // The refused unlink left the tree alone.
    let fd = syscall::open(&fs, &mut proc, b"/d/f", OpenFlags::RDONLY).unwrap();
    syscall::close(&mut proc, fd).unwrap();

    assert_eq!(
        syscall::unlink(&fs, &proc, b"/d/."),
        Err(FsError::InvalidName)
    );
    assert_eq!(
        syscall::unlink(&fs, &proc, b"/d/.."),
        Err(FsError::InvalidName)
    );
    assert_eq!(syscall::unlink(&fs, &proc, b"/"), Err(FsError::EntryNotFound));
}

#[test]
fn hard_links_share_the_inode() {
    let (disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/a",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    assert_eq!(syscall::write(&proc, fd, b"hello").unwrap(), 5);
    syscall::close(&mut proc, fd).unwrap();

    syscall::link(&fs, &proc, b"/a", b"/b").unwrap();

    let fa = syscall::open(&fs, &mut proc, b"/a", OpenFlags::RDONLY).unwrap();
    let fb = syscall::open(&fs, &mut proc, b"/b", OpenFlags::RDONLY).unwrap();
    let sa = syscall::fstat(&proc, fa).unwrap();
    let sb = syscall::fstat(&proc, fb).unwrap();
    assert_eq!(sa.ino, sb.ino);
    assert_eq!(sa.nlink, 2);
    syscall::close(&mut proc, fa).unwrap();
    syscall::close(&mut proc, fb).unwrap();

    syscall::unlink(&fs, &proc, b"/a").unwrap();
    let fd = syscall::open(&fs, &mut proc, b"/b", OpenFlags::RDONLY).unwrap();
    let mut buf = [0; 8];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 5);
    assert_eq!(&buf[..5], b"hello");
    assert_eq!(syscall::fstat(&proc, fd).unwrap().nlink, 1);
    syscall::close(&mut proc, fd).unwrap();

    syscall::unlink(&fs, &proc, b"/b").unwrap();
    assert_eq!(used_blocks(&disk), FRESH_USED);
}

#[test]
fn linking_a_directory_fails() {
    let (_disk, fs) = fresh_fs();
    let proc = Process::new(&fs);

    syscall::mkdir(&fs, &proc, b"/d").unwrap();
    assert_eq!(
        syscall::link(&fs, &proc, b"/d", b"/e"),
        Err(FsError::IsADirectory)
    );
    assert_eq!(
        syscall::link(&fs, &proc, b"/d/x", b"/y"),
        Err(FsError::EntryNotFound)
    );
}

#[test]
fn link_failure_reverts_the_link_count() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/a",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    syscall::close(&mut proc, fd).unwrap();
    syscall::mkdir(&fs, &proc, b"/d").unwrap();

    // Destination name is taken.
    assert_eq!(
        syscall::link(&fs, &proc, b"/a", b"/d"),
        Err(FsError::AlreadyExists)
    );
    // Destination parent is missing.
    assert_eq!(
        syscall::link(&fs, &proc, b"/a", b"/nope/b"),
        Err(FsError::EntryNotFound)
    );

    let fd = syscall::open(&fs, &mut proc, b"/a", OpenFlags::RDONLY).unwrap();
    assert_eq!(syscall::fstat(&proc, fd).unwrap().nlink, 1);
}

#[test]
fn growth_across_the_indirect_boundary() {
    let (disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let blocks = 40_usize;
    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/big",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    for i in 0..blocks {
        let chunk = [i as u8; BLOCK_SIZE];
        assert_eq!(syscall::write(&proc, fd, &chunk).unwrap(), BLOCK_SIZE);
    }
    syscall::close(&mut proc, fd).unwrap();

    // 40 content blocks plus the indirect block.
    assert_eq!(used_blocks(&disk), FRESH_USED + blocks as u32 + 1);

    let fd = syscall::open(&fs, &mut proc, b"/big", OpenFlags::RDONLY).unwrap();
    assert_eq!(
        syscall::fstat(&proc, fd).unwrap().size,
        (blocks * BLOCK_SIZE) as u64
    );
    for i in 0..blocks {
        let mut chunk = [0; BLOCK_SIZE];
        assert_eq!(syscall::read(&proc, fd, &mut chunk).unwrap(), BLOCK_SIZE);
        assert_eq!(chunk, [i as u8; BLOCK_SIZE], "block {i} content");
    }
    syscall::close(&mut proc, fd).unwrap();

    syscall::unlink(&fs, &proc, b"/big").unwrap();
    assert_eq!(used_blocks(&disk), FRESH_USED);
}

#[test]
fn writes_stop_at_the_largest_file() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);
    let max = tagfs::fs::repr::MAXFILE * BLOCK_SIZE;

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/big",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    let chunk = [7; 4 * BLOCK_SIZE];
    let mut written = 0;
    while written + chunk.len() <= max {
        assert_eq!(syscall::write(&proc, fd, &chunk).unwrap(), chunk.len());
        written += chunk.len();
    }
    assert_eq!(written, max);

    assert_eq!(syscall::write(&proc, fd, b"x"), Err(FsError::FileTooLarge));
    assert_eq!(syscall::fstat(&proc, fd).unwrap().size, max as u64);
}

#[test]
fn unlinked_open_file_lives_until_close() {
    let (disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/a",
        OpenFlags::CREATE | OpenFlags::RDWR,
    )
    .unwrap();
    assert_eq!(syscall::write(&proc, fd, b"persist").unwrap(), 7);

    syscall::unlink(&fs, &proc, b"/a").unwrap();
    assert_eq!(
        syscall::open(&fs, &mut proc, b"/a", OpenFlags::RDONLY),
        Err(FsError::EntryNotFound)
    );

    // Still readable through the open descriptor.
    let dup = syscall::dup(&mut proc, fd).unwrap();
    syscall::close(&mut proc, fd).unwrap();
    let mut buf = [0; 16];
    assert_eq!(syscall::read(&proc, dup, &mut buf).unwrap(), 0);

    // The content block is only reclaimed once the last descriptor goes.
    assert_eq!(used_blocks(&disk), FRESH_USED + 1);
    syscall::close(&mut proc, dup).unwrap();
    assert_eq!(used_blocks(&disk), FRESH_USED);
}

#[test]
fn relative_paths_follow_the_working_directory() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    syscall::mkdir(&fs, &proc, b"/d").unwrap();
    syscall::chdir(&fs, &mut proc, b"/d").unwrap();

    let fd = syscall::open(
        &fs,
        &mut proc,
        b"f",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    assert_eq!(syscall::write(&proc, fd, b"rel").unwrap(), 3);
    syscall::close(&mut proc, fd).unwrap();

    let fd = syscall::open(&fs, &mut proc, b"/d/f", OpenFlags::RDONLY).unwrap();
    let mut buf = [0; 8];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], b"rel");
    syscall::close(&mut proc, fd).unwrap();

    syscall::chdir(&fs, &mut proc, b"..").unwrap();
    let fd = syscall::open(&fs, &mut proc, b"d/f", OpenFlags::RDONLY).unwrap();
    syscall::close(&mut proc, fd).unwrap();

    assert_eq!(
        syscall::chdir(&fs, &mut proc, b"/d/f"),
        Err(FsError::NotADirectory)
    );
}

#[test]
fn directories_only_open_read_only() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    syscall::mkdir(&fs, &proc, b"/d").unwrap();
    assert_eq!(
        syscall::open(&fs, &mut proc, b"/d", OpenFlags::WRONLY),
        Err(FsError::IsADirectory)
    );
    assert_eq!(
        syscall::open(&fs, &mut proc, b"/d", OpenFlags::RDWR),
        Err(FsError::IsADirectory)
    );

    // Reading a directory yields its raw entries; "." and ".." first.
    let fd = syscall::open(&fs, &mut proc, b"/d", OpenFlags::RDONLY).unwrap();
    let mut buf = [0; 64];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 32);
    assert_eq!(&buf[2..3], b".");
    assert_eq!(&buf[18..20], b"..");
}

#[test]
fn path_elements_truncate_to_the_name_field() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    // 14 bytes is the full field; anything longer collapses onto it.
    let fd = syscall::open(
        &fs,
        &mut proc,
        b"/abcdefghijklmn",
        OpenFlags::CREATE | OpenFlags::WRONLY,
    )
    .unwrap();
    syscall::close(&mut proc, fd).unwrap();

    let fd = syscall::open(&fs, &mut proc, b"/abcdefghijklmnOVERFLOW", OpenFlags::RDONLY).unwrap();
    syscall::close(&mut proc, fd).unwrap();
}

#[test]
fn device_files_dispatch_to_the_switch_table() {
    let (_disk, fs) = fresh_fs();
    let mut proc = Process::new(&fs);

    fn zed_read(dst: &mut [u8]) -> Result<usize, FsError> {
        dst.fill(b'z');
        Ok(dst.len())
    }
    fn zed_write(src: &[u8]) -> Result<usize, FsError> {
        Ok(src.len())
    }

    syscall::mknod(&fs, &proc, b"/zed", 3, 0).unwrap();

    // No handler registered yet.
    assert_eq!(
        syscall::open(&fs, &mut proc, b"/zed", OpenFlags::RDWR),
        Err(FsError::NoDevice)
    );

    fs.register_device(
        3,
        Device {
            read: zed_read,
            write: zed_write,
        },
    );
    let fd = syscall::open(&fs, &mut proc, b"/zed", OpenFlags::RDWR).unwrap();
    assert_eq!(syscall::fstat(&proc, fd).unwrap().ty, InodeType::Device);

    let mut buf = [0; 4];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 4);
    assert_eq!(&buf, b"zzzz");
    assert_eq!(syscall::write(&proc, fd, b"ignored").unwrap(), 7);
}

#[test]
fn contents_survive_a_remount() {
    let disk = common::fresh_disk();
    {
        let fs = tagfs::FileSystem::new(disk.clone());
        let mut proc = Process::new(&fs);
        let fd = syscall::open(
            &fs,
            &mut proc,
            b"/keep",
            OpenFlags::CREATE | OpenFlags::WRONLY,
        )
        .unwrap();
        assert_eq!(syscall::write(&proc, fd, b"durable").unwrap(), 7);
    }

    let fs = tagfs::FileSystem::new(disk.clone());
    let mut proc = Process::new(&fs);
    let fd = syscall::open(&fs, &mut proc, b"/keep", OpenFlags::RDONLY).unwrap();
    let mut buf = [0; 16];
    assert_eq!(syscall::read(&proc, fd, &mut buf).unwrap(), 7);
    assert_eq!(&buf[..7], b"durable");
}

#[test]
fn concurrent_processes_share_the_tree() {
    let (_disk, fs) = fresh_fs();

    thread::scope(|s| {
        for t in 0..4 {
            let fs = &fs;
            s.spawn(move || {
                let mut proc = Process::new(fs);
                let name = format!("/file{t}");
                let fd = syscall::open(
                    fs,
                    &mut proc,
                    name.as_bytes(),
                    OpenFlags::CREATE | OpenFlags::RDWR,
                )
                .unwrap();
                let body = vec![t as u8; 3 * BLOCK_SIZE];
                assert_eq!(syscall::write(&proc, fd, &body).unwrap(), body.len());
                syscall::close(&mut proc, fd).unwrap();

                let fd = syscall::open(fs, &mut proc, name.as_bytes(), OpenFlags::RDONLY).unwrap();
                let mut back = vec![0; 3 * BLOCK_SIZE];
                assert_eq!(syscall::read(&proc, fd, &mut back).unwrap(), back.len());
                assert_eq!(back, body);
            });
        }
    });

    let mut proc = Process::new(&fs);
    for t in 0..4 {
        let name = format!("/file{t}");
        let fd = syscall::open(&fs, &mut proc, name.as_bytes(), OpenFlags::RDONLY).unwrap();
        assert_eq!(
            syscall::fstat(&proc, fd).unwrap().size,
            (3 * BLOCK_SIZE) as u64
        );
        syscall::close(&mut proc, fd).unwrap();
    }
}
