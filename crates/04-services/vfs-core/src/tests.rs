use super::mem::MAX_FILE_LEN;
use super::{encode, IoError, MemDevice, NodeKind, Vfs, VfsConfig, FIRST_FD};
use pretty_assertions::assert_eq;
use service_abi::{errcode, flags, whence};

const MAKEFILE_LEN: usize = 0x2A0;

fn console() -> Vfs {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut ms0 = MemDevice::new("ms0");
    ms0.seed_dir("PSP").expect("seed PSP");
    let mut disc0 = MemDevice::read_only("disc0");
    disc0
        .seed_file("PSP_GAME/PARAM.SFO", b"\0PSF")
        .expect("seed PARAM.SFO");
    let mut host0 = MemDevice::new("host0");
    host0
        .seed_file("Makefile", &[b'#'; MAKEFILE_LEN])
        .expect("seed Makefile");

    Vfs::builder(VfsConfig {
        initial_dir: Some("host0:/".into()),
        ..VfsConfig::default()
    })
    .mount(ms0, &["fatms0"])
    .and_then(|b| b.mount(disc0, &["umd0", "umd1"]))
    .and_then(|b| b.mount(host0, &[]))
    .and_then(|b| b.build())
    .expect("console")
}

fn create(vfs: &mut Vfs, path: &str) -> i32 {
    let fd = vfs
        .open(path, flags::CREAT | flags::WRONLY, 0o777)
        .expect("create");
    vfs.close(fd).expect("close");
    fd
}

#[test]
fn create_then_open_read_only() {
    let mut vfs = console();
    create(&mut vfs, "ms0:/PSP/__testfile1.txt");
    let fd = vfs
        .open("MS0:/psp/__TESTFILE1.TXT", flags::RDONLY, 0)
        .expect("open");
    assert_eq!(fd, FIRST_FD);
    vfs.close(fd).expect("close");
    vfs.remove("ms0:/PSP/__testfile1.txt").expect("remove");
    assert!(matches!(
        vfs.open("ms0:/PSP/__testfile1.txt", flags::RDONLY, 0),
        Err(IoError::NotFound(_))
    ));
}

#[test]
fn aliases_share_one_device() {
    let mut vfs = console();
    create(&mut vfs, "fatms0:/PSP/alias.bin");
    let fd = vfs.open("ms0:/PSP/alias.bin", flags::RDONLY, 0).expect("open");
    vfs.close(fd).expect("close");
    let fd = vfs
        .open("umd1:/PSP_GAME/PARAM.SFO", flags::RDONLY, 0)
        .expect("umd alias");
    assert_eq!(vfs.read(fd, 16).expect("read"), b"\0PSF");
}

#[test]
fn missing_parent_fails_create() {
    let mut vfs = console();
    let err = vfs
        .open("ms0:/PSP/no_dir\\file.txt", flags::CREAT | flags::WRONLY, 0)
        .unwrap_err();
    assert_eq!(err.code(), errcode::FILE_NOT_FOUND);
    assert_eq!(vfs.open_files(), 0);
}

#[test]
fn unknown_device_is_not_found() {
    let mut vfs = console();
    for raw in ["   ms0:/PSP/x", "nope0:/x", ":/x"] {
        let err = vfs.open(raw, flags::RDONLY, 0).unwrap_err();
        assert_eq!(err.code(), errcode::FILE_NOT_FOUND, "{raw}");
    }
}

#[test]
fn read_only_device_rejects_writes() {
    let mut vfs = console();
    let err = vfs
        .open("disc0:/PSP_GAME/new.bin", flags::CREAT | flags::WRONLY, 0)
        .unwrap_err();
    assert_eq!(err, IoError::ReadOnly("disc0".into()));
    assert_eq!(vfs.mkdir("disc0:/dir", 0).unwrap_err().code(), errcode::READ_ONLY);
}

#[test]
fn opening_a_directory_fails() {
    let mut vfs = console();
    let err = vfs.open("ms0:/PSP", flags::RDONLY, 0).unwrap_err();
    assert_eq!(err.code(), errcode::IS_A_DIRECTORY);
}

#[test]
fn chdir_sets_relative_base_per_device() {
    let mut vfs = console();
    vfs.chdir("ms0:/PSP").expect("chdir ms0");
    create(&mut vfs, "rel.txt");
    assert_eq!(vfs.getstat("ms0:/PSP/rel.txt").expect("stat").kind, NodeKind::File);
    create(&mut vfs, "../../PSP/rel2.txt");
    assert!(vfs.getstat("ms0:/PSP/rel2.txt").is_ok());

    vfs.chdir("disc0:/PSP_GAME").expect("chdir disc0");
    assert!(vfs.getstat("PARAM.SFO").is_ok());
    // ms0 keeps its own directory.
    assert!(vfs.getstat("ms0:rel.txt").is_ok());
}

#[test]
fn chdir_requires_existing_directory() {
    let mut vfs = console();
    assert_eq!(
        vfs.chdir("ms0:/missing").unwrap_err().code(),
        errcode::FILE_NOT_FOUND
    );
    assert_eq!(
        vfs.chdir("host0:/Makefile").unwrap_err().code(),
        errcode::NOT_A_DIRECTORY
    );
    assert_eq!(vfs.working_dirs().current_device(), Some("host0"));
}

#[test]
fn exclusive_create_and_truncate() {
    let mut vfs = console();
    let fd = vfs
        .open("ms0:/PSP/data", flags::CREAT | flags::EXCL | flags::RDWR, 0)
        .expect("create");
    assert_eq!(vfs.write(fd, b"hello").expect("write"), 5);
    vfs.close(fd).expect("close");

    let err = vfs
        .open("ms0:/PSP/data", flags::CREAT | flags::EXCL | flags::WRONLY, 0)
        .unwrap_err();
    assert_eq!(err.code(), errcode::FILE_EXISTS);

    let fd = vfs
        .open("ms0:/PSP/data", flags::WRONLY | flags::TRUNC, 0)
        .expect("truncate");
    vfs.close(fd).expect("close");
    assert_eq!(vfs.getstat("ms0:/PSP/data").expect("stat").size, 0);
}

#[test]
fn append_writes_land_at_end() {
    let mut vfs = console();
    let fd = vfs
        .open("ms0:/PSP/log", flags::CREAT | flags::RDWR, 0)
        .expect("create");
    vfs.write(fd, b"abc").expect("write");
    vfs.close(fd).expect("close");

    let fd = vfs
        .open("ms0:/PSP/log", flags::APPEND | flags::RDWR, 0)
        .expect("append");
    vfs.write(fd, b"def").expect("append write");
    assert_eq!(vfs.lseek(fd, 0, whence::SET).expect("rewind"), 0);
    assert_eq!(vfs.read(fd, 64).expect("read"), b"abcdef");
}

#[test]
fn access_mode_is_enforced() {
    let mut vfs = console();
    let fd = vfs.open("host0:/Makefile", flags::RDONLY, 0).expect("open");
    assert_eq!(vfs.write(fd, b"x").unwrap_err().code(), errcode::ACCESS_DENIED);
    let fd = vfs
        .open("ms0:/PSP/w", flags::CREAT | flags::WRONLY, 0)
        .expect("create");
    assert_eq!(vfs.read(fd, 1).unwrap_err().code(), errcode::ACCESS_DENIED);
}

#[test]
fn descriptor_limit() {
    let mut vfs = Vfs::builder(VfsConfig {
        max_open_files: 2,
        initial_dir: None,
    })
    .mount(MemDevice::new("ms0"), &[])
    .and_then(|b| b.build())
    .expect("vfs");
    let a = vfs.open("ms0:/a", flags::CREAT | flags::WRONLY, 0).expect("a");
    vfs.open("ms0:/b", flags::CREAT | flags::WRONLY, 0).expect("b");
    let err = vfs.open("ms0:/c", flags::CREAT | flags::WRONLY, 0).unwrap_err();
    assert_eq!(err, IoError::TooManyOpenFiles(2));
    // The failed open must not leave a file behind.
    assert!(vfs.getstat("ms0:/c").is_err());
    vfs.close(a).expect("close");
    assert_eq!(vfs.open("ms0:/c", flags::CREAT | flags::WRONLY, 0), Ok(a));
}

#[test]
fn sync_seek_family() {
    let mut vfs = console();
    let size = MAKEFILE_LEN as i64;
    let fd = vfs.open("Makefile", flags::RDONLY, 0).expect("open");

    assert_eq!(vfs.lseek(fd, -10, whence::CUR), Err(IoError::InvalidOffset(-10)));
    assert_eq!(vfs.lseek(fd, 10, whence::CUR), Ok(10));
    assert_eq!(vfs.lseek(fd, -10, whence::CUR), Ok(0));
    assert_eq!(vfs.lseek(fd, 1, whence::END), Ok(size + 1));
    assert_eq!(vfs.lseek(fd, 0, whence::END), Ok(size));
    assert_eq!(encode(vfs.lseek(fd, -0x1000, whence::END)), -1);
    assert_eq!(vfs.lseek32(fd, 0, whence::CUR), Ok(size));
    assert_eq!(vfs.lseek32(fd, 0, whence::SET), Ok(0));

    for raw in [4, -1] {
        assert_eq!(
            encode(vfs.lseek(fd, 0, raw)),
            i64::from(errcode::INVALID_ARGUMENT)
        );
    }
    // Seeking past the end leaves the size untouched.
    assert_eq!(vfs.lseek(fd, 100, whence::END), Ok(size + 100));
    assert_eq!(vfs.getstat("Makefile").expect("stat").size, size as u64);
    assert!(vfs.read(fd, 16).expect("read past end").is_empty());
}

#[test]
fn descriptor_errors_win_over_argument_errors() {
    let mut vfs = console();
    for fd in [0xDEADBEEF_u32 as i32, 0, 1, 2] {
        assert_eq!(
            encode(vfs.lseek(fd, -10, 7)),
            i64::from(errcode::BAD_FILE_DESCRIPTOR)
        );
        assert_eq!(
            vfs.lseek32_async(fd, 0, 9).unwrap_err(),
            IoError::InvalidDescriptor(fd)
        );
    }
    assert_eq!(
        encode(vfs.lseek(0xDEADBEEF_u32 as i32, 0, whence::CUR)),
        0xFFFF_FFFF_8002_0323_u64 as i64
    );
}

#[test]
fn seek_after_close_is_invalid_descriptor() {
    let mut vfs = console();
    let fd = vfs.open("Makefile", flags::RDONLY, 0).expect("open");
    assert_eq!(vfs.lseek(fd, 4, whence::SET), Ok(4));
    vfs.close(fd).expect("close");

    assert_eq!(vfs.lseek(fd, 0, 7), Err(IoError::InvalidDescriptor(fd)));
    assert_eq!(vfs.lseek32(fd, -10, 7), Err(IoError::InvalidDescriptor(fd)));
    assert_eq!(
        vfs.lseek_async(fd, 0, 7).unwrap_err(),
        IoError::InvalidDescriptor(fd)
    );
    assert_eq!(
        vfs.lseek32_async(fd, 0, whence::CUR).unwrap_err(),
        IoError::InvalidDescriptor(fd)
    );
    assert_eq!(vfs.close(fd), Err(IoError::InvalidDescriptor(fd)));
}

#[test]
fn wait_refuses_token_from_another_filesystem() {
    let mut first = console();
    let mut second = console();
    let fd = first.open("Makefile", flags::RDONLY, 0).expect("open first");
    assert_eq!(second.open("Makefile", flags::RDONLY, 0), Ok(fd));

    let pending = first.lseek_async(fd, 10, whence::SET).expect("issue");
    assert_eq!(second.wait(pending), Err(IoError::NoAsync(fd)));
    // The second filesystem's descriptor is neither moved nor left busy.
    assert_eq!(second.lseek(fd, 0, whence::CUR), Ok(0));
    assert_eq!(
        first.lseek(fd, 0, whence::CUR),
        Err(IoError::AsyncBusy(fd))
    );
}

#[test]
fn write_past_size_limit_is_refused() {
    let mut vfs = console();
    let fd = vfs
        .open("ms0:/PSP/sparse", flags::CREAT | flags::WRONLY, 0)
        .expect("create");
    let far = (1_i64 << 32) - 1;
    assert_eq!(vfs.lseek(fd, far, whence::SET), Ok(far));
    assert_eq!(
        vfs.write(fd, b"x").unwrap_err().code(),
        errcode::INVALID_ARGUMENT
    );
    assert_eq!(vfs.lseek(fd, MAX_FILE_LEN as i64, whence::SET), Ok(MAX_FILE_LEN as i64));
    assert!(vfs.write(fd, b"x").is_err());
    assert_eq!(vfs.getstat("ms0:/PSP/sparse").expect("stat").size, 0);
    // The refused writes leave the position where the seek put it.
    assert_eq!(vfs.lseek(fd, 0, whence::CUR), Ok(MAX_FILE_LEN as i64));
}

#[test]
fn async_seek_issue_then_wait() {
    let mut vfs = console();
    let fd = vfs.open("Makefile", flags::RDONLY, 0).expect("open");

    let pending = vfs.lseek_async(fd, 10, whence::SET).expect("issue");
    assert_eq!(pending.fd(), fd);
    assert_eq!(vfs.lseek(fd, 0, whence::CUR).unwrap_err(), IoError::AsyncBusy(fd));
    assert_eq!(vfs.read(fd, 1).unwrap_err(), IoError::AsyncBusy(fd));
    assert_eq!(vfs.close(fd).unwrap_err(), IoError::AsyncBusy(fd));
    assert_eq!(
        vfs.lseek32_async(fd, 0, whence::CUR).unwrap_err(),
        IoError::AsyncBusy(fd)
    );
    assert_eq!(vfs.wait(pending), Ok(10));

    // Argument errors surface when the seek runs, and the descriptor is freed.
    let pending = vfs.lseek32_async(fd, 0, 4).expect("issue bad whence");
    assert_eq!(vfs.wait(pending), Err(IoError::InvalidWhence(4)));
    let pending = vfs.lseek32_async(fd, -20, whence::CUR).expect("issue negative");
    assert_eq!(encode(vfs.wait(pending)), -1);
    assert_eq!(vfs.lseek(fd, 0, whence::CUR), Ok(10));
    vfs.close(fd).expect("close");
}

#[test]
fn removed_open_file_stays_readable() {
    let mut vfs = console();
    let fd = vfs
        .open("ms0:/PSP/tmp", flags::CREAT | flags::RDWR, 0)
        .expect("create");
    vfs.write(fd, b"keep").expect("write");
    vfs.remove("ms0:/PSP/tmp").expect("remove");
    assert!(vfs.getstat("ms0:/PSP/tmp").is_err());
    assert_eq!(vfs.lseek(fd, 0, whence::SET), Ok(0));
    assert_eq!(vfs.read(fd, 8).expect("read"), b"keep");
    vfs.close(fd).expect("close");
}

#[test]
fn directory_lifecycle() {
    let mut vfs = console();
    vfs.mkdir("ms0:/PSP/GAME", 0o777).expect("mkdir");
    assert!(vfs.getstat("ms0:/psp/game").expect("stat").is_dir());
    create(&mut vfs, "ms0:/PSP/GAME/save.bin");
    assert_eq!(
        vfs.rmdir("ms0:/PSP/GAME").unwrap_err().code(),
        errcode::DIRECTORY_NOT_EMPTY
    );
    vfs.remove("ms0:/PSP/GAME/save.bin").expect("remove");
    vfs.rmdir("ms0:/PSP/GAME/").expect("rmdir");
    assert_eq!(
        vfs.getstat("ms0:/PSP/GAME").unwrap_err().code(),
        errcode::FILE_NOT_FOUND
    );
}
