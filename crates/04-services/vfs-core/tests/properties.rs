//! Property checks for path resolution and the seek family.

use proptest::collection;
use proptest::prelude::*;
use service_abi::{errcode, flags, whence};
use vfs_core::{encode, path, IoError, MemDevice, ResolvedPath, Vfs, VfsConfig, WorkingDirs};

fn ms0_vfs(file_len: usize) -> (Vfs, i32) {
    let mut ms0 = MemDevice::new("ms0");
    ms0.seed_file("PSP/data.bin", &vec![0xA5; file_len])
        .expect("seed");
    let mut vfs = Vfs::builder(VfsConfig::default())
        .mount(ms0, &["fatms0"])
        .and_then(|b| b.build())
        .expect("vfs");
    let fd = vfs
        .open("ms0:/PSP/data.bin", flags::RDONLY, 0)
        .expect("open");
    (vfs, fd)
}

fn resolve(vfs: &Vfs, raw: &str) -> ResolvedPath {
    vfs.resolve(raw).expect("resolve")
}

fn component() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,8}"
}

proptest! {
    /// Any mix of slash kinds and doubling resolves to the same target.
    #[test]
    fn separators_are_interchangeable(
        parts in collection::vec(component(), 1..5),
        seps in collection::vec(prop_oneof![Just("/"), Just("\\"), Just("//"), Just("\\\\"), Just("/\\")], 5),
    ) {
        let (vfs, _) = ms0_vfs(0);
        let canonical = format!("ms0:/{}", parts.join("/"));
        let mut mixed = String::from("ms0:");
        for (part, sep) in parts.iter().zip(seps.iter().cycle()) {
            mixed.push_str(sep);
            mixed.push_str(part);
        }
        prop_assert_eq!(resolve(&vfs, &mixed), resolve(&vfs, &canonical));
    }

    /// Device names and components compare without regard to ASCII case.
    #[test]
    fn case_is_ignored(parts in collection::vec(component(), 1..4)) {
        let (vfs, _) = ms0_vfs(0);
        let lower = format!("ms0:/{}", parts.join("/")).to_ascii_lowercase();
        let upper = lower.to_ascii_uppercase();
        prop_assert_eq!(resolve(&vfs, &lower), resolve(&vfs, &upper));
    }

    /// Trailing dots never change which name a component refers to.
    #[test]
    fn trailing_dots_are_ignored(name in component(), dots in 1usize..6) {
        let (vfs, _) = ms0_vfs(0);
        let dotted = format!("ms0:/PSP/{name}{}", ".".repeat(dots));
        prop_assert_eq!(resolve(&vfs, &dotted), resolve(&vfs, &format!("ms0:/PSP/{name}")));
    }

    /// `..` never climbs above the device root.
    #[test]
    fn dot_dot_never_escapes_root(ups in 0usize..8, parts in collection::vec(component(), 0..4)) {
        let base: Vec<String> = vec!["PSP".into(), "GAME".into()];
        let rest = format!("{}{}", "../".repeat(ups), parts.join("/"));
        let out = path::normalize(&base, &rest);
        let kept = base.len().saturating_sub(ups);
        prop_assert_eq!(&out[..kept], &base[..kept]);
        prop_assert_eq!(&out[kept..], parts.as_slice());
    }

    /// Relative resolution matches the absolute form built from the working directory.
    #[test]
    fn relative_matches_absolute(dir in collection::vec(component(), 0..3), name in component()) {
        let mut cwd = WorkingDirs::default();
        cwd.set("ms0", dir.clone());
        let (vfs, _) = ms0_vfs(0);
        let rel = vfs_core::resolve(&name, &cwd, vfs.mounts()).expect("relative");
        let mut abs = dir;
        abs.push(name);
        prop_assert_eq!(rel.to_string(), path::display("ms0", &abs));
    }

    /// Non-negative targets land exactly; negative ones are refused without moving.
    #[test]
    fn seek_lands_or_refuses(len in 0usize..512, start in 0i64..512, offset in -1024i64..1024, raw in 0i32..3) {
        let (mut vfs, fd) = ms0_vfs(len);
        prop_assert_eq!(vfs.lseek(fd, start, whence::SET), Ok(start));
        let base = match raw {
            whence::SET => 0,
            whence::CUR => start,
            _ => len as i64,
        };
        let expected = base + offset;
        let got = vfs.lseek(fd, offset, raw);
        if expected < 0 {
            prop_assert_eq!(got, Err(IoError::InvalidOffset(expected)));
            prop_assert_eq!(vfs.lseek(fd, 0, whence::CUR), Ok(start));
        } else {
            prop_assert_eq!(got, Ok(expected));
        }
    }

    /// A seek relative to the end is where the next relative seek starts from.
    #[test]
    fn end_then_cur_agrees(len in 0usize..512, n in 0i64..1 << 40) {
        let (mut vfs, fd) = ms0_vfs(len);
        let end = vfs.lseek(fd, n, whence::END);
        prop_assert_eq!(end.clone(), Ok(len as i64 + n));
        prop_assert_eq!(vfs.lseek(fd, 0, whence::CUR), end.clone());
        prop_assert_eq!(vfs.lseek32(fd, 0, whence::CUR), end);
    }

    /// The four seek variants agree for every in-range request.
    #[test]
    fn seek_variants_agree(len in 0usize..256, offset in -300i32..300, raw in -2i32..6) {
        let (mut a, fa) = ms0_vfs(len);
        let (mut b, fb) = ms0_vfs(len);
        let (mut c, fc) = ms0_vfs(len);
        let (mut d, fd) = ms0_vfs(len);
        let sync64 = encode(a.lseek(fa, i64::from(offset), raw));
        let sync32 = encode(b.lseek32(fb, offset, raw));
        let pending = c.lseek_async(fc, i64::from(offset), raw).expect("issue");
        let async64 = encode(c.wait(pending));
        let pending = d.lseek32_async(fd, offset, raw).expect("issue");
        let async32 = encode(d.wait(pending));
        prop_assert_eq!(sync64, sync32);
        prop_assert_eq!(sync64, async64);
        prop_assert_eq!(sync64, async32);
        if !(0..3).contains(&raw) {
            prop_assert_eq!(sync64, i64::from(errcode::INVALID_ARGUMENT));
        }
    }

    /// Unbound descriptors always report a bad descriptor, whatever the arguments.
    #[test]
    fn unbound_descriptor_checked_first(
        fd in prop_oneof![Just(0), Just(1), Just(2), 4i32..64, any::<i32>()],
        offset in any::<i64>(),
        raw in any::<i32>(),
    ) {
        let (mut vfs, bound) = ms0_vfs(16);
        prop_assume!(fd != bound);
        prop_assert_eq!(vfs.lseek(fd, offset, raw), Err(IoError::InvalidDescriptor(fd)));
        prop_assert_eq!(vfs.lseek_async(fd, offset, raw).unwrap_err(), IoError::InvalidDescriptor(fd));
    }
}
