//! Probe programs replayed against a console.
//!
//! Each suite performs the same calls, in the same order, as the probe it
//! mirrors and records what the firmware would have printed.

use crate::checkpoint::{hex64, status, CheckpointLog};
use services_io::{DispatchResult, IoClient};
use service_abi::{flags, whence};

const OPEN_MODE: i32 = 0o777;

/// Creates `path` and closes it again. Returns whether the create succeeded.
fn create(io: &IoClient, path: &str) -> DispatchResult<bool> {
    let fd = io.open(path, flags::CREAT | flags::WRONLY, OPEN_MODE)?;
    if fd >= 0 {
        io.close(fd)?;
    }
    Ok(fd >= 0)
}

/// Records whether `path` opens read-only.
fn check_exists(io: &IoClient, log: &mut CheckpointLog, label: &str, path: &str) -> DispatchResult<()> {
    let fd = io.open(path, flags::RDONLY, OPEN_MODE)?;
    if fd >= 0 {
        io.close(fd)?;
    }
    log.record(label, status(fd));
    Ok(())
}

/// Creates `path`, checks it opens back, then removes it.
fn create_probe(io: &IoClient, log: &mut CheckpointLog, label: &str, path: &str) -> DispatchResult<()> {
    let created = create(io, path)?;
    check_exists(io, log, label, path)?;
    if created {
        io.remove(path)?;
    }
    Ok(())
}

/// Creates `created`, runs each existence check, then removes it.
fn create_alias_probe(
    io: &IoClient,
    log: &mut CheckpointLog,
    created: &str,
    checks: [(&str, &str); 2],
) -> DispatchResult<()> {
    let ok = create(io, created)?;
    for (label, path) in checks {
        check_exists(io, log, label, path)?;
    }
    if ok {
        io.remove(created)?;
    }
    Ok(())
}

const SPECIAL_CHARS: [&str; 16] = [
    "*", ".", "$", ":", "[", "(", "<", "|", "+", "~", "&", "%", "#", "?", "'", "\"",
];

/// File name handling: separators, dots, spaces, case and relative paths.
pub fn filename(io: &IoClient) -> DispatchResult<CheckpointLog> {
    let mut log = CheckpointLog::default();

    log.next("Slash usage");
    for (label, path) in [
        ("Doubled slashes at device", "ms0://PSP/__iocheck_testfile1.txt"),
        ("Doubled slashes in path", "ms0:/PSP//__iocheck_testfile1.txt"),
        ("Backslash at device", "ms0:\\PSP/__iocheck_testfile3.txt"),
        ("Backslash in path", "ms0:/PSP\\__iocheck_testfile4.txt"),
        ("Backslash after bad dir", "ms0:/PSP/__iocheck_testdir\\file.txt"),
        ("Double backslashes at device", "ms0:\\\\PSP/__iocheck_testfile5.txt"),
        ("Double backslashes in path", "ms0:/PSP\\\\__iocheck_testfile6.txt"),
    ] {
        create_probe(io, &mut log, label, path)?;
    }

    log.next("Trailing dots");
    create_alias_probe(
        io,
        &mut log,
        "ms0:/PSP/__iocheck_testfileA.",
        [
            ("With dot", "ms0:/PSP/__iocheck_testfileA."),
            ("Without dot", "ms0:/PSP/__iocheck_testfileA"),
        ],
    )?;
    create_alias_probe(
        io,
        &mut log,
        "ms0:/PSP/__iocheck_testfileB....",
        [
            ("Five dots", "ms0:/PSP/__iocheck_testfileB...."),
            ("Without any", "ms0:/PSP/__iocheck_testfileB"),
        ],
    )?;

    log.next("Trailing spaces");
    create_probe(io, &mut log, "Trailing space", "ms0:/PSP/__iocheck_testfile ")?;

    log.next("Leading spaces");
    for (label, path) in [
        ("Before device", "   ms0:/PSP/__iocheck_testfileleading.txt"),
        ("Before filename", "ms0:/PSP/     __iocheck_testfileleading.txt"),
        ("Before path", "ms0:/     PSP/__iocheck_testfileleading.txt"),
        ("After colon", "ms0:    /PSP/__iocheck_testfileleading.txt"),
    ] {
        create_probe(io, &mut log, label, path)?;
    }

    log.next("Device name case");
    for (label, path) in [
        ("Lowercase", "ms0:/PSP/__iocheck_testfile1.txt"),
        ("Uppercase", "MS0:/PSP/__iocheck_testfile2.txt"),
        ("Mixed", "mS0:/PSP/__iocheck_testfile2.txt"),
    ] {
        create_probe(io, &mut log, label, path)?;
    }

    log.next("Path/filename case");
    let created = create(io, "ms0:/PSP/__iocheck_testfile1")?;
    for (label, path) in [
        ("Lowercase", "ms0:/PSP/__iocheck_testfile1"),
        ("Uppercase", "ms0:/PSP/__IOCHECK_TESTFILE1"),
        ("Mixed case", "ms0:/PSP/__IoChEcK_tEsTfIlE1"),
    ] {
        check_exists(io, &mut log, label, path)?;
    }
    if created {
        io.remove("ms0:/PSP/__iocheck_testfile1")?;
    }

    log.next("Special characters");
    for c in SPECIAL_CHARS {
        create_probe(io, &mut log, c, &format!("ms0:/PSP/__iocheck_testfile{c}.txt"))?;
    }

    log.next("Relative paths");
    create_probe(
        io,
        &mut log,
        "With ignored components",
        "ms0:/PSP/blah/../__iocheck_testfile.txt",
    )?;
    io.chdir("ms0:/PSP")?;
    for (label, path) in [
        ("Relative", "__iocheck_testfile.txt"),
        ("Relative inside root", "../PSP/__iocheck_testfile.txt"),
        ("Relative outside root", "../../PSP/__iocheck_testfile.txt"),
    ] {
        create_probe(io, &mut log, label, path)?;
    }

    log.next("disc0:/ paths");
    for (label, path) in [
        ("Uppercase", "disc0:/PSP_GAME/PARAM.SFO"),
        ("Lowercase", "disc0:/psp_game/param.sfo"),
        ("Backslash at device", "disc0:\\PSP_GAME/PARAM.SFO"),
        ("Backslash in path", "disc0:/PSP_GAME\\PARAM.SFO"),
        ("Trailing dot", "disc0:/PSP_GAME/PARAM.SFO."),
        ("Trailing space", "disc0:/PSP_GAME/PARAM.SFO "),
        ("Special char", "disc0:/PSP_GAME/PARAM.SFO*"),
        ("Relative components", "disc0:/blah/../PSP_GAME/PARAM.SFO"),
    ] {
        check_exists(io, &mut log, label, path)?;
    }
    io.chdir("disc0:/PSP_GAME")?;
    for (label, path) in [
        ("Relative", "PARAM.SFO"),
        ("Relative inside root", "../PSP_GAME/PARAM.SFO"),
        ("Relative outside root", "../../PSP_GAME/PARAM.SFO"),
    ] {
        check_exists(io, &mut log, label, path)?;
    }

    Ok(log)
}

/// The four seek entry points, each adapted to a 64-bit result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekCall {
    Lseek,
    Lseek32,
    LseekAsync,
    Lseek32Async,
}

impl SeekCall {
    pub const ALL: [SeekCall; 4] = [
        SeekCall::Lseek,
        SeekCall::Lseek32,
        SeekCall::LseekAsync,
        SeekCall::Lseek32Async,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SeekCall::Lseek => "sceIoLseek",
            SeekCall::Lseek32 => "sceIoLseek32",
            SeekCall::LseekAsync => "sceIoLseekAsync",
            SeekCall::Lseek32Async => "sceIoLseek32Async",
        }
    }

    /// Seeks and returns the position or error code. Asynchronous calls are
    /// issued and waited on; an issue or wait failure is returned as-is.
    pub fn seek(self, io: &IoClient, fd: i32, offset: i32, whence: i32) -> DispatchResult<i64> {
        let issued = match self {
            SeekCall::Lseek => return io.lseek(fd, i64::from(offset), whence),
            SeekCall::Lseek32 => return io.lseek32(fd, offset, whence),
            SeekCall::LseekAsync => io.lseek_async(fd, i64::from(offset), whence)?,
            SeekCall::Lseek32Async => io.lseek32_async(fd, offset, whence)?,
        };
        if issued < 0 {
            return Ok(i64::from(issued));
        }
        let (status, result) = io.wait_async(fd)?;
        if status < 0 {
            return Ok(i64::from(status));
        }
        Ok(result)
    }
}

/// Descriptor `0xDEADBEEF` as a guest passes it.
const INVALID_FD: i32 = 0xDEAD_BEEF_u32 as i32;

/// Records seek results for one entry point.
struct SeekProbe<'a> {
    io: &'a IoClient,
    call: SeekCall,
    log: &'a mut CheckpointLog,
}

impl SeekProbe<'_> {
    fn run(&mut self, label: &str, fd: i32, offset: i32, whence: i32) -> DispatchResult<()> {
        let result = self.call.seek(self.io, fd, offset, whence)?;
        self.log.record(label, hex64(result));
        Ok(())
    }
}

fn seek_tests(io: &IoClient, log: &mut CheckpointLog, call: SeekCall) -> DispatchResult<()> {
    let fd = io.open("Makefile", flags::RDONLY, OPEN_MODE)?;
    let title = call.name();
    let mut probe = SeekProbe { io, call, log };

    probe.log.next(format!("{title} - files"));
    probe.run("Invalid fd", INVALID_FD, 0, whence::CUR)?;
    probe.run("0", 0, 0, whence::CUR)?;
    probe.run("1", 1, 0, whence::CUR)?;
    probe.run("2", 2, 0, whence::CUR)?;
    probe.run("Valid fd", fd, 0, whence::CUR)?;

    probe.log.next(format!("{title} - offsets"));
    probe.run("+Negative", fd, -10, whence::CUR)?;
    probe.run("+Positive", fd, 10, whence::CUR)?;
    probe.run("+Negative again", fd, -10, whence::CUR)?;
    probe.run("+Zero", fd, 0, whence::CUR)?;
    probe.run("End +1", fd, 1, whence::END)?;
    probe.run("End +0", fd, 0, whence::END)?;
    probe.run("End +-0x1000", fd, -0x1000, whence::END)?;

    probe.log.next(format!("{title} - whence"));
    probe.run("END", fd, 0, whence::END)?;
    probe.run("CUR", fd, 0, whence::CUR)?;
    probe.run("SET", fd, 0, whence::SET)?;
    probe.run("4", fd, 0, 4)?;
    probe.run("-1", fd, 0, -1)?;

    io.close(fd)?;
    Ok(())
}

/// Seek family: descriptor checks, offsets around both ends, whence values.
pub fn seek(io: &IoClient) -> DispatchResult<CheckpointLog> {
    let mut log = CheckpointLog::default();
    // Held open for the whole run so the probed file is never descriptor 3.
    let module = io.open("seek.prx", flags::RDONLY, OPEN_MODE)?;
    for call in SeekCall::ALL {
        seek_tests(io, &mut log, call)?;
    }
    io.close(module)?;
    Ok(log)
}
