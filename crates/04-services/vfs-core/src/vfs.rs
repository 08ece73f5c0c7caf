use crate::cwd::WorkingDirs;
use crate::device::{Device, NodeStat};
use crate::error::{IoError, IoResult};
use crate::fd::{FileTable, OpenFile, OpenMode};
use crate::mount::Mounts;
use crate::path::{self, ResolvedPath};
use crate::seek::{seek_target, PendingSeek, SeekWidth, Whence};
use log::{debug, trace};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VFS_ID: AtomicU64 = AtomicU64::new(1);

/// Filesystem configuration shared across front-ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VfsConfig {
    /// Size of the descriptor table.
    pub max_open_files: usize,
    /// Working directory applied once the devices are mounted.
    pub initial_dir: Option<String>,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            max_open_files: 64,
            initial_dir: None,
        }
    }
}

/// Collects devices before the initial working directory is applied.
pub struct VfsBuilder {
    vfs: Vfs,
}

impl VfsBuilder {
    pub fn mount(mut self, device: impl Device + 'static, aliases: &[&str]) -> IoResult<Self> {
        self.vfs.mount(Box::new(device), aliases)?;
        Ok(self)
    }

    pub fn build(mut self) -> IoResult<Vfs> {
        if let Some(dir) = self.vfs.config.initial_dir.clone() {
            self.vfs.chdir(&dir)?;
        }
        Ok(self.vfs)
    }
}

/// Device filesystem context: mounts, working directories and descriptors.
///
/// Every operation mirrors one firmware call. Paths are resolved lexically
/// against the working directories first; the device decides afterwards
/// whether the target exists.
pub struct Vfs {
    id: u64,
    mounts: Mounts,
    cwd: WorkingDirs,
    files: FileTable,
    config: VfsConfig,
}

impl Vfs {
    pub fn new(config: VfsConfig) -> Self {
        Self {
            id: NEXT_VFS_ID.fetch_add(1, Ordering::Relaxed),
            mounts: Mounts::default(),
            cwd: WorkingDirs::default(),
            files: FileTable::new(config.max_open_files),
            config,
        }
    }

    pub fn builder(config: VfsConfig) -> VfsBuilder {
        VfsBuilder {
            vfs: Self::new(config),
        }
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }

    pub fn mount(&mut self, device: Box<dyn Device>, aliases: &[&str]) -> IoResult<()> {
        self.mounts.mount(device, aliases)
    }

    pub fn mounts(&self) -> &Mounts {
        &self.mounts
    }

    pub fn working_dirs(&self) -> &WorkingDirs {
        &self.cwd
    }

    pub fn open_files(&self) -> usize {
        self.files.open_count()
    }

    pub fn resolve(&self, raw: &str) -> IoResult<ResolvedPath> {
        path::resolve(raw, &self.cwd, &self.mounts)
    }

    /// Opens `raw`, creating it first when `flags` asks for it.
    ///
    /// Permission bits in `_mode` are accepted and ignored.
    pub fn open(&mut self, raw: &str, flags: i32, _mode: i32) -> IoResult<i32> {
        let mode = OpenMode::from_raw(flags)?;
        let target = self.resolve(raw)?;
        self.files.ensure_free()?;

        let device = self.mounts.get_mut(&target.device)?;
        if mode.write && device.is_read_only() {
            return Err(IoError::ReadOnly(device.name().to_owned()));
        }
        let node = if mode.create {
            device.create_file(&target.components, mode.exclusive)?
        } else {
            device.lookup(&target.components)?
        };
        if device.stat(node)?.is_dir() {
            return Err(IoError::IsADirectory(target.to_string()));
        }
        if mode.write && mode.truncate {
            device.truncate(node, 0)?;
        }

        let fd = self
            .files
            .insert(OpenFile::new(&target.device, node, mode, target.to_string()))?;
        device.retain(node);
        debug!("open {raw:?} flags={flags:#06x} -> fd {fd} ({target})");
        Ok(fd)
    }

    pub fn close(&mut self, fd: i32) -> IoResult<()> {
        self.files.get(fd)?.ensure_idle(fd)?;
        let file = self.files.remove(fd)?;
        self.mounts.get_mut(&file.device)?.release(file.node);
        debug!("close fd {fd} ({})", file.path);
        Ok(())
    }

    /// Reads up to `len` bytes from the current position.
    pub fn read(&mut self, fd: i32, len: usize) -> IoResult<Vec<u8>> {
        let file = self.files.get_mut(fd)?;
        file.ensure_idle(fd)?;
        if !file.mode.read {
            return Err(IoError::AccessDenied {
                fd,
                access: "reading",
            });
        }
        let device = self.mounts.get(&file.device)?;
        let size = device.stat(file.node)?.size;
        let available = usize::try_from(size.saturating_sub(file.position)).unwrap_or(usize::MAX);
        let mut buf = vec![0u8; len.min(available)];
        let count = device.read_at(file.node, file.position, &mut buf)?;
        buf.truncate(count);
        file.position += count as u64;
        Ok(buf)
    }

    /// Writes at the current position (or the end, for append descriptors).
    pub fn write(&mut self, fd: i32, bytes: &[u8]) -> IoResult<usize> {
        let file = self.files.get_mut(fd)?;
        file.ensure_idle(fd)?;
        if !file.mode.write {
            return Err(IoError::AccessDenied {
                fd,
                access: "writing",
            });
        }
        let device = self.mounts.get_mut(&file.device)?;
        if file.mode.append {
            file.position = device.stat(file.node)?.size;
        }
        let count = device.write_at(file.node, file.position, bytes)?;
        file.position += count as u64;
        Ok(count)
    }

    /// Repositions `fd`; descriptor checks run before whence/offset checks.
    pub fn lseek(&mut self, fd: i32, offset: i64, whence: i32) -> IoResult<i64> {
        let file = self.files.get_mut(fd)?;
        file.ensure_idle(fd)?;
        Self::apply_seek(&self.mounts, file, offset, whence)
    }

    /// 32-bit offset form of [`Vfs::lseek`]; positions are still reported in full.
    pub fn lseek32(&mut self, fd: i32, offset: i32, whence: i32) -> IoResult<i64> {
        self.lseek(fd, i64::from(offset), whence)
    }

    /// Issues an asynchronous seek. Only the descriptor is checked here; the
    /// seek itself runs, and reports its errors, in [`Vfs::wait`].
    pub fn lseek_async(&mut self, fd: i32, offset: i64, whence: i32) -> IoResult<PendingSeek> {
        self.issue(fd, offset, whence, SeekWidth::Bits64)
    }

    pub fn lseek32_async(&mut self, fd: i32, offset: i32, whence: i32) -> IoResult<PendingSeek> {
        self.issue(fd, i64::from(offset), whence, SeekWidth::Bits32)
    }

    fn issue(&mut self, fd: i32, offset: i64, whence: i32, width: SeekWidth) -> IoResult<PendingSeek> {
        let file = self.files.get_mut(fd)?;
        file.ensure_idle(fd)?;
        file.async_busy = true;
        trace!("issue {width:?} seek fd={fd} offset={offset} whence={whence}");
        Ok(PendingSeek {
            owner: self.id,
            fd,
            offset,
            whence,
            width,
        })
    }

    /// Completes an issued seek, consuming its token. A token issued by
    /// another filesystem is refused with `NoAsync` and touches nothing.
    pub fn wait(&mut self, pending: PendingSeek) -> IoResult<i64> {
        if pending.owner != self.id {
            return Err(IoError::NoAsync(pending.fd));
        }
        let file = self.files.get_mut(pending.fd)?;
        file.async_busy = false;
        let result = Self::apply_seek(&self.mounts, file, pending.offset, pending.whence);
        trace!("wait fd={} -> {result:?}", pending.fd);
        result
    }

    fn apply_seek(mounts: &Mounts, file: &mut OpenFile, offset: i64, whence: i32) -> IoResult<i64> {
        let whence = Whence::from_raw(whence)?;
        let size = mounts.get(&file.device)?.stat(file.node)?.size;
        let target = seek_target(file.position, size, offset, whence)?;
        file.position = target;
        i64::try_from(target).map_err(|_| IoError::InvalidArgument("seek position overflows"))
    }

    pub fn remove(&mut self, raw: &str) -> IoResult<()> {
        let target = self.resolve(raw)?;
        self.mounts
            .get_mut(&target.device)?
            .remove(&target.components)?;
        debug!("remove {raw:?} ({target})");
        Ok(())
    }

    /// Creates a directory; permission bits in `_mode` are ignored.
    pub fn mkdir(&mut self, raw: &str, _mode: i32) -> IoResult<()> {
        let target = self.resolve(raw)?;
        self.mounts
            .get_mut(&target.device)?
            .mkdir(&target.components)?;
        Ok(())
    }

    pub fn rmdir(&mut self, raw: &str) -> IoResult<()> {
        let target = self.resolve(raw)?;
        self.mounts
            .get_mut(&target.device)?
            .rmdir(&target.components)
    }

    /// Changes the working directory; the target must be an existing directory.
    pub fn chdir(&mut self, raw: &str) -> IoResult<()> {
        let target = self.resolve(raw)?;
        let stat = self.stat_resolved(&target)?;
        if !stat.is_dir() {
            return Err(IoError::NotADirectory(target.to_string()));
        }
        debug!("chdir {raw:?} -> {target}");
        self.cwd.set(&target.device, target.components);
        Ok(())
    }

    pub fn getstat(&self, raw: &str) -> IoResult<NodeStat> {
        let target = self.resolve(raw)?;
        self.stat_resolved(&target)
    }

    fn stat_resolved(&self, target: &ResolvedPath) -> IoResult<NodeStat> {
        let device = self.mounts.get(&target.device)?;
        let node = device.lookup(&target.components)?;
        device.stat(node)
    }

    /// Succeeds when `fd` is bound to an open file.
    pub fn check_fd(&self, fd: i32) -> IoResult<()> {
        self.files.get(fd).map(|_| ())
    }
}
