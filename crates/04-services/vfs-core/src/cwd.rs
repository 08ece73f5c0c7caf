use std::collections::HashMap;

/// Working directory state consulted by relative path resolution.
///
/// Holds the current device plus one directory per device, so `ms0:file`
/// and `disc0:file` each resolve against their own device's directory.
#[derive(Clone, Debug, Default)]
pub struct WorkingDirs {
    current: Option<String>,
    dirs: HashMap<String, Vec<String>>,
}

impl WorkingDirs {
    /// Device used when a path has no prefix.
    pub fn current_device(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Working directory of `device`; the root when never set.
    pub fn dir(&self, device: &str) -> &[String] {
        self.dirs.get(device).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Makes `device` current and records its working directory.
    pub fn set(&mut self, device: &str, components: Vec<String>) {
        self.current = Some(device.to_owned());
        self.dirs.insert(device.to_owned(), components);
    }
}
