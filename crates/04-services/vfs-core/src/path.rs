//! Lexical path resolution for device-prefixed firmware paths.
//!
//! Paths look like `device:/component/component`. Resolution never touches a
//! device: it splits off the device token, picks a base directory (the device
//! root or the device's working directory), and folds the remaining
//! components onto it. Whether the result exists is decided later by the
//! operation that consumes it.

use crate::cwd::WorkingDirs;
use crate::error::{IoError, IoResult};
use log::trace;
use std::fmt;

/// Maps device tokens written by a caller to canonical mount names.
pub trait DeviceNames {
    /// Returns the canonical name for `raw`, or `None` when nothing is mounted
    /// under it. Matching is case-insensitive and nothing is trimmed.
    fn canonical_name(&self, raw: &str) -> Option<&str>;
}

/// A path split at its device prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawPath<'a> {
    /// Text before the first `:`, if the path has one.
    pub device: Option<&'a str>,
    /// Everything after the first `:` (or the whole path without a prefix).
    pub rest: &'a str,
}

impl<'a> RawPath<'a> {
    pub fn split(raw: &'a str) -> Self {
        match raw.split_once(':') {
            Some((device, rest)) => Self {
                device: Some(device),
                rest,
            },
            None => Self {
                device: None,
                rest: raw,
            },
        }
    }

    /// True when the remainder starts at the device root.
    pub fn is_rooted(&self) -> bool {
        self.rest.starts_with(is_separator)
    }
}

/// A fully resolved target: canonical device plus component list.
///
/// Components keep the spelling the caller used (minus trailing dots), so a
/// create stores the name as written. Equality ignores ASCII case.
#[derive(Clone, Debug, Eq)]
pub struct ResolvedPath {
    pub device: String,
    pub components: Vec<String>,
}

impl ResolvedPath {
    pub fn root(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            components: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Final component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }
}

impl PartialEq for ResolvedPath {
    fn eq(&self, other: &Self) -> bool {
        self.device.eq_ignore_ascii_case(&other.device)
            && self.components.len() == other.components.len()
            && self
                .components
                .iter()
                .zip(&other.components)
                .all(|(a, b)| names_match(a, b))
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.device)?;
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{component}")?;
        }
        Ok(())
    }
}

/// Renders a component list on a device the same way [`ResolvedPath`] does.
pub fn display(device: &str, components: &[String]) -> String {
    ResolvedPath {
        device: device.to_owned(),
        components: components.to_vec(),
    }
    .to_string()
}

/// Both slash kinds separate components.
pub fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Case-insensitive name comparison used for devices and components.
pub fn names_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Strips trailing dots. Spaces and every other character survive untouched.
pub fn strip_trailing_dots(component: &str) -> &str {
    component.trim_end_matches('.')
}

/// Folds `rest` onto `base`, resolving `.`/`..` lexically.
///
/// Empty components (doubled separators) vanish, `..` at the root is a no-op,
/// and a component made only of dots beyond `..` strips to nothing and acts
/// like `.`.
pub fn normalize(base: &[String], rest: &str) -> Vec<String> {
    let mut out = base.to_vec();
    for part in rest.split(is_separator) {
        match part {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => {
                let name = strip_trailing_dots(other);
                if !name.is_empty() {
                    out.push(name.to_owned());
                }
            }
        }
    }
    out
}

/// Resolves `raw` against the working directories.
///
/// A device prefix selects the device (through `devices`); without one the
/// current device is used. A rooted remainder starts from the device root,
/// anything else from that device's working directory.
pub fn resolve(raw: &str, cwd: &WorkingDirs, devices: &impl DeviceNames) -> IoResult<ResolvedPath> {
    let split = RawPath::split(raw);
    let device = match split.device {
        Some(token) => devices
            .canonical_name(token)
            .ok_or_else(|| IoError::NotFound(raw.to_owned()))?
            .to_owned(),
        None => cwd
            .current_device()
            .ok_or_else(|| IoError::NotFound(raw.to_owned()))?
            .to_owned(),
    };

    let base: &[String] = if split.is_rooted() {
        &[]
    } else {
        cwd.dir(&device)
    };
    let components = normalize(base, split.rest);
    let resolved = ResolvedPath { device, components };
    trace!("path::resolve {raw:?} -> {resolved}");
    Ok(resolved)
}
