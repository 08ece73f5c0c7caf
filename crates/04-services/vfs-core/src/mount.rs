use crate::device::Device;
use crate::error::{IoError, IoResult};
use crate::path::DeviceNames;
use log::debug;
use std::collections::HashMap;

/// Mounted devices addressed by canonical name or alias.
#[derive(Default)]
pub struct Mounts {
    devices: Vec<Box<dyn Device>>,
    names: HashMap<String, usize>,
}

impl Mounts {
    /// Mounts `device` under its own name plus `aliases`.
    pub fn mount(&mut self, device: Box<dyn Device>, aliases: &[&str]) -> IoResult<()> {
        let keys: Vec<String> = std::iter::once(device.name())
            .chain(aliases.iter().copied())
            .map(str::to_ascii_lowercase)
            .collect();
        if let Some(taken) = keys.iter().find(|key| self.names.contains_key(*key)) {
            return Err(IoError::AlreadyExists(format!("{taken}:")));
        }
        debug!(
            "mount {} read_only={} aliases={aliases:?}",
            device.name(),
            device.is_read_only()
        );
        let index = self.devices.len();
        self.devices.push(device);
        for key in keys {
            self.names.insert(key, index);
        }
        Ok(())
    }

    fn index(&self, name: &str) -> IoResult<usize> {
        self.names
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| IoError::NotFound(format!("{name}:")))
    }

    pub fn get(&self, name: &str) -> IoResult<&dyn Device> {
        let index = self.index(name)?;
        Ok(self.devices[index].as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> IoResult<&mut dyn Device> {
        let index = self.index(name)?;
        Ok(self.devices[index].as_mut())
    }

    /// Canonical names of every mounted device, in mount order.
    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.iter().map(|device| device.name())
    }
}

impl DeviceNames for Mounts {
    fn canonical_name(&self, raw: &str) -> Option<&str> {
        let index = self.index(raw).ok()?;
        Some(self.devices[index].name())
    }
}
