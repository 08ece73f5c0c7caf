//! The device set a probe sees: memory stick, disc and host directory.

use crate::CheckError;
use log::debug;
use services_io::{IoClient, IoService, IoServiceConfig};
use std::sync::Arc;
use vfs_core::MemDevice;

/// Working directory a fresh console starts in.
pub const HOST_ROOT: &str = "host0:/";

/// Seeds `device` with every fixture recorded for its name.
fn load_fixtures(device: &mut MemDevice, name: &str) -> Result<(), CheckError> {
    for meta in testdata::for_device(name) {
        let bytes = testdata::load(meta.device, meta.path)?;
        device.seed_file(meta.path, &bytes)?;
        debug!(
            "seeded {name}:/{} ({} bytes, bundle {})",
            meta.path,
            bytes.len(),
            testdata::source_bundle()
        );
    }
    Ok(())
}

/// Builds a console and returns a client bound to it.
///
/// `ms0` (alias `fatms0`) is writable with an empty `PSP` directory, `disc0`
/// (aliases `umd0`, `umd1`) is read-only, and `host0` holds the probe's own
/// files. Without an explicit initial directory the console starts in `host0:/`.
pub fn console(mut config: IoServiceConfig) -> Result<IoClient, CheckError> {
    config
        .vfs
        .initial_dir
        .get_or_insert_with(|| HOST_ROOT.to_owned());

    let mut ms0 = MemDevice::new("ms0");
    ms0.seed_dir("PSP")?;
    let mut disc0 = MemDevice::read_only("disc0");
    load_fixtures(&mut disc0, "disc0")?;
    let mut host0 = MemDevice::new("host0");
    load_fixtures(&mut host0, "host0")?;

    let service = IoService::build(config, |builder| {
        builder
            .mount(ms0, &["fatms0"])?
            .mount(disc0, &["umd0", "umd1"])?
            .mount(host0, &[])
    })?;
    Ok(IoClient::new(Arc::new(service)))
}
