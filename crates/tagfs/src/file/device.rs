//! The device switch table.
//!
//! Device-typed inodes carry a major number; reads and writes of such
//! files dispatch through the handlers registered for it here.

use spin::Mutex;

use crate::{error::FsError, param::NDEV};

/// A device switch entry: the read/write handlers for one major number.
#[derive(Clone, Copy)]
pub struct Device {
    pub read: fn(&mut [u8]) -> Result<usize, FsError>,
    pub write: fn(&[u8]) -> Result<usize, FsError>,
}

/// Handlers registered by major number.
pub(crate) struct DeviceTable {
    devices: Mutex<[Option<Device>; NDEV]>,
}

impl DeviceTable {
    pub(crate) const fn new() -> Self {
        Self {
            devices: Mutex::new([None; NDEV]),
        }
    }

    pub(crate) fn register(&self, major: usize, dev: Device) {
        self.devices.lock()[major] = Some(dev);
    }

    pub(crate) fn get(&self, major: i16) -> Result<Device, FsError> {
        usize::try_from(major)
            .ok()
            .and_then(|m| self.devices.lock().get(m).copied().flatten())
            .ok_or(FsError::NoDevice)
    }
}
