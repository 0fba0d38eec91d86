use std::path::{Path, PathBuf};

use crate::error::{ReaderError, Result};

/// Finds the device node a reader is attached to.
pub trait DeviceLocator {
    /// Path of the serial device to open.
    fn locate(&self) -> Result<PathBuf>;
}

/// A device path supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDevice(PathBuf);

impl FixedDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl DeviceLocator for FixedDevice {
    fn locate(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Placeholder for automatic discovery, which is not supported.
///
/// Always fails; readers must be configured with an explicit device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscovery;

impl DeviceLocator for NoDiscovery {
    fn locate(&self) -> Result<PathBuf> {
        Err(ReaderError::NoDevice(
            "automatic device discovery is not supported; configure a device path".to_string(),
        ))
    }
}
