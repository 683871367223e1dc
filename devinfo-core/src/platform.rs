//! Provides platform-specific functionality.
//!
//! Each supported operating system family has an [`Enumerator`] that drives
//! that platform's native disk utilities and turns their output into
//! [`DeviceRecord`](crate::device::DeviceRecord)s. All of them are compiled
//! on every host so that their parsing can be tested anywhere; [`Platform`]
//! picks the one that matches the running system.

pub mod linux;
pub mod macos;

use crate::command::{SystemRunner, require_tools};
use crate::device::Enumeration;
use crate::error::{Error, Result};

/// One way of discovering the disks of a machine.
pub trait Enumerator {
    /// A short name for log messages, e.g. `"diskutil"`.
    fn name(&self) -> &'static str;

    /// The external programs this enumerator needs in `PATH`.
    fn required_tools(&self) -> &'static [&'static str];

    /// Runs one full, synchronous enumeration pass.
    ///
    /// # Errors
    ///
    /// Fails when the disks cannot be listed at all, or when the pass ends
    /// without a single record ([`Error::NoDisksFound`]). Problems with
    /// individual disks are not errors; they are collected in the returned
    /// [`Enumeration::errors`].
    fn enumerate(&self) -> Result<Enumeration>;

    /// Looks up the block size of one disk, asking the platform afresh.
    fn block_size(&self, disk: &str) -> Result<u64>;
}

/// The operating system families this crate can enumerate disks on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
}

impl Platform {
    /// The platform of the running system.
    pub fn detect() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Maps an OS name as spelled by [`std::env::consts::OS`].
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Platform::MacOs),
            "linux" => Ok(Platform::Linux),
            other => Err(Error::UnsupportedPlatform(other.to_string())),
        }
    }

    /// The enumerator for this platform, running the real utilities.
    pub fn enumerator(self) -> Box<dyn Enumerator> {
        match self {
            Platform::MacOs => Box::new(macos::Diskutil::new(SystemRunner)),
            Platform::Linux => Box::new(linux::Lsblk::new(SystemRunner)),
        }
    }

    /// The enumerator for the running system, after checking that the
    /// utilities it relies on are installed.
    pub fn host_enumerator() -> Result<Box<dyn Enumerator>> {
        let platform = Self::detect()?;
        let enumerator = platform.enumerator();
        require_tools(enumerator.required_tools())?;
        log::debug!(
            "using the {} enumerator on {}",
            enumerator.name(),
            host_os()
        );
        Ok(enumerator)
    }
}

/// A description of the running operating system, e.g. `macOS 14.5 Sonoma`.
pub fn host_os() -> String {
    sysinfo::System::long_os_version()
        .or_else(sysinfo::System::name)
        .unwrap_or_else(|| std::env::consts::OS.to_string())
}

/// Whether the process runs with root privileges. Some disk metadata is only
/// visible to root.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        nix::unistd::geteuid().is_root()
    }
    #[cfg(not(unix))]
    {
        false
    }
}
