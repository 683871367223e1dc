//! The core, UI-agnostic library for the `devinfo` disk inspection utility.
//!
//! `devinfo-core` discovers the disks and partitions of the running machine by
//! invoking the platform's own disk utilities (`diskutil` on macOS, `lsblk` on
//! Linux) and parsing what they print into a uniform [`DeviceRecord`] per
//! device or partition. It is designed to be used by any front-end, such as
//! the `devinfo` command-line tool.
//!
//! The library is structured into several key modules:
//! - [`device`]: The record schema, the result table and the soft error log.
//! - [`platform`]: The [`Enumerator`] trait, one implementation per supported
//!   platform, and the [`Platform`] selector.
//! - [`capacity`] and [`describe`]: Helpers that turn raw metadata into
//!   record fields.
//! - [`inventory`]: A small cache holding the most recent result.
//!
//! ## Example: Listing Disks
//!
//! ```rust,no_run
//! fn main() -> devinfo_core::Result<()> {
//!     let found = devinfo_core::get_info()?;
//!
//!     for record in found.disks.devices() {
//!         println!("{} {} ({})", record.name, record.product, record.capacity);
//!         for partition in &record.partitions {
//!             println!("  {partition}");
//!         }
//!     }
//!
//!     // Some disks may have been skipped even though the pass succeeded.
//!     for problem in found.errors.iter() {
//!         eprintln!("warning: {problem}");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod capacity;
pub mod command;
pub mod describe;
pub mod device;
pub mod error;
pub mod inventory;
pub mod naming;
pub mod platform;

pub use device::{DeviceKind, DeviceRecord, DiskTable, Enumeration, ErrorLog};
pub use error::{Error, Result};
pub use inventory::Inventory;
pub use platform::{Enumerator, Platform};

/// Enumerates the disks of the running machine in one synchronous pass.
///
/// # Errors
///
/// Fails if the platform is unsupported, a required utility is missing, the
/// disks cannot be listed, or no disk could be described at all.
pub fn get_info() -> Result<Enumeration> {
    Platform::host_enumerator()?.enumerate()
}

/// Looks up the block size of `disk` (e.g. `disk0` or `/dev/sda`) on the
/// running machine.
pub fn block_size(disk: &str) -> Result<u64> {
    Platform::host_enumerator()?.block_size(disk)
}
