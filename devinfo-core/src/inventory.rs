use crate::device::Enumeration;
use crate::error::Result;
use crate::platform::{Enumerator, Platform};

/// Holds the most recent enumeration result of one [`Enumerator`].
///
/// Each [`refresh`](Inventory::refresh) replaces the held result entirely;
/// nothing is carried over between passes. An `Inventory` is not meant to
/// be refreshed from several threads at once.
pub struct Inventory {
    enumerator: Box<dyn Enumerator>,
    current: Option<Enumeration>,
}

impl Inventory {
    pub fn new(enumerator: Box<dyn Enumerator>) -> Self {
        Self {
            enumerator,
            current: None,
        }
    }

    /// An inventory for the running system. Fails if the platform is not
    /// supported or a required tool is missing.
    pub fn for_host() -> Result<Self> {
        Platform::host_enumerator().map(Self::new)
    }

    /// Runs a new enumeration pass and makes it the current result.
    ///
    /// On failure the previous result is discarded as well.
    pub fn refresh(&mut self) -> Result<&Enumeration> {
        self.current = None;
        let enumeration = self.enumerator.enumerate()?;
        Ok(self.current.insert(enumeration))
    }

    /// The result of the last successful [`refresh`](Inventory::refresh).
    pub fn current(&self) -> Option<&Enumeration> {
        self.current.as_ref()
    }

    /// Looks up the block size of `disk` directly, without consulting the
    /// current result.
    pub fn block_size(&self, disk: &str) -> Result<u64> {
        self.enumerator.block_size(disk)
    }
}
