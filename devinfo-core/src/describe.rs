//! Helpers that turn raw platform metadata into record fields.

use crate::device::{NOT_APPLICABLE, UNKNOWN};

/// Splits a media name such as `"Apple SSD AP0512"` into a vendor (the first
/// word) and a product (the remaining words).
///
/// Either half is [`UNKNOWN`] when there is nothing to put in it.
pub fn split_media_name(media_name: &str) -> (String, String) {
    let mut words = media_name.split_whitespace();
    let vendor = words.next().unwrap_or(UNKNOWN).to_string();
    let product = words.collect::<Vec<_>>().join(" ");
    let product = if product.is_empty() {
        UNKNOWN.to_string()
    } else {
        product
    };
    (vendor, product)
}

/// The role a disk plays in a layered (volume manager / copy-on-write)
/// filesystem stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerRole {
    /// Backing storage for a container.
    PhysicalStore(&'static str),
    /// A container made out of one or more physical stores.
    Container(&'static str),
    /// A volume carved out of a container.
    Volume(&'static str),
}

impl ContainerRole {
    pub fn annotation(&self) -> String {
        match self {
            ContainerRole::PhysicalStore(stack) => format!("({stack} Physical Store)"),
            ContainerRole::Container(stack) => format!("({stack} Container)"),
            ContainerRole::Volume(stack) => format!("({stack} Volume)"),
        }
    }
}

/// What a platform knows about a disk that is useful for describing it.
/// `None` means the platform did not say.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptionSignals {
    pub internal: Option<bool>,
    pub removable: Option<bool>,
    pub solid_state: Option<bool>,
    pub bus_protocol: Option<String>,
    pub container: Option<ContainerRole>,
}

impl DescriptionSignals {
    fn is_empty(&self) -> bool {
        self.internal.is_none()
            && self.removable.is_none()
            && self.solid_state.is_none()
            && self.bus_protocol.is_none()
            && self.container.is_none()
    }
}

/// Assembles a one-line description such as
/// `Internal Solid State Drive (Connected through PCI-Express)(APFS Container)`.
///
/// A disk that is neither removable nor known to be solid state is assumed
/// to be a hard disk. Only when the platform gave no signals at all is the
/// description [`NOT_APPLICABLE`].
pub fn describe(signals: &DescriptionSignals) -> String {
    if signals.is_empty() {
        return NOT_APPLICABLE.to_string();
    }

    let location = match signals.internal {
        Some(true) => "Internal ",
        Some(false) => "External ",
        None => "Unknown ",
    };

    let drive = if signals.removable == Some(true) {
        "Removable Drive "
    } else if signals.solid_state == Some(true) {
        "Solid State Drive "
    } else {
        "Hard Disk Drive "
    };

    let container = signals
        .container
        .as_ref()
        .map(ContainerRole::annotation)
        .unwrap_or_default();

    match signals.bus_protocol.as_deref().map(str::trim) {
        Some(bus) if !bus.is_empty() && bus != UNKNOWN => {
            format!("{location}{drive}(Connected through {bus}){container}")
        }
        _ => format!("{location}{drive}{container}"),
    }
}
