use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder for a field the platform could not (or does not yet) discover.
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for a field that has no meaning for this kind of record.
pub const NOT_APPLICABLE: &str = "N/A";

/// Whether a record describes a whole disk or a slice of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeviceKind {
    Device,
    Partition,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Device => f.write_str("Device"),
            DeviceKind::Partition => f.write_str("Partition"),
        }
    }
}

/// Everything discovered about a single device or partition.
///
/// The schema is the same on every platform. Fields a platform cannot fill
/// in hold [`UNKNOWN`], and fields that do not apply to this kind of record
/// hold [`NOT_APPLICABLE`]; no field is ever left out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceRecord {
    /// The canonical path of the device (e.g. `/dev/disk1`). Equal to its key
    /// in the [`DiskTable`].
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: DeviceKind,
    /// Path of the owning device, or [`NOT_APPLICABLE`] for a device.
    pub host_device: String,
    /// Paths of this device's partitions, in discovery order.
    pub partitions: Vec<String>,
    pub vendor: String,
    pub product: String,
    /// The exact size in bytes, kept as a string.
    pub raw_capacity: String,
    /// The size rounded to a unit, e.g. `500 GB`.
    pub capacity: String,
    pub description: String,
    pub flags: String,
    pub partitioning: String,
    pub file_system: String,
    #[serde(rename = "UUID")]
    pub uuid: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub boot_record: String,
    pub boot_record_strings: String,
}

impl DeviceRecord {
    /// A whole-disk record with every discoverable field set to its placeholder.
    pub fn device(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DeviceKind::Device,
            host_device: NOT_APPLICABLE.to_string(),
            partitions: Vec::new(),
            vendor: UNKNOWN.to_string(),
            product: UNKNOWN.to_string(),
            raw_capacity: UNKNOWN.to_string(),
            capacity: UNKNOWN.to_string(),
            description: NOT_APPLICABLE.to_string(),
            flags: UNKNOWN.to_string(),
            partitioning: UNKNOWN.to_string(),
            file_system: NOT_APPLICABLE.to_string(),
            uuid: NOT_APPLICABLE.to_string(),
            id: UNKNOWN.to_string(),
            boot_record: UNKNOWN.to_string(),
            boot_record_strings: UNKNOWN.to_string(),
        }
    }

    /// A partition record owned by `host`, with every discoverable field set
    /// to its placeholder.
    pub fn partition(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::Partition,
            host_device: host.into(),
            partitioning: NOT_APPLICABLE.to_string(),
            file_system: UNKNOWN.to_string(),
            uuid: UNKNOWN.to_string(),
            ..Self::device(name)
        }
    }

    pub fn is_partition(&self) -> bool {
        self.kind == DeviceKind::Partition
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = format!("{} {}", self.vendor, self.product);
        write!(
            f,
            "{:<16} {:<10} {:>8}  {:<30} {}",
            self.name,
            self.kind,
            self.capacity,
            model.trim(),
            self.description
        )
    }
}

/// The result table of one enumeration pass, keyed by device path.
///
/// Records can only be added through [`DiskTable::insert_device`] and
/// [`DiskTable::insert_partition`], which keep the host/partition links
/// consistent in both directions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DiskTable {
    records: BTreeMap<String, DeviceRecord>,
}

impl DiskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&DeviceRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Iterates over the records in path order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.records.values()
    }

    /// Iterates over the whole-disk records only.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.iter().filter(|record| !record.is_partition())
    }

    /// Adds a whole-disk record, replacing any earlier record of the same name.
    pub fn insert_device(&mut self, mut record: DeviceRecord) {
        record.kind = DeviceKind::Device;
        record.host_device = NOT_APPLICABLE.to_string();
        if let Some(previous) = self.records.get(&record.name) {
            record.partitions = previous.partitions.clone();
        }
        self.records.insert(record.name.clone(), record);
    }

    /// Adds a partition record and links it to its host device.
    ///
    /// Fails, leaving the table untouched, when the host named by the record
    /// is not already in the table.
    pub fn insert_partition(&mut self, mut record: DeviceRecord) -> Result<(), String> {
        record.kind = DeviceKind::Partition;
        record.partitions.clear();

        let host = self
            .records
            .get_mut(&record.host_device)
            .filter(|host| !host.is_partition())
            .ok_or_else(|| {
                format!(
                    "Host device {} of {} has not been discovered",
                    record.host_device, record.name
                )
            })?;

        if !host.partitions.contains(&record.name) {
            host.partitions.push(record.name.clone());
        }
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Verifies the host/partition links in both directions, returning a
    /// description of every violation found.
    pub fn check_links(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for record in self.iter() {
            match record.kind {
                DeviceKind::Device => {
                    if record.host_device != NOT_APPLICABLE {
                        problems.push(format!(
                            "{} is a device but names host {}",
                            record.name, record.host_device
                        ));
                    }
                    for partition in &record.partitions {
                        let linked = self
                            .get(partition)
                            .is_some_and(|p| p.is_partition() && p.host_device == record.name);
                        if !linked {
                            problems.push(format!(
                                "{} lists {} which does not point back to it",
                                record.name, partition
                            ));
                        }
                    }
                }
                DeviceKind::Partition => {
                    if !record.partitions.is_empty() {
                        problems.push(format!("{} is a partition but has partitions", record.name));
                    }
                    let listed = self
                        .get(&record.host_device)
                        .map(|host| host.partitions.iter().filter(|p| **p == record.name).count());
                    match listed {
                        None => problems.push(format!(
                            "{} names missing host {}",
                            record.name, record.host_device
                        )),
                        Some(1) => {}
                        Some(n) => problems.push(format!(
                            "{} is listed {} times by {}",
                            record.name, n, record.host_device
                        )),
                    }
                }
            }
        }

        problems
    }
}

impl<'a> IntoIterator for &'a DiskTable {
    type Item = &'a DeviceRecord;
    type IntoIter = std::collections::btree_map::Values<'a, String, DeviceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

/// Human-readable, non-fatal problems met during one enumeration pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorLog(Vec<String>);

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message. Showing it is up to the caller; it is only logged
    /// at debug level here.
    pub fn push(&mut self, message: impl fmt::Display) {
        let message = message.to_string();
        log::debug!("soft error: {message}");
        self.0.push(message);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// The outcome of a successful enumeration pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Enumeration {
    pub disks: DiskTable,
    /// Soft errors. A non-empty log means some disks may be missing from
    /// `disks` even though the pass succeeded.
    pub errors: ErrorLog,
}
