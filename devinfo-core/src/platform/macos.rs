//! Disk enumeration on macOS, through `diskutil`.
//!
//! `diskutil list -plist` names every disk and partition the system knows
//! about; `diskutil info -plist <disk>` then describes each one. Both print
//! property lists.

use super::Enumerator;
use crate::capacity::{Capacity, format_capacity};
use crate::command::{CommandRunner, command_line};
use crate::describe::{ContainerRole, DescriptionSignals, describe, split_media_name};
use crate::device::{DeviceRecord, DiskTable, Enumeration};
use crate::error::{Error, Result};
use crate::naming::{Classification, NamingScheme};
use plist::{Dictionary, Value};
use std::io::Cursor;

const DISKUTIL: &str = "diskutil";

/// Enumerates disks with `diskutil`.
pub struct Diskutil<R> {
    runner: R,
    naming: NamingScheme,
}

impl<R: CommandRunner> Diskutil<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            naming: NamingScheme::MACOS,
        }
    }

    /// Replaces the grammar used to tell devices from partitions.
    pub fn with_naming(mut self, naming: NamingScheme) -> Self {
        self.naming = naming;
        self
    }

    fn plist(&self, args: &[&str]) -> Result<Dictionary> {
        let output = self.runner.run(DISKUTIL, args)?;
        parse_dictionary(&command_line(DISKUTIL, args), &output)
    }

    /// The identifiers of every disk and partition, e.g. `["disk0", "disk0s1"]`.
    fn list(&self) -> Result<Vec<String>> {
        let args = ["list", "-plist"];
        let command = command_line(DISKUTIL, &args);
        let output = self.runner.run(DISKUTIL, &args)?;
        let dict = parse_dictionary(&command, &output)?;
        let disks = dict
            .get("AllDisks")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::parse(&command, "no AllDisks array", &output))?;

        Ok(disks
            .iter()
            .filter_map(Value::as_string)
            .map(str::to_string)
            .collect())
    }

    fn info(&self, disk: &str) -> Result<DiskInfo> {
        self.plist(&["info", "-plist", disk]).map(DiskInfo)
    }

    fn device_record(&self, identifier: &str, info: &DiskInfo) -> DeviceRecord {
        let mut record = DeviceRecord::device(self.naming.path(identifier));
        if let Some(media_name) = info.string("MediaName") {
            (record.vendor, record.product) = split_media_name(media_name);
        }
        let Capacity { raw, human } = info.capacity();
        record.raw_capacity = raw;
        record.capacity = human;
        record.description = describe(&info.signals(identifier));
        record
    }

    fn partition_record(
        &self,
        identifier: &str,
        host: String,
        info: &DiskInfo,
        table: &DiskTable,
    ) -> DeviceRecord {
        let mut record = DeviceRecord::partition(self.naming.path(identifier), host);
        // diskutil only names the media of whole disks.
        if let Some(host) = table.get(&record.host_device) {
            record.vendor = host.vendor.clone();
            record.product = host.product.clone();
        }
        let Capacity { raw, human } = info.capacity();
        record.raw_capacity = raw;
        record.capacity = human;
        record.description = describe(&info.signals(identifier));
        record
    }
}

impl<R: CommandRunner> Enumerator for Diskutil<R> {
    fn name(&self) -> &'static str {
        DISKUTIL
    }

    fn required_tools(&self) -> &'static [&'static str] {
        &[DISKUTIL]
    }

    fn enumerate(&self) -> Result<Enumeration> {
        let identifiers = self.list()?;
        log::debug!("diskutil listed {} disks", identifiers.len());

        let mut result = Enumeration::default();

        for identifier in &identifiers {
            let Some(classification) = self.naming.classify(identifier) else {
                result.errors.push(Error::UnknownDisk(identifier.clone()));
                continue;
            };

            let info = match self.info(identifier) {
                Ok(info) => info,
                Err(e) => {
                    result.errors.push(e);
                    continue;
                }
            };

            match classification {
                Classification::Device => {
                    log::debug!("{identifier} is a device");
                    let record = self.device_record(identifier, &info);
                    result.disks.insert_device(record);
                }
                Classification::Partition { host } => {
                    log::debug!("{identifier} is a partition of {host}");
                    let record = self.partition_record(identifier, host, &info, &result.disks);
                    if let Err(e) = result.disks.insert_partition(record) {
                        result.errors.push(e);
                    }
                }
            }
        }

        if result.disks.is_empty() {
            return Err(Error::NoDisksFound {
                errors: result.errors,
            });
        }

        log::info!(
            "found {} disks and partitions ({} problems)",
            result.disks.len(),
            result.errors.len()
        );
        Ok(result)
    }

    fn block_size(&self, disk: &str) -> Result<u64> {
        let info = self.info(disk)?;
        info.unsigned("DeviceBlockSize")
            .or_else(|| info.unsigned("VolumeBlockSize"))
            .ok_or_else(|| Error::NoBlockSize(disk.to_string()))
    }
}

fn parse_dictionary(command: &str, output: &[u8]) -> Result<Dictionary> {
    Value::from_reader(Cursor::new(output))
        .map_err(|e| Error::parse(command, e, output))?
        .into_dictionary()
        .ok_or_else(|| Error::parse(command, "expected a dictionary", output))
}

/// The output of `diskutil info -plist` for one disk.
struct DiskInfo(Dictionary);

impl DiskInfo {
    fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_string)
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_boolean)
    }

    fn unsigned(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_unsigned_integer)
    }

    fn capacity(&self) -> Capacity {
        self.unsigned("TotalSize")
            .map_or_else(Capacity::unknown, |bytes| format_capacity(bytes.into()))
    }

    fn signals(&self, identifier: &str) -> DescriptionSignals {
        let removable = match (self.boolean("Removable"), self.boolean("RemovableMedia")) {
            (None, None) => None,
            (a, b) => Some(a == Some(true) || b == Some(true)),
        };

        DescriptionSignals {
            internal: self.boolean("Internal"),
            removable,
            solid_state: self.boolean("SolidState"),
            bus_protocol: self.string("BusProtocol").map(str::to_string),
            container: self.apfs_role(identifier),
        }
    }

    fn apfs_role(&self, identifier: &str) -> Option<ContainerRole> {
        let bare = identifier.rsplit('/').next().unwrap_or(identifier);
        if self.string("Content") == Some("Apple_APFS") {
            Some(ContainerRole::PhysicalStore("APFS"))
        } else if self.string("APFSContainerReference") == Some(bare) {
            Some(ContainerRole::Container("APFS"))
        } else if self.string("FilesystemType") == Some("apfs") {
            Some(ContainerRole::Volume("APFS"))
        } else {
            None
        }
    }
}
