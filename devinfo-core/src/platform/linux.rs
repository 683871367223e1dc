//! Disk enumeration on Linux, through `lsblk`.

use super::Enumerator;
use crate::capacity::format_optional;
use crate::command::{CommandRunner, command_line};
use crate::describe::{ContainerRole, DescriptionSignals, describe, split_media_name};
use crate::device::{DeviceRecord, DiskTable, Enumeration};
use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::{DeserializeOwned, Deserializer};
use std::collections::HashSet;

const LSBLK: &str = "lsblk";

const LIST_COLUMNS: &str = "KNAME,PKNAME,TYPE";

const DETAIL_COLUMNS: &str =
    "KNAME,PKNAME,TYPE,SIZE,MODEL,VENDOR,RM,ROTA,TRAN,HOTPLUG,FSTYPE,UUID,PTTYPE,LOG-SEC,PHY-SEC";

/// Enumerates disks with `lsblk`.
///
/// Whole disks and optical drives become devices and their partitions become
/// partitions. Other block devices (loop devices, device-mapper targets,
/// RAID arrays) are left out, together with any partitions of their own.
pub struct Lsblk<R> {
    runner: R,
}

#[derive(Debug, Deserialize)]
struct Output<T> {
    blockdevices: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Listed {
    kname: String,
    #[serde(default)]
    pkname: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Detail {
    pkname: Option<String>,
    #[serde(deserialize_with = "number")]
    size: Option<u64>,
    model: Option<String>,
    vendor: Option<String>,
    #[serde(deserialize_with = "flag")]
    rm: Option<bool>,
    #[serde(deserialize_with = "flag")]
    rota: Option<bool>,
    tran: Option<String>,
    #[serde(deserialize_with = "flag")]
    hotplug: Option<bool>,
    fstype: Option<String>,
    uuid: Option<String>,
    pttype: Option<String>,
    #[serde(rename = "log-sec", deserialize_with = "number")]
    log_sec: Option<u64>,
    #[serde(rename = "phy-sec", deserialize_with = "number")]
    phy_sec: Option<u64>,
}

/// Older util-linux releases print every column as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Number(u64),
    Text(String),
}

fn flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Bool(b)) => Some(b),
        Some(Loose::Number(n)) => Some(n != 0),
        Some(Loose::Text(s)) => match s.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        None => None,
    })
}

fn number<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Number(n)) => Some(n),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Treats blank columns as missing.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn device_path(kname: &str) -> String {
    if kname.starts_with("/dev/") {
        kname.to_string()
    } else {
        format!("/dev/{kname}")
    }
}

impl Detail {
    fn signals(&self) -> DescriptionSignals {
        DescriptionSignals {
            internal: self.hotplug.map(|hotplug| !hotplug),
            removable: self.rm,
            solid_state: self.rota.map(|rotational| !rotational),
            bus_protocol: present(&self.tran).map(str::to_uppercase),
            container: match present(&self.fstype) {
                Some("LVM2_member") => Some(ContainerRole::PhysicalStore("LVM")),
                _ => None,
            },
        }
    }

    fn fill(&self, record: &mut DeviceRecord) {
        let capacity = format_optional(self.size.map(u128::from));
        record.raw_capacity = capacity.raw;
        record.capacity = capacity.human;
        record.description = describe(&self.signals());
        if let Some(fstype) = present(&self.fstype) {
            record.file_system = fstype.to_string();
        }
        if let Some(uuid) = present(&self.uuid) {
            record.uuid = uuid.to_string();
        }
    }
}

impl<R: CommandRunner> Lsblk<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn query<T: DeserializeOwned>(&self, args: &[&str]) -> Result<Vec<T>> {
        let output = self.runner.run(LSBLK, args)?;
        serde_json::from_slice::<Output<T>>(&output)
            .map(|parsed| parsed.blockdevices)
            .map_err(|e| Error::parse(&command_line(LSBLK, args), e, &output))
    }

    fn list(&self) -> Result<Vec<Listed>> {
        self.query(&["--json", "--list", "--output", LIST_COLUMNS])
    }

    fn detail(&self, path: &str) -> Result<Detail> {
        let args = ["--json", "--bytes", "--nodeps", "--output", DETAIL_COLUMNS, path];
        self.query::<Detail>(&args)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::parse(&command_line(LSBLK, &args), "no block device", b""))
    }

    fn device_record(&self, path: String, detail: &Detail) -> DeviceRecord {
        let mut record = DeviceRecord::device(path);
        let (vendor, product) = match (present(&detail.vendor), present(&detail.model)) {
            (Some(vendor), Some(model)) => (vendor.to_string(), model.to_string()),
            (_, Some(model)) => split_media_name(model),
            (Some(vendor), None) => split_media_name(vendor),
            (None, None) => (record.vendor.clone(), record.product.clone()),
        };
        record.vendor = vendor;
        record.product = product;
        if let Some(pttype) = present(&detail.pttype) {
            record.partitioning = pttype.to_string();
        }
        detail.fill(&mut record);
        record
    }

    fn partition_record(
        &self,
        path: String,
        host: String,
        detail: &Detail,
        table: &DiskTable,
    ) -> DeviceRecord {
        let mut record = DeviceRecord::partition(path, host);
        if let Some(host) = table.get(&record.host_device) {
            record.vendor = host.vendor.clone();
            record.product = host.product.clone();
        }
        detail.fill(&mut record);
        record
    }
}

impl<R: CommandRunner> Enumerator for Lsblk<R> {
    fn name(&self) -> &'static str {
        LSBLK
    }

    fn required_tools(&self) -> &'static [&'static str] {
        &[LSBLK]
    }

    fn enumerate(&self) -> Result<Enumeration> {
        let listed = self.list()?;
        log::debug!("lsblk listed {} block devices", listed.len());

        let skipped: HashSet<&str> = listed
            .iter()
            .filter(|l| !matches!(l.kind.as_str(), "disk" | "rom" | "part"))
            .map(|l| l.kname.as_str())
            .collect();

        let mut result = Enumeration::default();

        for Listed { kname, pkname, kind } in &listed {
            let is_partition = match kind.as_str() {
                "disk" | "rom" => false,
                "part" => true,
                other => {
                    log::debug!("skipping {kname} ({other})");
                    continue;
                }
            };

            if let Some(parent) = present(pkname).filter(|p| skipped.contains(p)) {
                log::debug!("skipping {kname} (partition of skipped {parent})");
                continue;
            }

            let path = device_path(kname);
            let detail = match self.detail(&path) {
                Ok(detail) => detail,
                Err(e) => {
                    result.errors.push(e);
                    continue;
                }
            };

            if !is_partition {
                log::debug!("{kname} is a device");
                let record = self.device_record(path, &detail);
                result.disks.insert_device(record);
                continue;
            }

            let Some(host) = present(&detail.pkname).map(device_path) else {
                result
                    .errors
                    .push(format!("lsblk reported no parent device for {path}"));
                continue;
            };
            log::debug!("{kname} is a partition of {host}");
            let record = self.partition_record(path, host, &detail, &result.disks);
            if let Err(e) = result.disks.insert_partition(record) {
                result.errors.push(e);
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
        let path = device_path(disk);
        let detail = self.detail(&path)?;
        detail
            .log_sec
            .or(detail.phy_sec)
            .ok_or(Error::NoBlockSize(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedRunner;
    use crate::device::{DeviceKind, NOT_APPLICABLE, UNKNOWN};

    fn detail_command(path: &str) -> String {
        format!("lsblk --json --bytes --nodeps --output {DETAIL_COLUMNS} {path}")
    }

    const LISTING: &str = r#"{
       "blockdevices": [
          {"kname": "sda", "pkname": null, "type": "disk"},
          {"kname": "sda1", "pkname": "sda", "type": "part"},
          {"kname": "sda2", "pkname": "sda", "type": "part"},
          {"kname": "dm-0", "pkname": "sda2", "type": "lvm"},
          {"kname": "sr0", "pkname": null, "type": "rom"},
          {"kname": "loop0", "pkname": null, "type": "loop"}
       ]
    }"#;

    const SDA: &str = r#"{"blockdevices": [
        {"kname": "sda", "pkname": null, "type": "disk", "size": 500107862016,
         "model": "Samsung SSD 860 EVO 500GB", "vendor": "ATA     ", "rm": false,
         "rota": false, "tran": "sata", "hotplug": false, "fstype": null,
         "uuid": null, "pttype": "gpt", "log-sec": 512, "phy-sec": 512}
    ]}"#;

    const SDA1: &str = r#"{"blockdevices": [
        {"kname": "sda1", "pkname": "sda", "type": "part", "size": 536870912,
         "model": null, "vendor": null, "rm": false, "rota": false, "tran": null,
         "hotplug": false, "fstype": "vfat", "uuid": "7A3B-1C2D", "pttype": "gpt",
         "log-sec": 512, "phy-sec": 512}
    ]}"#;

    // Older util-linux: every column is a string.
    const SDA2: &str = r#"{"blockdevices": [
        {"kname": "sda2", "pkname": "sda", "type": "part", "size": "499570991104",
         "model": null, "vendor": null, "rm": "0", "rota": "0", "tran": null,
         "hotplug": "0", "fstype": "LVM2_member", "uuid": "Xk2v-91", "pttype": "gpt",
         "log-sec": "512", "phy-sec": "4096"}
    ]}"#;

    const SR0: &str = r#"{"blockdevices": [
        {"kname": "sr0", "pkname": null, "type": "rom", "size": null,
         "model": "DVD-RAM UJ8E2", "vendor": "MATSHITA", "rm": true, "rota": true,
         "tran": "usb", "hotplug": true, "fstype": null, "uuid": null, "pttype": null,
         "log-sec": 2048, "phy-sec": 2048}
    ]}"#;

    fn runner() -> ScriptedRunner {
        ScriptedRunner::default()
            .reply("lsblk --json --list --output KNAME,PKNAME,TYPE", LISTING)
            .reply(&detail_command("/dev/sda"), SDA)
            .reply(&detail_command("/dev/sda1"), SDA1)
            .reply(&detail_command("/dev/sda2"), SDA2)
            .reply(&detail_command("/dev/sr0"), SR0)
    }

    #[test]
    fn builds_records_for_disks_and_partitions() {
        let runner = runner();
        let result = Lsblk::new(&runner).enumerate().unwrap();
        assert!(result.errors.is_empty());
        assert_eq!(result.disks.len(), 4);
        assert!(result.disks.check_links().is_empty());
        assert!(!runner.calls.borrow().iter().any(|c| c.contains("dm-0") || c.contains("loop0")));

        let sda = result.disks.get("/dev/sda").unwrap();
        assert_eq!(sda.kind, DeviceKind::Device);
        assert_eq!(sda.partitions, vec!["/dev/sda1", "/dev/sda2"]);
        assert_eq!(sda.vendor, "ATA");
        assert_eq!(sda.product, "Samsung SSD 860 EVO 500GB");
        assert_eq!(sda.capacity, "500 GB");
        assert_eq!(sda.partitioning, "gpt");
        assert_eq!(sda.file_system, NOT_APPLICABLE);
        assert_eq!(
            sda.description,
            "Internal Solid State Drive (Connected through SATA)"
        );
    }

    #[test]
    fn partitions_carry_filesystem_details() {
        let result = Lsblk::new(runner()).enumerate().unwrap();

        let esp = result.disks.get("/dev/sda1").unwrap();
        assert_eq!(esp.host_device, "/dev/sda");
        assert_eq!(esp.vendor, "ATA");
        assert_eq!(esp.product, "Samsung SSD 860 EVO 500GB");
        assert_eq!(esp.raw_capacity, "536870912");
        assert_eq!(esp.capacity, "536 MB");
        assert_eq!(esp.file_system, "vfat");
        assert_eq!(esp.uuid, "7A3B-1C2D");
        assert_eq!(esp.partitioning, NOT_APPLICABLE);
        assert_eq!(esp.flags, UNKNOWN);

        let pv = result.disks.get("/dev/sda2").unwrap();
        assert_eq!(pv.raw_capacity, "499570991104");
        assert_eq!(
            pv.description,
            "Internal Solid State Drive (LVM Physical Store)"
        );
    }

    #[test]
    fn removable_optical_drive() {
        let result = Lsblk::new(runner()).enumerate().unwrap();

        let rom = result.disks.get("/dev/sr0").unwrap();
        assert_eq!(rom.vendor, "MATSHITA");
        assert_eq!(rom.product, "DVD-RAM UJ8E2");
        assert_eq!(rom.capacity, UNKNOWN);
        assert_eq!(
            rom.description,
            "External Removable Drive (Connected through USB)"
        );
    }

    #[test]
    fn failed_detail_is_skipped() {
        let runner = runner().fail(
            &detail_command("/dev/sr0"),
            "lsblk: /dev/sr0: not a block device",
        );

        let result = Lsblk::new(runner).enumerate().unwrap();
        assert_eq!(result.disks.len(), 3);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors.iter().next().unwrap().contains("/dev/sr0"));
    }

    #[test]
    fn partition_without_parent_is_reported() {
        let runner = runner().reply(
            &detail_command("/dev/sda2"),
            r#"{"blockdevices": [{"kname": "sda2", "type": "part"}]}"#,
        );

        let result = Lsblk::new(runner).enumerate().unwrap();
        assert!(!result.disks.contains("/dev/sda2"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.disks.get("/dev/sda").unwrap().partitions, vec!["/dev/sda1"]);
    }

    #[test]
    fn partitions_of_skipped_devices_are_skipped_quietly() {
        let runner = runner().reply(
            "lsblk --json --list --output KNAME,PKNAME,TYPE",
            r#"{"blockdevices": [
               {"kname": "sda", "pkname": null, "type": "disk"},
               {"kname": "loop0", "pkname": null, "type": "loop"},
               {"kname": "loop0p1", "pkname": "loop0", "type": "part"},
               {"kname": "md0", "pkname": "sda", "type": "raid1"},
               {"kname": "md0p1", "pkname": "md0", "type": "part"}
            ]}"#,
        );

        let result = Lsblk::new(&runner).enumerate().unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(result.disks.len(), 1);
        assert!(result.disks.contains("/dev/sda"));
        assert!(
            !runner
                .calls
                .borrow()
                .iter()
                .any(|c| c.contains("loop0") || c.contains("md0"))
        );
    }

    #[test]
    fn nothing_usable_is_a_hard_failure() {
        let runner = ScriptedRunner::default().reply(
            "lsblk --json --list --output KNAME,PKNAME,TYPE",
            r#"{"blockdevices": [{"kname": "loop0", "type": "loop"}]}"#,
        );
        assert!(matches!(
            Lsblk::new(runner).enumerate(),
            Err(Error::NoDisksFound { .. })
        ));

        let runner = ScriptedRunner::default()
            .reply("lsblk --json --list --output KNAME,PKNAME,TYPE", "{}");
        assert!(matches!(
            Lsblk::new(runner).enumerate(),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn block_size_prefers_logical_sectors() {
        let lsblk = Lsblk::new(runner());
        assert_eq!(lsblk.block_size("sda").unwrap(), 512);
        assert_eq!(lsblk.block_size("/dev/sr0").unwrap(), 2048);

        let runner = ScriptedRunner::default().reply(
            &detail_command("/dev/sdb"),
            r#"{"blockdevices": [{"kname": "sdb", "phy-sec": 4096}]}"#,
        );
        assert_eq!(Lsblk::new(&runner).block_size("sdb").unwrap(), 4096);

        let runner = ScriptedRunner::default().reply(
            &detail_command("/dev/sdc"),
            r#"{"blockdevices": [{"kname": "sdc"}]}"#,
        );
        assert!(matches!(
            Lsblk::new(&runner).block_size("sdc"),
            Err(Error::NoBlockSize(path)) if path == "/dev/sdc"
        ));
    }
}
