//! Identifier grammars used to tell devices and partitions apart by name.

/// How a platform names its disks.
///
/// A name is `device_prefix` followed by a unit number; everything from the
/// first `partition_separator` after the prefix onwards marks a partition
/// (or a slice of one) of that unit. With the macOS scheme, `disk1` is a
/// device, `disk1s2` a partition of `/dev/disk1`, and `disk3s1s1` is also
/// attributed to `/dev/disk3`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingScheme {
    pub path_prefix: &'static str,
    pub device_prefix: &'static str,
    pub partition_separator: char,
}

/// What a name turned out to be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    Device,
    Partition { host: String },
}

impl NamingScheme {
    pub const MACOS: NamingScheme = NamingScheme {
        path_prefix: "/dev/",
        device_prefix: "disk",
        partition_separator: 's',
    };

    /// Turns a bare identifier (`disk1`) into its canonical path (`/dev/disk1`).
    /// Identifiers that already carry the path prefix are returned unchanged.
    pub fn path(&self, identifier: &str) -> String {
        if identifier.starts_with(self.path_prefix) {
            identifier.to_string()
        } else {
            format!("{}{}", self.path_prefix, identifier)
        }
    }

    /// Classifies `identifier`, with or without its path prefix.
    ///
    /// Returns `None` for names outside this grammar.
    pub fn classify(&self, identifier: &str) -> Option<Classification> {
        let bare = identifier
            .strip_prefix(self.path_prefix)
            .unwrap_or(identifier);
        let unit = bare.strip_prefix(self.device_prefix)?;
        if unit.is_empty() {
            return None;
        }

        match unit.split_once(self.partition_separator) {
            None => Some(Classification::Device),
            Some((number, _)) if !number.is_empty() => Some(Classification::Partition {
                host: format!("{}{}{}", self.path_prefix, self.device_prefix, number),
            }),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_disks() {
        let scheme = NamingScheme::MACOS;
        assert_eq!(scheme.classify("disk0"), Some(Classification::Device));
        assert_eq!(scheme.classify("/dev/disk12"), Some(Classification::Device));
    }

    #[test]
    fn partitions_point_at_their_unit() {
        let scheme = NamingScheme::MACOS;
        assert_eq!(
            scheme.classify("disk1s2"),
            Some(Classification::Partition {
                host: "/dev/disk1".to_string()
            })
        );
        assert_eq!(
            scheme.classify("disk0s12"),
            Some(Classification::Partition {
                host: "/dev/disk0".to_string()
            })
        );
        assert_eq!(
            scheme.classify("disk3s1s1"),
            Some(Classification::Partition {
                host: "/dev/disk3".to_string()
            })
        );
    }

    #[test]
    fn foreign_names() {
        let scheme = NamingScheme::MACOS;
        assert_eq!(scheme.classify("sda1"), None);
        assert_eq!(scheme.classify("disk"), None);
        assert_eq!(scheme.classify("disks1"), None);
    }

    #[test]
    fn paths() {
        let scheme = NamingScheme::MACOS;
        assert_eq!(scheme.path("disk2s1"), "/dev/disk2s1");
        assert_eq!(scheme.path("/dev/disk2s1"), "/dev/disk2s1");
    }
}
