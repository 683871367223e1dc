//! Rounding of exact byte counts into short, human-readable sizes.

use crate::device::UNKNOWN;

/// Units a size can be rounded to, smallest first.
pub const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

/// Each step up the unit table divides by this.
///
/// The labels read like binary units but the divisor is decimal; consumers
/// compare against these exact thresholds, so the mismatch is kept.
pub const DIVISOR: u128 = 1000;

/// An exact and a rounded size, e.g. `("500107862016", "500 GB")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capacity {
    pub raw: String,
    pub human: String,
}

impl Capacity {
    pub fn unknown() -> Self {
        Self {
            raw: UNKNOWN.to_string(),
            human: UNKNOWN.to_string(),
        }
    }
}

/// Rounds `bytes` down to the largest unit that leaves at most three digits.
///
/// Sizes of 1000 EB and above have no unit and come back as
/// [`Capacity::unknown`].
pub fn format_capacity(bytes: u128) -> Capacity {
    let mut size = bytes;
    let mut unit = 0;

    while size >= DIVISOR {
        unit += 1;
        if unit == UNITS.len() {
            return Capacity::unknown();
        }
        size /= DIVISOR;
    }

    Capacity {
        raw: bytes.to_string(),
        human: format!("{} {}", size, UNITS[unit]),
    }
}

/// Like [`format_capacity`], but for a size that may be missing.
pub fn format_optional(bytes: Option<u128>) -> Capacity {
    bytes.map_or_else(Capacity::unknown, format_capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn human(bytes: u128) -> String {
        format_capacity(bytes).human
    }

    #[test]
    fn three_digits_stay_in_bytes() {
        assert_eq!(
            format_capacity(999),
            Capacity {
                raw: "999".to_string(),
                human: "999 B".to_string()
            }
        );
        assert_eq!(human(0), "0 B");
    }

    #[test]
    fn uses_decimal_divisor() {
        // 1 KiB is still shown as "1 KB", and 1000 bytes is already "1 KB".
        assert_eq!(human(1000), "1 KB");
        assert_eq!(human(1024), "1 KB");
        assert_eq!(human(1_000_000), "1 MB");
        assert_eq!(human(1_048_576), "1 MB");
        assert_eq!(format_capacity(1_000_000).raw, "1000000");
    }

    #[test]
    fn rounds_down() {
        assert_eq!(human(999_999), "999 KB");
        assert_eq!(human(500_107_862_016), "500 GB");
        assert_eq!(human(2_000_398_934_016), "2 TB");
    }

    #[test]
    fn largest_unit_is_exabytes() {
        assert_eq!(human(999_999_999_999_999_999_999), "999 EB");
        assert_eq!(format_capacity(1_000_000_000_000_000_000_000), Capacity::unknown());
        assert_eq!(format_capacity(u128::MAX), Capacity::unknown());
    }

    #[test]
    fn missing_size_is_unknown() {
        assert_eq!(format_optional(None), Capacity::unknown());
        assert_eq!(format_optional(Some(512)).human, "512 B");
    }
}
