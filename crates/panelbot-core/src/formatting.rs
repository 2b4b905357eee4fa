//! Small formatting helpers for status and report text.

const TRAFFIC_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count the way the panel does everywhere: two decimals and a
/// 1024-based unit, e.g. `1048576` -> `"1.00 MB"`.
pub fn format_traffic(bytes: i64) -> String {
    let mut value = bytes.max(0) as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit < TRAFFIC_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, TRAFFIC_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_one_megabyte() {
        assert_eq!(format_traffic(1_048_576), "1.00 MB");
    }

    #[test]
    fn formats_unit_boundaries() {
        assert_eq!(format_traffic(0), "0.00 B");
        assert_eq!(format_traffic(1023), "1023.00 B");
        assert_eq!(format_traffic(1024), "1.00 KB");
        assert_eq!(format_traffic(1536), "1.50 KB");
        assert_eq!(format_traffic(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn negative_totals_clamp_to_zero() {
        assert_eq!(format_traffic(-42), "0.00 B");
    }

    #[test]
    fn huge_totals_stay_in_terabytes() {
        let two_pb = 2_i64 * 1024 * 1024 * 1024 * 1024 * 1024;
        assert_eq!(format_traffic(two_pb), "2048.00 TB");
    }
}
