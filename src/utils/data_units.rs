pub const KIBI_LIMIT: u64 = 1024;
pub const MEBI_LIMIT: u64 = 1024 * 1024;
pub const GIBI_LIMIT: u64 = 1024 * 1024 * 1024;
pub const TEBI_LIMIT: u64 = 1024 * 1024 * 1024 * 1024;

pub const KIBI_LIMIT_F64: f64 = 1024.0;
pub const MEBI_LIMIT_F64: f64 = 1024.0 * 1024.0;
pub const GIBI_LIMIT_F64: f64 = 1024.0 * 1024.0 * 1024.0;
pub const TEBI_LIMIT_F64: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;

/// Returns a tuple containing the value and the unit in bytes. In units of 1024. This
/// only supports up to a tebi.
#[inline]
pub fn get_binary_bytes(bytes: u64) -> (f64, &'static str) {
    match bytes {
        b if b < KIBI_LIMIT => (bytes as f64, "B"),
        b if b < MEBI_LIMIT => (bytes as f64 / KIBI_LIMIT_F64, "KiB"),
        b if b < GIBI_LIMIT => (bytes as f64 / MEBI_LIMIT_F64, "MiB"),
        b if b < TEBI_LIMIT => (bytes as f64 / GIBI_LIMIT_F64, "GiB"),
        _ => (bytes as f64 / TEBI_LIMIT_F64, "TiB"),
    }
}

/// A short human-readable byte count, like `1.5GiB`.
pub fn binary_bytes_string(bytes: u64) -> String {
    match get_binary_bytes(bytes) {
        (value, "B") => format!("{value:.0}B"),
        (value, unit) => format!("{value:.1}{unit}"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binary_units() {
        assert_eq!(get_binary_bytes(0), (0.0, "B"));
        assert_eq!(get_binary_bytes(1023), (1023.0, "B"));
        assert_eq!(get_binary_bytes(1024), (1.0, "KiB"));
        assert_eq!(get_binary_bytes(3 * MEBI_LIMIT / 2), (1.5, "MiB"));
        assert_eq!(get_binary_bytes(2 * TEBI_LIMIT), (2.0, "TiB"));
    }

    #[test]
    fn strings() {
        assert_eq!(binary_bytes_string(512), "512B");
        assert_eq!(binary_bytes_string(3 * GIBI_LIMIT / 2), "1.5GiB");
    }
}
