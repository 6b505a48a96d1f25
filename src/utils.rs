const BYTE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Human-readable byte count, e.g. `500B`, `1.5KB`, `3.2MB`.
///
/// Plain bytes are printed without decimals, every larger unit with one.
/// Values past the gigabyte range stay in GB. `None` formats as an empty string.
pub fn format_bytes(bytes: Option<u64>) -> String {
    let Some(bytes) = bytes else {
        return String::new();
    };

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{}", bytes, BYTE_UNITS[0])
    } else {
        format!("{:.1}{}", value, BYTE_UNITS[unit])
    }
}
