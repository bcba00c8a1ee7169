//! Output file naming

use chrono::Local;

/// Local time stamp shared by every file of one run
pub fn run_timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// `<base><suffix>_<timestamp>.csv`, or `<base><suffix>.csv` without one
pub fn output_file_name(base: &str, suffix: &str, timestamp: Option<&str>) -> String {
    match timestamp {
        Some(ts) => format!("{base}{suffix}_{ts}.csv"),
        None => format!("{base}{suffix}.csv"),
    }
}
