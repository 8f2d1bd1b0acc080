//! Chart directories on disk.

use std::fs;
use std::path::{Path, PathBuf};

/// Write a chart directory at `dir` declaring `dependencies`, none of which
/// are vendored. Returns `dir`.
///
/// # Panics
/// Panics if the filesystem operations fail.
pub fn write_chart(dir: &Path, name: &str, version: &str, dependencies: &[&str]) -> PathBuf {
    fs::create_dir_all(dir)
        .unwrap_or_else(|e| panic!("write_chart: failed to create {}: {e}", dir.display()));

    let mut chart = format!("apiVersion: v2\nname: {name}\nversion: {version}\n");
    if !dependencies.is_empty() {
        chart.push_str("dependencies:\n");
        for dep in dependencies {
            chart.push_str(&format!("  - name: {dep}\n    version: 1.0.0\n"));
        }
    }
    fs::write(dir.join("Chart.yaml"), chart)
        .unwrap_or_else(|e| panic!("write_chart: failed to write Chart.yaml: {e}"));
    dir.to_path_buf()
}

/// Vendor `name` as an unpacked subchart of the chart at `chart_dir`.
pub fn vendor_subchart(chart_dir: &Path, name: &str) -> PathBuf {
    write_chart(&chart_dir.join("charts").join(name), name, "1.0.0", &[])
}
