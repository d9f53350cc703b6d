//! Formatting utilities

use glam::{Mat4, Vec3};
use humansize::{DECIMAL, format_size};

/// Format file size in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    format_size(bytes, DECIMAL)
}

/// Format a percentage
pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}

/// Format a duration in seconds
pub fn format_seconds(seconds: f32) -> String {
    format!("{seconds:.3} s")
}

/// Format a vector as `(x, y, z)` with three decimals
pub fn format_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

/// Format a matrix as four rows of its column-vector form
pub fn format_matrix(m: &Mat4) -> Vec<String> {
    (0..4)
        .map(|r| {
            let row = m.row(r);
            format!(
                "[{:>9.4} {:>9.4} {:>9.4} {:>9.4}]",
                row.x, row.y, row.z, row.w
            )
        })
        .collect()
}
