use crate::frame::Frame;

/// Full-scale sensor reading.
pub const MAX_INTENSITY: f64 = 1000.0;

const SHADES: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Maps `value` from `[dm, d_max]` onto `[vm, v_max]` linearly.
pub fn linear_map(value: f64, dm: f64, d_max: f64, vm: f64, v_max: f64) -> f64 {
    ((value - dm) / (d_max - dm)) * (v_max - vm) + vm
}

fn shade(cell: Option<i64>) -> char {
    match cell {
        None => '?',
        Some(v) => {
            let last = (SHADES.len() - 1) as f64;
            let idx = linear_map(v as f64, 0.0, MAX_INTENSITY, 0.0, last)
                .round()
                .clamp(0.0, last);
            SHADES[idx as usize]
        }
    }
}

/// One line per row, one character per cell.
pub fn grid_to_text(frame: &Frame) -> String {
    frame
        .rows
        .iter()
        .map(|row| row.iter().map(|&c| shade(c)).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}
