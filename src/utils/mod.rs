use std::time::{Duration, Instant};
use tracing::info;

/// Logs when a command starts and how long it took once dropped.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!("⏱  Finished: {} (took {:.2?})", self.label, self.elapsed());
    }
}

/// Count with thousands separators: 1234567 → "1,234,567".
pub fn fmt_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Horizontal bar scaled so that `peak` fills `width` cells.
pub fn bar(value: usize, peak: usize, width: usize) -> String {
    if peak == 0 {
        return String::new();
    }
    let cells = (value * width).div_ceil(peak).min(width);
    "█".repeat(cells)
}
