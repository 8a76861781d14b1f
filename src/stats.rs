//! Running statistics over completed scans.

use std::fmt::Write as FmtWrite;

#[derive(Clone, Copy, Default, Debug)]
pub struct RunningStat {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl RunningStat {
    pub fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
            self.last = value;
            self.sum = value;
            self.count = 1;
            return;
        }
        self.count += 1;
        self.sum += value;
        self.last = value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / (self.count as f64)
        }
    }

    /// (current, average, max, min, count)
    pub fn snapshot(&self) -> (f64, f64, f64, f64, u64) {
        (self.last, self.avg(), self.max, self.min, self.count)
    }
}

#[derive(Default, Debug)]
pub struct ScanStats {
    entities: RunningStat,
    skipped: RunningStat,
    scan_duration_seconds: RunningStat,
}

impl ScanStats {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn record_scan(&mut self, entities: usize, skipped: usize, scan_duration_seconds: f64) {
        self.entities.add(entities as f64);
        self.skipped.add(skipped as f64);
        self.scan_duration_seconds.add(scan_duration_seconds);
    }

    pub fn total_scans(&self) -> u64 {
        self.entities.count
    }

    pub fn render_table(&self) -> String {
        let left_col = 20usize;
        let col_w = 12usize;

        let mut out = String::new();

        writeln!(
            out,
            "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
            "metric",
            "current",
            "average",
            "max",
            "min",
            left = left_col,
            col = col_w
        )
        .ok();

        writeln!(out, "{}", "-".repeat(left_col + 3 + (col_w + 3) * 4)).ok();

        let rows: [(&str, &RunningStat, usize); 3] = [
            ("entities", &self.entities, 0),
            ("skipped", &self.skipped, 0),
            ("scan duration (s)", &self.scan_duration_seconds, 3),
        ];
        for (label, stat, prec) in rows {
            let (cur, avg, max, min, _) = stat.snapshot();
            writeln!(
                out,
                "{:left$} | {:^col$} | {:^col$} | {:^col$} | {:^col$}",
                label,
                format!("{:.prec$}", cur),
                format!("{:.prec$}", avg, prec = prec.max(1)),
                format!("{:.prec$}", max),
                format!("{:.prec$}", min),
                left = left_col,
                col = col_w
            )
            .ok();
        }

        writeln!(out).ok();
        writeln!(out, "number of done scans: {}", self.total_scans()).ok();

        out
    }
}
