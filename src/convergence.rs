//! Recording of convergence histories.
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

/// An append-only sequence of `(x, y)` pairs, e.g. DOF count against error in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceSeries {
    points: Vec<(f64, f64)>,
}

impl ConvergenceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<(f64, f64)> {
        self.points.last().copied()
    }

    /// Writes the series as two whitespace-separated columns, one point per line.
    pub fn write_to(&self, mut writer: impl Write) -> std::io::Result<()> {
        for (x, y) in &self.points {
            writeln!(writer, "{} {}", x, y)?;
        }
        writer.flush()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
        self.write_to(BufWriter::new(file))
            .wrap_err_with(|| format!("failed to write {}", path.display()))
    }
}

/// Error against DOF count and against CPU time, for both estimated and exact errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceTracker {
    pub dof_estimated: ConvergenceSeries,
    pub cpu_estimated: ConvergenceSeries,
    pub dof_exact: ConvergenceSeries,
    pub cpu_exact: ConvergenceSeries,
}

impl ConvergenceTracker {
    pub const DOF_ESTIMATED_FILE: &'static str = "conv_dof_est.dat";
    pub const CPU_ESTIMATED_FILE: &'static str = "conv_cpu_est.dat";
    pub const DOF_EXACT_FILE: &'static str = "conv_dof_exact.dat";
    pub const CPU_EXACT_FILE: &'static str = "conv_cpu_exact.dat";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_estimated(&mut self, num_dofs: usize, cpu_seconds: f64, error_percent: f64) {
        self.dof_estimated.push(num_dofs as f64, error_percent);
        self.cpu_estimated.push(cpu_seconds, error_percent);
    }

    pub fn record_exact(&mut self, num_dofs: usize, cpu_seconds: f64, error_percent: f64) {
        self.dof_exact.push(num_dofs as f64, error_percent);
        self.cpu_exact.push(cpu_seconds, error_percent);
    }

    pub fn has_exact(&self) -> bool {
        !self.dof_exact.is_empty()
    }

    /// Writes all series into `dir` under their fixed file names.
    ///
    /// The exact-error series are only written if they were recorded.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> eyre::Result<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(eyre!("{} is not a directory", dir.display()));
        }
        self.dof_estimated.save(dir.join(Self::DOF_ESTIMATED_FILE))?;
        self.cpu_estimated.save(dir.join(Self::CPU_ESTIMATED_FILE))?;
        if self.has_exact() {
            self.dof_exact.save(dir.join(Self::DOF_EXACT_FILE))?;
            self.cpu_exact.save(dir.join(Self::CPU_EXACT_FILE))?;
        }
        Ok(())
    }
}

/// Accumulates time over a sequence of measured intervals.
///
/// Time spent outside `start`/`stop` pairs, e.g. for writing output or computing verification
/// errors, is not counted.
#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    started: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.accumulated += started.elapsed();
        }
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// The accumulated time, including the currently running interval.
    pub fn accumulated(&self) -> Duration {
        self.accumulated + self.started.map(|started| started.elapsed()).unwrap_or_default()
    }

    pub fn accumulated_seconds(&self) -> f64 {
        self.accumulated().as_secs_f64()
    }
}
