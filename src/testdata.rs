//! Recorded process-table snapshots.
//!
//! A test data file replays raw procfs text frame by frame instead of
//! reading /proc, so rankings and CPU breakdowns can be reproduced exactly.
//! Each call to [`ProcessEnumerator::read_system_stat`] starts a new
//! generation and advances to the next frame; after the last frame the same
//! frame is served again.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::process::ProcessEnumerator;

/// One thread of a recorded process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestTask {
    pub tid: i32,
    pub stat: String,
}

/// One recorded process with its raw detail text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestProcess {
    pub pid: i32,
    pub stat: String,
    /// Raw command line, arguments separated by NUL.
    #[serde(default)]
    pub cmdline: String,
    pub status: String,
    #[serde(default)]
    pub tasks: Vec<TestTask>,
}

/// One recorded pass over the process table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestFrame {
    /// Contents of /proc/stat (at least the aggregate cpu line).
    pub stat: String,
    #[serde(default)]
    pub processes: Vec<TestProcess>,
}

/// Root structure for test data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestData {
    pub version: String,
    pub frames: Vec<TestFrame>,
}

/// Load test data from a JSON, YAML or TOML file, chosen by extension.
pub fn load_test_data_from_file(path: &Path) -> Result<TestData> {
    debug!("Loading test data from: {}", path.display());

    if !path.exists() {
        bail!("Test data file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test data file {}", path.display()))?;

    let data: TestData = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).context("Failed to parse test data YAML")?
        }
        Some("toml") => toml::from_str(&content).context("Failed to parse test data TOML")?,
        _ => serde_json::from_str(&content).context("Failed to parse test data JSON")?,
    };

    if data.frames.is_empty() {
        bail!("Test data file {} contains no frames", path.display());
    }

    info!(
        "Loaded test data version {} with {} frames",
        data.version,
        data.frames.len()
    );

    Ok(data)
}

/// Enumerator replaying [`TestData`] frames.
#[derive(Debug, Clone)]
pub struct RecordedSnapshots {
    data: TestData,
    cursor: Option<usize>,
}

impl RecordedSnapshots {
    pub fn new(data: TestData) -> Self {
        Self { data, cursor: None }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::new(load_test_data_from_file(path)?))
    }

    fn frame(&self) -> io::Result<&TestFrame> {
        self.cursor
            .and_then(|i| self.data.frames.get(i))
            .ok_or_else(|| io::Error::other("No recorded frame selected"))
    }

    fn process(&self, pid: i32) -> io::Result<&TestProcess> {
        self.frame()?
            .processes
            .iter()
            .find(|p| p.pid == pid)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("pid {pid} not recorded")))
    }
}

impl ProcessEnumerator for RecordedSnapshots {
    fn read_system_stat(&mut self) -> io::Result<String> {
        let last = self.data.frames.len().saturating_sub(1);
        let next = self.cursor.map_or(0, |i| (i + 1).min(last));
        self.cursor = Some(next);
        Ok(self.frame()?.stat.clone())
    }

    fn list_pids(&mut self) -> io::Result<Vec<i32>> {
        Ok(self.frame()?.processes.iter().map(|p| p.pid).collect())
    }

    fn list_tids(&mut self, pid: i32) -> io::Result<Vec<i32>> {
        Ok(self.process(pid)?.tasks.iter().map(|t| t.tid).collect())
    }

    fn read_stat(&mut self, pid: i32, tid: Option<i32>) -> io::Result<String> {
        let process = self.process(pid)?;
        match tid {
            None => Ok(process.stat.clone()),
            Some(tid) => process
                .tasks
                .iter()
                .find(|t| t.tid == tid)
                .map(|t| t.stat.clone())
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("tid {tid} not recorded"))
                }),
        }
    }

    fn read_cmdline(&mut self, pid: i32) -> io::Result<Vec<u8>> {
        Ok(self.process(pid)?.cmdline.as_bytes().to_vec())
    }

    fn read_status(&mut self, pid: i32) -> io::Result<String> {
        Ok(self.process(pid)?.status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::stat_line;
    use tempfile::TempDir;

    fn sample() -> TestData {
        let frame = |utime: u64, idle: u64| TestFrame {
            stat: format!("cpu  {utime} 0 0 {idle} 0 0 0\n"),
            processes: vec![TestProcess {
                pid: 100,
                stat: stat_line(100, "app", 'R', utime, 0, 4096, 2, 0),
                cmdline: "/usr/bin/app\0--flag\0".into(),
                status: "Uid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n".into(),
                tasks: vec![TestTask {
                    tid: 100,
                    stat: stat_line(100, "app", 'R', utime, 0, 4096, 2, 0),
                }],
            }],
        };
        TestData {
            version: "1.0".into(),
            frames: vec![frame(10, 100), frame(20, 200)],
        }
    }

    #[test]
    fn test_frames_advance_then_stick_to_last() {
        let mut rec = RecordedSnapshots::new(sample());
        assert!(rec.list_pids().is_err());

        assert!(rec.read_system_stat().unwrap().starts_with("cpu  10 "));
        assert!(rec.read_system_stat().unwrap().starts_with("cpu  20 "));
        assert!(rec.read_system_stat().unwrap().starts_with("cpu  20 "));
        assert_eq!(rec.list_pids().unwrap(), vec![100]);
    }

    #[test]
    fn test_unknown_entities_are_not_found() {
        let mut rec = RecordedSnapshots::new(sample());
        rec.read_system_stat().unwrap();
        let err = rec.read_stat(999, None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        let err = rec.read_stat(100, Some(5)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(rec.read_cmdline(100).unwrap(), b"/usr/bin/app\0--flag\0".to_vec());
    }

    #[test]
    fn test_load_json_and_yaml() {
        let dir = TempDir::new().unwrap();
        let data = sample();

        let json = dir.path().join("frames.json");
        fs::write(&json, serde_json::to_string_pretty(&data).unwrap()).unwrap();
        let loaded = load_test_data_from_file(&json).unwrap();
        assert_eq!(loaded.frames.len(), 2);

        let yaml = dir.path().join("frames.yaml");
        fs::write(&yaml, serde_yaml::to_string(&data).unwrap()).unwrap();
        let loaded = load_test_data_from_file(&yaml).unwrap();
        assert_eq!(loaded.frames[1].processes[0].pid, 100);
    }

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let data = sample();

        let path = dir.path().join("frames.toml");
        fs::write(&path, toml::to_string(&data).unwrap()).unwrap();
        let loaded = load_test_data_from_file(&path).unwrap();
        assert_eq!(loaded.version, "1.0");
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!(loaded.frames[1].stat, data.frames[1].stat);
        assert_eq!(loaded.frames[0].processes[0].cmdline, "/usr/bin/app\0--flag\0");
        assert_eq!(loaded.frames[0].processes[0].tasks[0].tid, 100);
    }

    #[test]
    fn test_load_rejects_missing_and_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_test_data_from_file(&dir.path().join("missing.json")).is_err());

        let empty = dir.path().join("empty.json");
        fs::write(&empty, r#"{"version":"1.0","frames":[]}"#).unwrap();
        assert!(load_test_data_from_file(&empty).is_err());
    }
}
