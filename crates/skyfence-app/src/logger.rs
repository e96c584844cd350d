//! Append-only JSONL event log.
//!
//! One JSON object per line: a `scenario_start` record, every kernel
//! event, then a `scenario_end` record.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use serde_json::json;

use skyfence_core::events::SimEvent;
use skyfence_core::scenario::ScenarioSpec;

pub struct EventLog {
    writer: BufWriter<File>,
    path: PathBuf,
    events_written: u64,
}

impl EventLog {
    /// Create `<logs_dir>/<scenario>_<epoch>.jsonl` and write the
    /// `scenario_start` line.
    pub fn create(logs_dir: &Path, scenario: &ScenarioSpec) -> anyhow::Result<EventLog> {
        fs::create_dir_all(logs_dir)
            .with_context(|| format!("creating logs directory {}", logs_dir.display()))?;
        let epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = logs_dir.join(format!("{}_{epoch}.jsonl", scenario.name));
        let file = File::create(&path)
            .with_context(|| format!("creating event log {}", path.display()))?;
        let mut log = EventLog {
            writer: BufWriter::new(file),
            path,
            events_written: 0,
        };
        log.write_line(&json!({
            "type": "scenario_start",
            "scenario_id": scenario.id,
            "name": scenario.name,
            "seed": scenario.seed,
            "drone_count": scenario.drones.len(),
            "interceptor_count": scenario.interceptor_count,
        }))?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events_written(&self) -> u64 {
        self.events_written
    }

    pub fn log_event(&mut self, event: &SimEvent) -> anyhow::Result<()> {
        let line = serde_json::to_value(event)?;
        self.write_line(&line)?;
        self.events_written += 1;
        Ok(())
    }

    /// Write the `scenario_end` line and flush.
    pub fn finish(mut self, sim_time_secs: f64) -> anyhow::Result<()> {
        let events = self.events_written;
        self.write_line(&json!({
            "type": "scenario_end",
            "sim_time_secs": sim_time_secs,
            "events": events,
        }))?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_line(&mut self, value: &serde_json::Value) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfence_core::events::SimEvent;

    #[test]
    fn test_log_is_bracketed_jsonl() {
        let dir = std::env::temp_dir().join(format!("skyfence_log_test_{}", std::process::id()));
        let scenario = ScenarioSpec::baseline_raid();
        let mut log = EventLog::create(&dir, &scenario).unwrap();
        let path = log.path().to_path_buf();

        log.log_event(&SimEvent::CommandRejected {
            timestamp: 0.1,
            reason: "test".into(),
        })
        .unwrap();
        log.finish(0.1).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "scenario_start");
        assert_eq!(first["seed"], 12345);

        let middle: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(middle["type"], "command_rejected");

        let last: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last["type"], "scenario_end");
        assert_eq!(last["events"], 1);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
