//! Experiment reports and their delivery

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;
use uuid::Uuid;

use swarmform_common::{FormationResult, Result};

use crate::config::SinkSettings;

/// Outcome of one seeded experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Run this experiment belongs to
    pub run_id: Uuid,
    /// Index within the run
    pub experiment_id: usize,
    pub seed: u64,
    pub algorithm: String,
    pub timestamp: DateTime<Utc>,
    /// One row per agent
    pub final_positions: Vec<Vec<f64>>,
    pub formation_error: f64,
    pub error_history: Vec<f64>,
    pub success: bool,
    pub iterations: usize,
}

impl ExperimentReport {
    pub fn from_result(
        run_id: Uuid,
        experiment_id: usize,
        seed: u64,
        algorithm: &str,
        result: &FormationResult,
    ) -> Self {
        let final_positions = result
            .positions
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect();

        Self {
            run_id,
            experiment_id,
            seed,
            algorithm: algorithm.to_string(),
            timestamp: Utc::now(),
            final_positions,
            formation_error: result.formation_error,
            error_history: result.error_history.clone(),
            success: result.success,
            iterations: result.iterations,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Writes newline-delimited JSON to stdout and an optional TCP collector
#[derive(Debug, Clone, Default)]
pub struct ReportSink {
    addr: Option<String>,
}

impl ReportSink {
    pub fn new(settings: &SinkSettings) -> Self {
        Self {
            addr: settings.addr.clone(),
        }
    }

    pub fn collector(&self) -> Option<&str> {
        self.addr.as_deref()
    }

    /// Print the line, then forward it to the collector if one is set
    pub async fn emit(&self, line: &str) -> Result<()> {
        println!("{line}");

        if let Some(addr) = &self.addr {
            let mut stream = TcpStream::connect(addr).await?;
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\n").await?;
            stream.shutdown().await?;
            debug!(addr = %addr, bytes = line.len(), "Report forwarded");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn result() -> FormationResult {
        FormationResult {
            positions: DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
            formation_error: 0.5,
            success: false,
            iterations: 7,
            final_displacement: 0.1,
            final_time: 0.7,
            error_history: vec![2.0, 1.0, 0.5],
        }
    }

    #[test]
    fn test_report_rows_follow_agents() {
        let report = ExperimentReport::from_result(Uuid::now_v7(), 3, 203, "consensus", &result());
        assert_eq!(report.final_positions, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(report.iterations, 7);

        let json = report.to_json().unwrap();
        let back: ExperimentReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[tokio::test]
    async fn test_emit_to_collector() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let reader = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = String::new();
            socket.read_to_string(&mut buf).await.unwrap();
            buf
        });

        let sink = ReportSink::new(&SinkSettings {
            addr: Some(addr),
            ..SinkSettings::default()
        });
        sink.emit("{\"experiment_id\":0}").await.unwrap();

        assert_eq!(reader.await.unwrap(), "{\"experiment_id\":0}\n");
    }

    #[tokio::test]
    async fn test_unreachable_collector_is_io_error() {
        // Bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let sink = ReportSink::new(&SinkSettings {
            addr: Some(addr),
            ..SinkSettings::default()
        });
        let err = sink.emit("{}").await.unwrap_err();
        assert!(matches!(err, swarmform_common::FormationError::Io(_)));
    }

    #[tokio::test]
    async fn test_stdout_only() {
        let sink = ReportSink::default();
        assert!(sink.collector().is_none());
        sink.emit("{}").await.unwrap();
    }
}
