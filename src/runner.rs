//! Document loading and step transcripts.

use colored::Colorize;
use phasegraph_core::{CoreError, PhaseGraph, StepResult};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{OutputFormat, RunnerConfig};

/// Errors reading a document from disk.
#[derive(Debug)]
pub enum DocumentError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentError::IoError(path, e) => {
                write!(f, "failed to read document '{}': {}", path.display(), e)
            }
            DocumentError::ParseError(path, e) => {
                write!(f, "failed to parse document '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// Reads a graph document. Files ending in `.yaml` or `.yml` are parsed as
/// YAML, everything else as JSON.
pub fn read_document(path: &Path) -> Result<serde_json::Value, DocumentError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DocumentError::IoError(path.to_path_buf(), e))?;

    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| DocumentError::ParseError(path.to_path_buf(), e))
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub steps: usize,
    pub phase_changes: usize,
    pub state_changes: usize,
}

#[derive(Serialize)]
struct TranscriptLine<'a> {
    step: usize,
    #[serde(flatten)]
    result: &'a StepResult,
}

/// Formats one transcript line.
pub fn format_step(index: usize, result: &StepResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let line = TranscriptLine {
                step: index,
                result,
            };
            serde_json::to_string(&line).unwrap_or_default()
        }
        OutputFormat::Text => {
            let mut line = format!(
                "[{}] phase={} state={}",
                index,
                result.phase_id.cyan(),
                result.state_id.as_deref().unwrap_or("-").green()
            );
            if result.phase_changed {
                line.push_str(&format!(" {}", "(phase change)".yellow()));
            }
            if result.state_changed {
                line.push_str(&format!(" {}", "(state change)".blue()));
            }
            line
        }
    }
}

/// Steps `engine` up to `config.max_steps` times, writing a transcript to
/// `out`. Stops early when there is nothing to step, or at the first idle
/// step if `config.stop_on_idle` is set.
pub fn run<W: Write>(
    engine: &mut PhaseGraph,
    config: &RunnerConfig,
    out: &mut W,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    if let Some(phase) = &config.initial_phase {
        if !engine.set_initial_phase(phase) {
            return Err(CoreError::UnknownPhase { id: phase.clone() }.into());
        }
    }

    if config.format == OutputFormat::Text {
        writeln!(
            out,
            "start phase={} state={}",
            engine.current_phase_id().unwrap_or("-"),
            engine.current_state_id().unwrap_or("-")
        )?;
    }

    let mut summary = RunSummary {
        steps: 0,
        phase_changes: 0,
        state_changes: 0,
    };

    for i in 0..config.max_steps {
        let Some(result) = engine.step()? else {
            tracing::info!("nothing to step after {} steps", i);
            break;
        };

        summary.steps += 1;
        summary.phase_changes += usize::from(result.phase_changed);
        summary.state_changes += usize::from(result.state_changed);
        writeln!(out, "{}", format_step(i, &result, config.format))?;

        if config.stop_on_idle && !result.phase_changed && !result.state_changed {
            tracing::info!("idle at step {}, stopping", i);
            break;
        }
    }

    Ok(summary)
}

/// Describes a loaded engine: phase, node and edge counts.
pub fn describe(engine: &PhaseGraph) -> String {
    let nodes: usize = engine.phases().map(|p| p.graph().node_count()).sum();
    let edges: usize = engine.phases().map(|p| p.graph().edge_count()).sum();
    format!(
        "{} phases, {} nodes, {} edges, {} phase edges",
        engine.phase_count(),
        nodes,
        edges,
        engine.phase_edge_count()
    )
}
