//! Progress and log events streamed out of a running reduction.
//!
//! Events are observational only: sending never blocks, and a dropped
//! receiver is ignored.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::Sender;

/// Pipeline stage a progress event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
  Projecting,
  Partitioning,
  Building,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Projecting => "projecting",
      Stage::Partitioning => "partitioning",
      Stage::Building => "building",
    };
    f.pad(name)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogLevel {
  Info,
  Warn,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReductionEvent {
  /// `percent` in `[0, 100]` within `stage`.
  Progress { stage: Stage, percent: f32 },
  Log { level: LogLevel, message: String },
}

/// Non-blocking event sender; a sink without a channel discards everything.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
  tx: Option<Sender<ReductionEvent>>,
}

impl EventSink {
  pub fn new(tx: Sender<ReductionEvent>) -> Self {
    Self { tx: Some(tx) }
  }

  /// Sink that drops every event.
  pub fn discard() -> Self {
    Self::default()
  }

  pub fn send(&self, event: ReductionEvent) {
    if let Some(tx) = &self.tx {
      // A closed receiver only means nobody is watching.
      let _ = tx.try_send(event);
    }
  }

  pub fn progress(&self, stage: Stage, fraction: f32) {
    self.send(ReductionEvent::Progress {
      stage,
      percent: (fraction * 100.0).clamp(0.0, 100.0),
    });
  }

  pub fn info(&self, message: impl Into<String>) {
    self.send(ReductionEvent::Log {
      level: LogLevel::Info,
      message: message.into(),
    });
  }

  pub fn warn(&self, message: impl Into<String>) {
    self.send(ReductionEvent::Log {
      level: LogLevel::Warn,
      message: message.into(),
    });
  }
}

/// Final report of a successful reduction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReductionSummary {
  pub frames_total: usize,
  pub frames_projected: usize,
  pub frames_skipped: usize,
  pub samples: usize,
  pub elapsed: Duration,
  pub levels: usize,
  pub nodes: usize,
  pub bricks: usize,
  /// Index, brick and pool bytes.
  pub output_bytes: usize,
}

impl ReductionSummary {
  pub fn frames_per_second(&self) -> f64 {
    rate(self.frames_projected, self.elapsed)
  }

  pub fn samples_per_second(&self) -> f64 {
    rate(self.samples, self.elapsed)
  }
}

fn rate(count: usize, elapsed: Duration) -> f64 {
  let secs = elapsed.as_secs_f64();
  if secs > 0.0 {
    count as f64 / secs
  } else {
    0.0
  }
}

impl fmt::Display for ReductionSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(
      f,
      "frames:     {} projected, {} skipped, {} total",
      self.frames_projected, self.frames_skipped, self.frames_total
    )?;
    writeln!(f, "samples:    {}", self.samples)?;
    writeln!(
      f,
      "elapsed:    {:.2}s ({:.1} frames/s, {:.0} samples/s)",
      self.elapsed.as_secs_f64(),
      self.frames_per_second(),
      self.samples_per_second()
    )?;
    writeln!(
      f,
      "octree:     {} levels, {} nodes, {} bricks",
      self.levels, self.nodes, self.bricks
    )?;
    write!(f, "output:     {:.2} MiB", self.output_bytes as f64 / (1024.0 * 1024.0))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sink_without_receiver_does_not_block() {
    let (tx, rx) = crossbeam_channel::unbounded();
    drop(rx);
    let sink = EventSink::new(tx);
    sink.info("nobody listens");
    EventSink::discard().warn("dropped");
  }

  #[test]
  fn test_progress_is_clamped_percent() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = EventSink::new(tx);
    sink.progress(Stage::Building, 0.25);
    sink.progress(Stage::Building, 1.5);
    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(
      events,
      vec![
        ReductionEvent::Progress {
          stage: Stage::Building,
          percent: 25.0
        },
        ReductionEvent::Progress {
          stage: Stage::Building,
          percent: 100.0
        },
      ]
    );
  }

  #[test]
  fn test_summary_report() {
    let summary = ReductionSummary {
      frames_total: 10,
      frames_projected: 8,
      frames_skipped: 2,
      samples: 1000,
      elapsed: Duration::from_secs(2),
      levels: 4,
      nodes: 73,
      bricks: 20,
      output_bytes: 2 * 1024 * 1024,
    };
    assert_eq!(summary.frames_per_second(), 4.0);
    assert_eq!(summary.samples_per_second(), 500.0);
    let text = summary.to_string();
    assert!(text.contains("8 projected, 2 skipped, 10 total"));
    assert!(text.contains("4 levels, 73 nodes, 20 bricks"));
    assert!(text.contains("2.00 MiB"));
    assert_eq!(ReductionSummary::default().frames_per_second(), 0.0);
  }
}
