//! Read-only per-tick frames for render and logging consumers.

use std::io::Write;

use serde::Serialize;
use tracing::warn;

use super::geometry::Segment;
use super::path_planner::PlanKind;
use super::strategy::{Intent, Posture};
use super::trajectory::Trajectory;
use super::world_model::WorldSnapshot;

/// Everything a display needs about one tick. Borrowed from the loop, so
/// consumers cannot mutate core state.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryFrame<'a> {
    pub tick: u64,
    pub timestamp_us: u64,
    pub posture: Posture,
    pub strategy: &'static str,
    pub intent: Intent,
    pub plan_kind: PlanKind,
    pub trajectory: &'a Trajectory,
    pub guard_lines: &'a [Segment],
    pub world: &'a WorldSnapshot,
    pub fault: Option<String>,
    pub overrun: bool,
}

pub trait TelemetrySink: Send {
    fn record(&mut self, frame: &TelemetryFrame<'_>);

    fn flush(&mut self) {}
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&mut self, _frame: &TelemetryFrame<'_>) {}
}

/// One JSON object per line.
///
/// Write failures are logged once and counted; they never stop the loop.
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
    failures: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, failures: 0 }
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_frame(&mut self, frame: &TelemetryFrame<'_>) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write + Send> TelemetrySink for JsonLinesSink<W> {
    fn record(&mut self, frame: &TelemetryFrame<'_>) {
        if let Err(err) = self.write_frame(frame) {
            if self.failures == 0 {
                warn!(tick = frame.tick, error = %err, "Telemetry write failed");
            }
            self.failures += 1;
        }
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            warn!(error = %err, "Telemetry flush failed");
        }
    }
}
