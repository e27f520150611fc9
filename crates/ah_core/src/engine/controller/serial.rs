//! Line protocol spoken with the mallet firmware.
//!
//! Outgoing: absolute step targets `"<x_steps>,<y_steps>\n"`.
//! Incoming: position reports `"P:<x_steps>,<y_steps>"`.

use std::collections::VecDeque;

use tracing::trace;

use super::real::ActuatorChannel;
use crate::engine::physics_constants::mechanical;
use crate::engine::types::Vec2;
use crate::error::ActuatorError;

const POSITION_PREFIX: &str = "P:";
const DELIMITER: char = ',';

/// Accepted commands kept by [`LoopbackChannel`] for inspection
const SENT_HISTORY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SerialCodec {
    pub steps_per_meter_x: f32,
    pub steps_per_meter_y: f32,
}

impl Default for SerialCodec {
    fn default() -> Self {
        Self {
            steps_per_meter_x: mechanical::STEPS_PER_METER_X,
            steps_per_meter_y: mechanical::STEPS_PER_METER_Y,
        }
    }
}

impl SerialCodec {
    pub fn to_steps(&self, position: Vec2) -> (i64, i64) {
        (
            (position.x * self.steps_per_meter_x).round() as i64,
            (position.y * self.steps_per_meter_y).round() as i64,
        )
    }

    pub fn from_steps(&self, x_steps: i64, y_steps: i64) -> Vec2 {
        Vec2::new(x_steps as f32 / self.steps_per_meter_x, y_steps as f32 / self.steps_per_meter_y)
    }

    pub fn encode_command(&self, position: Vec2) -> String {
        let (x, y) = self.to_steps(position);
        format!("{x}{DELIMITER}{y}\n")
    }

    /// Parse a firmware position report into table coordinates.
    pub fn decode_report(&self, line: &str) -> Result<Vec2, ActuatorError> {
        let body = line
            .trim()
            .strip_prefix(POSITION_PREFIX)
            .ok_or_else(|| ActuatorError::Protocol(format!("missing position prefix: {line:?}")))?;
        let (x, y) = parse_pair(body)?;
        Ok(self.from_steps(x, y))
    }

    /// Inverse of `encode_command`, used by loopback firmware.
    pub fn decode_command(&self, line: &str) -> Result<(i64, i64), ActuatorError> {
        parse_pair(line.trim())
    }

    pub fn encode_report(&self, x_steps: i64, y_steps: i64) -> String {
        format!("{POSITION_PREFIX}{x_steps}{DELIMITER}{y_steps}")
    }
}

fn parse_pair(body: &str) -> Result<(i64, i64), ActuatorError> {
    let mut parts = body.split(DELIMITER);
    let (Some(x), Some(y), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ActuatorError::Protocol(format!("expected two fields: {body:?}")));
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<i64>()
            .map_err(|e| ActuatorError::Protocol(format!("bad step count {s:?}: {e}")))
    };
    Ok((parse(x)?, parse(y)?))
}

/// Fault injected into the next send of a [`LoopbackChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackFault {
    Timeout,
    NotReady,
    Garbled,
    Disconnect,
}

/// In-process stand-in for the firmware: echoes the last accepted command
/// back as a position report. Used for dry runs and fault testing.
#[derive(Debug, Clone)]
pub struct LoopbackChannel {
    codec: SerialCodec,
    open: bool,
    disconnected: bool,
    report_positions: bool,
    timeout_ms: u64,
    script: VecDeque<Option<LoopbackFault>>,
    pending_report: Option<String>,
    sent: VecDeque<String>,
}

impl LoopbackChannel {
    pub fn new(codec: SerialCodec) -> Self {
        Self {
            codec,
            open: false,
            disconnected: false,
            report_positions: true,
            timeout_ms: 5,
            script: VecDeque::new(),
            pending_report: None,
            sent: VecDeque::with_capacity(SENT_HISTORY),
        }
    }

    /// Firmware that never reports back; the controller runs open loop.
    pub fn silent(mut self) -> Self {
        self.report_positions = false;
        self
    }

    /// Queue the outcome of upcoming sends. `None` entries succeed.
    pub fn with_script(mut self, script: impl IntoIterator<Item = Option<LoopbackFault>>) -> Self {
        self.script.extend(script);
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The most recent accepted commands, oldest first.
    pub fn sent_lines(&self) -> &VecDeque<String> {
        &self.sent
    }

    fn record(&mut self, line: &str) {
        if self.sent.len() == SENT_HISTORY {
            self.sent.pop_front();
        }
        self.sent.push_back(line.to_string());
    }
}

impl ActuatorChannel for LoopbackChannel {
    fn open(&mut self) -> Result<(), ActuatorError> {
        if self.disconnected {
            return Err(ActuatorError::Disconnected("loopback link dropped".into()));
        }
        self.open = true;
        Ok(())
    }

    fn send(&mut self, line: &str) -> Result<(), ActuatorError> {
        if self.disconnected {
            return Err(ActuatorError::Disconnected("loopback link dropped".into()));
        }
        if !self.open {
            return Err(ActuatorError::NotInitialized);
        }
        match self.script.pop_front().flatten() {
            Some(LoopbackFault::Timeout) => {
                return Err(ActuatorError::Timeout { waited_ms: self.timeout_ms })
            }
            Some(LoopbackFault::NotReady) => return Err(ActuatorError::NotReady),
            Some(LoopbackFault::Disconnect) => {
                self.disconnected = true;
                self.open = false;
                return Err(ActuatorError::Disconnected("loopback link dropped".into()));
            }
            Some(LoopbackFault::Garbled) => {
                self.record(line);
                self.pending_report = Some("#garbled".to_string());
                return Ok(());
            }
            None => {}
        }

        let (x, y) = self.codec.decode_command(line)?;
        trace!(x, y, "Loopback accepted command");
        self.record(line);
        if self.report_positions {
            self.pending_report = Some(self.codec.encode_report(x, y));
        }
        Ok(())
    }

    fn poll_position(&mut self) -> Result<Option<String>, ActuatorError> {
        if self.disconnected {
            return Err(ActuatorError::Disconnected("loopback link dropped".into()));
        }
        Ok(self.pending_report.take())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending_report = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_command() {
        let codec = SerialCodec::default();
        assert_eq!(codec.encode_command(Vec2::new(1.25, 0.5)), "5000,2000\n");
    }

    #[test]
    fn test_decode_report() {
        let codec = SerialCodec::default();
        let p = codec.decode_report("P:4000,2600\r\n").unwrap();
        assert!((p - Vec2::new(1.0, 0.65)).norm() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let codec = SerialCodec::default();
        for line in ["4000,2600", "P:4000", "P:1,2,3", "P:x,2", ""] {
            assert!(
                matches!(codec.decode_report(line), Err(ActuatorError::Protocol(_))),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn test_loopback_echoes_commands() {
        let codec = SerialCodec::default();
        let mut ch = LoopbackChannel::new(codec);
        ch.open().unwrap();
        ch.send(&codec.encode_command(Vec2::new(2.0, 0.4))).unwrap();
        let report = ch.poll_position().unwrap().unwrap();
        assert_eq!(report, "P:8000,1600");
        assert_eq!(ch.poll_position().unwrap(), None);
    }

    #[test]
    fn test_loopback_script() {
        let codec = SerialCodec::default();
        let mut ch = LoopbackChannel::new(codec).with_script([
            Some(LoopbackFault::Timeout),
            None,
            Some(LoopbackFault::Disconnect),
        ]);
        ch.open().unwrap();
        let cmd = codec.encode_command(Vec2::new(2.0, 0.4));
        assert_eq!(ch.send(&cmd), Err(ActuatorError::Timeout { waited_ms: 5 }));
        assert!(ch.send(&cmd).is_ok());
        assert!(matches!(ch.send(&cmd), Err(ActuatorError::Disconnected(_))));
        assert!(matches!(ch.send(&cmd), Err(ActuatorError::Disconnected(_))));
        assert!(!ch.is_open());
    }

    #[test]
    fn test_loopback_history_is_bounded() {
        let codec = SerialCodec::default();
        let mut ch = LoopbackChannel::new(codec);
        ch.open().unwrap();
        for i in 0..1_000 {
            ch.send(&codec.encode_command(Vec2::new(0.001 * i as f32, 0.4))).unwrap();
        }
        assert_eq!(ch.sent_lines().len(), SENT_HISTORY);
        assert_eq!(ch.sent_lines().back().unwrap(), &codec.encode_command(Vec2::new(0.001 * 999.0, 0.4)));
        assert_eq!(ch.sent_lines().front().unwrap(), &codec.encode_command(Vec2::new(0.001 * 936.0, 0.4)));
    }

    #[test]
    fn test_send_before_open() {
        let mut ch = LoopbackChannel::new(SerialCodec::default());
        assert_eq!(ch.send("1,2\n"), Err(ActuatorError::NotInitialized));
    }
}
