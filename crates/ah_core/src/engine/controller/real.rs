use tracing::{debug, info, warn};

use super::serial::SerialCodec;
use super::{next_target, Controller, ControllerKind, MalletState};
use crate::engine::config::MotionLimits;
use crate::engine::physics_constants::mechanical;
use crate::engine::steering::{check_step_contract, limited_step};
use crate::engine::trajectory::Trajectory;
use crate::engine::types::Vec2;
use crate::error::ActuatorError;

/// Byte-level link to the mallet firmware.
///
/// `poll_position` is non-blocking: `Ok(None)` means no report arrived
/// since the last poll.
pub trait ActuatorChannel: Send {
    fn open(&mut self) -> Result<(), ActuatorError>;
    fn send(&mut self, line: &str) -> Result<(), ActuatorError>;
    fn poll_position(&mut self) -> Result<Option<String>, ActuatorError>;
    fn close(&mut self);
}

impl<A: ActuatorChannel + ?Sized> ActuatorChannel for Box<A> {
    fn open(&mut self) -> Result<(), ActuatorError> {
        (**self).open()
    }

    fn send(&mut self, line: &str) -> Result<(), ActuatorError> {
        (**self).send(line)
    }

    fn poll_position(&mut self) -> Result<Option<String>, ActuatorError> {
        (**self).poll_position()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Drives the physical mallet.
///
/// Each tick sends the limited step toward the next waypoint. When the
/// firmware reports a position it becomes the new state (still through the
/// limiter); without a report the commanded position is assumed.
pub struct RealRobotController<A: ActuatorChannel> {
    channel: A,
    codec: SerialCodec,
    limits: MotionLimits,
    state: MalletState,
    last_sent: Option<Vec2>,
    initialized: bool,
}

impl<A: ActuatorChannel> RealRobotController<A> {
    pub fn new(channel: A, codec: SerialCodec, limits: MotionLimits) -> Self {
        Self {
            channel,
            codec,
            limits,
            state: MalletState::at_rest(Vec2::zeros()),
            last_sent: None,
            initialized: false,
        }
    }

    pub fn channel(&self) -> &A {
        &self.channel
    }

    fn needs_send(&self, commanded: Vec2) -> bool {
        self.last_sent
            .map_or(true, |sent| (sent - commanded).norm() >= mechanical::POSITION_RESOLUTION_M)
    }

    fn read_report(&mut self) -> Result<Option<Vec2>, ActuatorError> {
        let Some(line) = self.channel.poll_position()? else {
            return Ok(None);
        };
        match self.codec.decode_report(&line) {
            Ok(position) => Ok(Some(position)),
            Err(err) => {
                warn!(error = %err, "Discarding malformed position report");
                Ok(None)
            }
        }
    }
}

impl<A: ActuatorChannel> Controller for RealRobotController<A> {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Real
    }

    fn initialize(&mut self, start: MalletState) -> Result<(), ActuatorError> {
        self.channel.open()?;
        self.state = start;
        self.last_sent = None;
        self.initialized = true;
        info!(x = start.position.x, y = start.position.y, "Actuator channel opened");
        Ok(())
    }

    fn apply(&mut self, trajectory: &Trajectory, dt: f32) -> Result<MalletState, ActuatorError> {
        if !self.initialized {
            return Err(ActuatorError::NotInitialized);
        }
        let prev = self.state;
        let commanded = limited_step(&prev, next_target(trajectory), &self.limits, dt);

        if self.needs_send(commanded.position) {
            self.channel.send(&self.codec.encode_command(commanded.position))?;
            self.last_sent = Some(commanded.position);
        }

        let next = match self.read_report()? {
            Some(reported) => limited_step(&prev, reported, &self.limits, dt),
            None => {
                debug!("No position report, assuming commanded position");
                commanded
            }
        };
        check_step_contract(&prev, &next, &self.limits, dt);
        self.state = next;
        Ok(next)
    }

    fn report_state(&self) -> MalletState {
        self.state
    }

    fn shutdown(&mut self) {
        if self.initialized {
            self.channel.close();
            self.initialized = false;
            info!("Actuator channel closed");
        }
    }
}
