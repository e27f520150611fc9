//! Fixed-period control loop.
//!
//! One tick: snapshot the world, decide, plan, actuate, feed the mallet
//! state back into the world model. Ticks that take longer than the period
//! are counted as deadline misses; missed ticks are never replayed, the next
//! tick simply uses whatever the world model holds by then.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::config::EngineConfig;
use super::controller::{Controller, MalletState};
use super::geometry::Segment;
use super::path_planner::{PathPlanner, PlanKind};
use super::strategy::{Intent, Posture, StrategyEngine, TickInput};
use super::telemetry::{TelemetryFrame, TelemetrySink};
use super::timestep::us_to_secs;
use super::trajectory::Trajectory;
use super::types::BodyId;
use super::world_model::{WorldModel, WorldSnapshot};
use crate::error::{ActuatorError, CoreError, Result};

/// Cooperative cancellation for [`ControlLoop::run`]. The loop finishes the
/// tick in progress, then releases the actuator.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub ticks: u64,
    pub deadline_misses: u64,
    pub actuator_faults: u64,
    pub posture_switches: u64,
    pub reinitializations: u64,
    pub clamped_targets: u64,
    /// Ticks that ran with at least one stale body
    pub stale_ticks: u64,
}

/// Outcome of one tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub timestamp_us: u64,
    pub posture: Posture,
    pub strategy: &'static str,
    pub intent: Intent,
    pub plan_kind: PlanKind,
    pub trajectory: Trajectory,
    /// State reported by the controller, or the previous one on a fault
    pub mallet: MalletState,
    pub fault: Option<ActuatorError>,
    pub overrun: bool,
    pub elapsed: Duration,
}

pub struct ControlLoop {
    config: EngineConfig,
    world: Arc<WorldModel>,
    strategy: StrategyEngine,
    planner: PathPlanner,
    controller: Box<dyn Controller>,
    telemetry: Option<Box<dyn TelemetrySink>>,
    stats: LoopStats,
    consecutive_faults: u32,
    /// Per-body staleness seen on the previous tick
    stale_bodies: [bool; 3],
    last_tick_us: Option<u64>,
    initialized: bool,
    released: bool,
}

impl ControlLoop {
    pub fn new(config: EngineConfig, world: Arc<WorldModel>, controller: Box<dyn Controller>) -> Self {
        let strategy = StrategyEngine::from_config(&config);
        let planner = PathPlanner::new(config.limits, config.planner.clone());
        Self {
            config,
            world,
            strategy,
            planner,
            controller,
            telemetry: None,
            stats: LoopStats::default(),
            consecutive_faults: 0,
            stale_bodies: [false; 3],
            last_tick_us: None,
            initialized: false,
            released: false,
        }
    }

    pub fn with_telemetry(mut self, sink: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn world(&self) -> &Arc<WorldModel> {
        &self.world
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn posture(&self) -> Posture {
        self.strategy.posture()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.active().name()
    }

    pub fn mallet_state(&self) -> MalletState {
        self.controller.report_state()
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.config.control.tick_period_us)
    }

    /// Validate the table and bring the controller up at the mallet's last
    /// known position (home if it was never observed).
    pub fn initialize(&mut self, now_us: u64) -> Result<()> {
        self.world.table().validate()?;
        if self.released {
            return Err(CoreError::ActuatorLost("control loop already shut down".into()));
        }

        let start = self.start_state(now_us);
        self.controller
            .initialize(start)
            .map_err(|e| CoreError::ActuatorLost(e.to_string()))?;
        self.world.report_own_mallet(&start, now_us);
        self.initialized = true;
        info!(
            controller = ?self.controller.kind(),
            posture = self.strategy.posture().name(),
            tick_period_us = self.config.control.tick_period_us,
            "Control loop initialized"
        );
        Ok(())
    }

    fn start_state(&self, now_us: u64) -> MalletState {
        let own = *self.world.snapshot(now_us).own_mallet();
        if own.age_us.is_some() {
            MalletState { position: own.body.position, velocity: own.body.velocity }
        } else {
            MalletState::at_rest(self.world.table().home_position(self.config.strategy.home_x_ratio))
        }
    }

    /// Run one decision cycle at session time `now_us`.
    pub fn tick(&mut self, now_us: u64, input: &TickInput) -> Result<TickReport> {
        if self.released {
            return Err(CoreError::ActuatorLost("control loop already shut down".into()));
        }
        if !self.initialized {
            self.initialize(now_us)?;
        }
        let started = Instant::now();
        let tick = self.stats.ticks;

        let snapshot = self.world.snapshot(now_us);
        self.note_staleness(tick, &snapshot);
        let decision = self.strategy.decide(&snapshot, input);
        let plan = self.planner.plan_intent(&snapshot, &decision.intent);

        let dt = self.step_dt(now_us);
        self.last_tick_us = Some(now_us);

        let (mallet, fault) = match self.controller.apply(&plan.trajectory, dt) {
            Ok(state) => {
                self.world.report_own_mallet(&state, now_us);
                self.consecutive_faults = 0;
                (state, None)
            }
            Err(err) if err.is_recoverable() => {
                self.on_recoverable_fault(tick, now_us, &err);
                (self.controller.report_state(), Some(err))
            }
            Err(err) => {
                error!(tick, error = %err, "Actuator channel lost, stopping");
                self.shutdown();
                return Err(CoreError::ActuatorLost(err.to_string()));
            }
        };

        let elapsed = started.elapsed();
        let overrun = elapsed > self.tick_period();
        self.stats.ticks += 1;
        if overrun {
            self.stats.deadline_misses += 1;
            warn!(
                tick,
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.config.control.tick_period_us,
                "Tick deadline missed"
            );
        }
        if decision.switched {
            self.stats.posture_switches += 1;
        }
        if plan.target_clamped {
            self.stats.clamped_targets += 1;
            debug!(
                tick,
                target_x = decision.intent.target.x,
                target_y = decision.intent.target.y,
                "Target outside reachable envelope, clamped"
            );
        }

        if let Some(sink) = self.telemetry.as_mut() {
            let guard_lines: Vec<Segment> = self.strategy.guard_lines();
            sink.record(&TelemetryFrame {
                tick,
                timestamp_us: now_us,
                posture: decision.posture,
                strategy: decision.strategy,
                intent: decision.intent,
                plan_kind: plan.kind,
                trajectory: &plan.trajectory,
                guard_lines: &guard_lines,
                world: &snapshot,
                fault: fault.as_ref().map(|e| e.to_string()),
                overrun,
            });
        }

        Ok(TickReport {
            tick,
            timestamp_us: now_us,
            posture: decision.posture,
            strategy: decision.strategy,
            intent: decision.intent,
            plan_kind: plan.kind,
            trajectory: plan.trajectory,
            mallet,
            fault,
            overrun,
            elapsed,
        })
    }

    /// Warn once when a body goes stale and once when it is tracked again.
    fn note_staleness(&mut self, tick: u64, snapshot: &WorldSnapshot) {
        if snapshot.any_stale() {
            self.stats.stale_ticks += 1;
        }
        for id in BodyId::ALL {
            let view = snapshot.view(id);
            let was_stale = std::mem::replace(&mut self.stale_bodies[id.index()], view.stale);
            match (was_stale, view.stale) {
                (false, true) => warn!(tick, body = id.name(), age_us = ?view.age_us, "Tracking input stale"),
                (true, false) => info!(tick, body = id.name(), "Tracking input recovered"),
                _ => {}
            }
        }
    }

    fn step_dt(&self, now_us: u64) -> f32 {
        let period_us = self.config.control.tick_period_us;
        let delta = self
            .last_tick_us
            .map_or(period_us, |last| now_us.saturating_sub(last))
            .clamp(1, self.world.stale_timeout_us().max(period_us));
        us_to_secs(delta)
    }

    fn on_recoverable_fault(&mut self, tick: u64, now_us: u64, err: &ActuatorError) {
        self.stats.actuator_faults += 1;
        self.consecutive_faults += 1;

        if *err == ActuatorError::NotInitialized {
            let start = self.start_state(now_us);
            match self.controller.initialize(start) {
                Ok(()) => {
                    self.stats.reinitializations += 1;
                    info!(tick, "Controller re-initialized");
                }
                Err(e) => warn!(tick, error = %e, "Controller re-initialization failed"),
            }
            return;
        }

        if self.consecutive_faults >= self.config.control.fault_escalation_ticks {
            error!(
                tick,
                consecutive = self.consecutive_faults,
                error = %err,
                "Actuator keeps failing, holding last actuation"
            );
        } else {
            warn!(tick, error = %err, "Actuator fault, retrying next tick");
        }
    }

    /// Tick at the configured period until `stop` is raised, `max_ticks`
    /// have run, or a fatal error occurs. `prepare` is called at the start of
    /// every tick with the session time and supplies the tick input (and is
    /// where a vision feed would be pumped). The actuator is released on
    /// every exit path.
    pub fn run<F>(&mut self, stop: &StopHandle, max_ticks: Option<u64>, mut prepare: F) -> Result<LoopStats>
    where
        F: FnMut(u64) -> TickInput,
    {
        let period = self.tick_period();
        let base_us = self.last_tick_us.map_or(0, |t| t + self.config.control.tick_period_us);
        let origin = Instant::now();
        let mut next_deadline = origin;
        let mut done = 0u64;

        let outcome = loop {
            if stop.is_stopped() || max_ticks.is_some_and(|max| done >= max) {
                break Ok(());
            }
            let now = Instant::now();
            if now < next_deadline {
                thread::sleep(next_deadline - now);
            }

            let now_us = base_us + origin.elapsed().as_micros() as u64;
            let input = prepare(now_us);
            if let Err(err) = self.tick(now_us, &input) {
                break Err(err);
            }
            done += 1;

            next_deadline = next_deadline_after(next_deadline, period, Instant::now());
        };

        self.shutdown();
        debug!(ticks = done, "Control loop stopped");
        outcome.map(|()| self.stats.clone())
    }

    /// Release the actuator. Idempotent.
    pub fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.controller.shutdown();
        if let Some(sink) = self.telemetry.as_mut() {
            sink.flush();
        }
        self.released = true;
        info!(
            ticks = self.stats.ticks,
            deadline_misses = self.stats.deadline_misses,
            actuator_faults = self.stats.actuator_faults,
            posture_switches = self.stats.posture_switches,
            stale_ticks = self.stats.stale_ticks,
            "Control loop shut down"
        );
    }
}

/// Deadline following `scheduled`. Missed deadlines are dropped rather than
/// replayed, so an overrun never produces a catch-up burst.
fn next_deadline_after(scheduled: Instant, period: Duration, now: Instant) -> Instant {
    (scheduled + period).max(now)
}

impl Drop for ControlLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
