//! Local simulation stepper
//!
//! Expands decoded commands into time-sampled steps and hands them out one per
//! animation tick. The host polls [`Simulator::tick`] from its frame callback;
//! nothing here blocks or fails.

use laserkit_core::units::mm_per_min_to_mm_per_sec;
use laserkit_core::{LaserState, PendingQueue, Point};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::gcode::{Command, CommandKind, Decoded, GcodeDecoder};
use crate::motion::MotionProfile;

/// Default animation tick (60 frames per second)
pub const DEFAULT_TICK_SECONDS: f64 = 1.0 / 60.0;
/// Default speed for G0 moves, mm/min
pub const DEFAULT_RAPID_FEED: f64 = 6000.0;
/// Default speed for moves before any F word, mm/min
pub const DEFAULT_FEED: f64 = 1000.0;

/// How the simulated acceleration is chosen for each move
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum AccelerationMode {
    /// Acceleration numerically equal to the target speed (1 s ramps)
    #[default]
    MatchSpeed,
    /// Fixed acceleration in mm/s²
    Fixed(f64),
}

impl AccelerationMode {
    /// Acceleration to use for a move at `speed` mm/s
    pub fn acceleration_for(&self, speed: f64) -> f64 {
        match self {
            AccelerationMode::MatchSpeed => speed,
            AccelerationMode::Fixed(a) => *a,
        }
    }
}

/// Where the steps of a newly executed move go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplicePolicy {
    /// Plan from the end of the last queued move and run after it
    #[default]
    Sequential,
    /// Newest motion preempts remaining ticks of the previous command:
    /// plan from the current tool position and run before pending steps
    Preempt,
}

/// Simulator tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Seconds of motion per tick
    pub tick: f64,
    /// Acceleration policy
    pub acceleration: AccelerationMode,
    /// G0 speed in mm/min
    pub rapid_feed: f64,
    /// G1 speed before any F word, mm/min
    pub default_feed: f64,
    /// Queue policy for new moves
    pub splice_policy: SplicePolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK_SECONDS,
            acceleration: AccelerationMode::default(),
            rapid_feed: DEFAULT_RAPID_FEED,
            default_feed: DEFAULT_FEED,
            splice_policy: SplicePolicy::default(),
        }
    }
}

/// One animation frame worth of simulated motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationStep {
    /// Tool position after this step
    pub position: Point,
    /// Laser output during this step
    pub laser: LaserState,
    /// Seconds since the start of the move this step belongs to
    pub elapsed: f64,
    /// The move this step belongs to
    pub kind: CommandKind,
}

/// A stretch of the work surface passed over with the laser emitting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurnSegment {
    pub from: Point,
    pub to: Point,
    pub power: f64,
}

/// Preview stepper driven by the host's animation tick
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulatorConfig,
    decoder: GcodeDecoder,
    steps: PendingQueue<SimulationStep>,
    position: Point,
    laser: LaserState,
    planned_end: Point,
    planned_time: f64,
    trace: Vec<BurnSegment>,
}

impl Simulator {
    /// Create an idle simulator at the origin
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            decoder: GcodeDecoder::new(),
            steps: PendingQueue::new(),
            position: Point::ORIGIN,
            laser: LaserState::default(),
            planned_end: Point::ORIGIN,
            planned_time: 0.0,
            trace: Vec::new(),
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Current tool position
    pub fn position(&self) -> Point {
        self.position
    }

    /// Current laser output
    pub fn laser(&self) -> LaserState {
        self.laser
    }

    /// Whether no steps are pending
    pub fn is_idle(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of ticks left before idle
    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }

    /// Sum of the planned durations of every move executed since the last reset
    pub fn estimated_duration(&self) -> f64 {
        self.planned_time
    }

    /// Segments traversed while the laser was emitting
    pub fn burn_trace(&self) -> &[BurnSegment] {
        &self.trace
    }

    /// Drop all pending steps and return to the origin with the laser off
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.steps.clear();
        self.position = Point::ORIGIN;
        self.laser = LaserState::default();
        self.planned_end = Point::ORIGIN;
        self.planned_time = 0.0;
        self.trace.clear();
    }

    /// Execute one decoded command
    ///
    /// Motion commands are planned and their samples queued. `M3`, `M5` and
    /// `M2` switch the laser: at once when idle, otherwise through a
    /// stationary step so the switch lands in order. Anything else only
    /// affects modal state, which decoded commands already carry.
    pub fn execute(&mut self, command: &Command) {
        let Some(target) = command.target().filter(|_| command.is_motion()) else {
            self.switch_laser(command);
            return;
        };

        let feed = match command.kind() {
            CommandKind::RapidMove => self.config.rapid_feed,
            _ => command
                .feed()
                .filter(|f| *f > 0.0)
                .unwrap_or(self.config.default_feed),
        };
        let speed = mm_per_min_to_mm_per_sec(feed);
        let acceleration = self.config.acceleration.acceleration_for(speed);

        let preempt = self.config.splice_policy == SplicePolicy::Preempt;
        let start = if preempt {
            self.position
        } else {
            self.planned_end
        };

        let laser = LaserState {
            enabled: command.power().is_some_and(|p| p > 0.0),
            power: command.power().unwrap_or(0.0),
        };
        let kind = command.kind();

        let tick = self.config.tick;
        let steps: Vec<SimulationStep> =
            match MotionProfile::new(start, target, speed, acceleration)
                .and_then(|profile| Ok((profile, profile.samples(tick)?)))
            {
                Ok((profile, samples)) => {
                    self.planned_time += profile.total_time();
                    samples
                        .map(|sample| SimulationStep {
                            position: sample.position,
                            laser,
                            elapsed: sample.elapsed,
                            kind,
                        })
                        .collect()
                }
                Err(e) => {
                    warn!("Cannot plan {}: {}; jumping to target", command, e);
                    vec![SimulationStep {
                        position: target,
                        laser,
                        elapsed: 0.0,
                        kind,
                    }]
                }
            };

        debug!(
            "Planned {} from {} to {} in {} steps",
            kind,
            start,
            target,
            steps.len()
        );

        if preempt {
            if self.steps.is_empty() {
                self.planned_end = target;
            }
            self.steps.splice_front(steps);
        } else {
            self.planned_end = target;
            self.steps.extend(steps);
        }
    }

    fn switch_laser(&mut self, command: &Command) {
        let enabled = match command.kind() {
            CommandKind::LaserOn => true,
            CommandKind::LaserOff | CommandKind::ProgramEnd => false,
            _ => return,
        };
        let laser = LaserState {
            enabled,
            power: command.power().unwrap_or(0.0),
        };

        if self.steps.is_empty() {
            self.laser = laser;
            return;
        }

        let kind = command.kind();
        if self.config.splice_policy == SplicePolicy::Preempt {
            self.steps.splice_front(vec![SimulationStep {
                position: self.position,
                laser,
                elapsed: 0.0,
                kind,
            }]);
        } else {
            self.steps.append(SimulationStep {
                position: self.planned_end,
                laser,
                elapsed: 0.0,
                kind,
            });
        }
    }

    /// Decode and execute one line of G-code
    pub fn execute_line(&mut self, line: &str) {
        if let Decoded::Command(command) = self.decoder.decode(line) {
            self.execute(&command);
        }
    }

    /// Decode and execute a whole program, returning the number of commands run
    pub fn preview(&mut self, program: &str) -> usize {
        let decoded = self.decoder.decode_program(program);
        for command in &decoded.commands {
            self.execute(command);
        }
        debug!(
            "Previewing {} commands, {} pending steps",
            decoded.commands.len(),
            self.steps.len()
        );
        decoded.commands.len()
    }

    /// Advance one step; `None` once idle
    pub fn tick(&mut self) -> Option<SimulationStep> {
        let step = self.steps.pop_front()?;

        let power = step.laser.effective_power();
        if power > 0.0 && step.position != self.position {
            self.trace.push(BurnSegment {
                from: self.position,
                to: step.position,
                power,
            });
        }

        self.position = step.position;
        self.laser = step.laser;
        Some(step)
    }

    /// Run every pending step, returning the last one
    pub fn finish(&mut self) -> Option<SimulationStep> {
        let mut last = None;
        while let Some(step) = self.tick() {
            last = Some(step);
        }
        last
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceleration_mode() {
        assert_eq!(AccelerationMode::MatchSpeed.acceleration_for(5.0), 5.0);
        assert_eq!(AccelerationMode::Fixed(200.0).acceleration_for(5.0), 200.0);
    }

    #[test]
    fn test_idle_tick_returns_none() {
        let mut sim = Simulator::default();
        assert!(sim.is_idle());
        assert!(sim.tick().is_none());
        assert_eq!(sim.position(), Point::ORIGIN);
    }
}
