//! Decoded G-Code command types

use laserkit_core::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a decoded line asks the machine to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// G0 rapid positioning, laser dark
    RapidMove,
    /// G1 linear interpolation at the modal feed rate
    LinearMove,
    /// M3, enable modal power
    LaserOn,
    /// M5, force power to zero until the next M3
    LaserOff,
    /// M2, end of program
    ProgramEnd,
    /// Anything else (modal-only lines such as `F1200` or `S40`)
    Other,
}

impl CommandKind {
    /// Whether this kind produces motion
    pub fn is_motion(&self) -> bool {
        matches!(self, Self::RapidMove | Self::LinearMove)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RapidMove => write!(f, "G0"),
            Self::LinearMove => write!(f, "G1"),
            Self::LaserOn => write!(f, "M3"),
            Self::LaserOff => write!(f, "M5"),
            Self::ProgramEnd => write!(f, "M2"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// One decoded instruction
///
/// Feed and power hold the effective modal values at the time the line was
/// decoded, so a command can be executed without the decoder that produced it.
/// Fields are private: a command never changes once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    kind: CommandKind,
    target: Option<Point>,
    feed: Option<f64>,
    power: Option<f64>,
    source: String,
}

impl Command {
    pub(crate) fn new(
        kind: CommandKind,
        target: Option<Point>,
        feed: Option<f64>,
        power: Option<f64>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            feed,
            power,
            source: source.into(),
        }
    }

    /// Command kind
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Move target in mm, present for motion commands only
    pub fn target(&self) -> Option<Point> {
        self.target
    }

    /// Modal feed rate in mm/min, if one has been set
    pub fn feed(&self) -> Option<f64> {
        self.feed
    }

    /// Effective laser power (0-100)
    pub fn power(&self) -> Option<f64> {
        self.power
    }

    /// The line this command was decoded from, comments removed
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this command produces motion
    pub fn is_motion(&self) -> bool {
        self.kind.is_motion()
    }

    /// Re-serialize into a canonical G-Code line for transmission
    pub fn to_gcode(&self) -> String {
        let mut words = match self.kind {
            CommandKind::Other => Vec::new(),
            kind => vec![kind.to_string()],
        };
        if let Some(target) = self.target {
            words.push(format!("X{}", format_number(target.x)));
            words.push(format!("Y{}", format_number(target.y)));
        }
        if self.kind == CommandKind::LinearMove {
            if let Some(feed) = self.feed {
                words.push(format!("F{}", format_number(feed)));
            }
            if let Some(power) = self.power {
                words.push(format!("S{}", format_number(power)));
            }
        }
        if words.is_empty() {
            return self.source.clone();
        }
        words.join(" ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_gcode())
    }
}

/// Format a coordinate without trailing zeros (`10`, `2.5`, `0.125`)
fn format_number(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_move_serialization() {
        let cmd = Command::new(
            CommandKind::LinearMove,
            Some(Point::new(10.0, 2.5)),
            Some(1200.0),
            Some(40.0),
            "G1 X10 Y2.5",
        );
        assert_eq!(cmd.to_gcode(), "G1 X10 Y2.5 F1200 S40");
    }

    #[test]
    fn test_modal_only_line_keeps_source() {
        let cmd = Command::new(CommandKind::Other, None, Some(800.0), Some(0.0), "F800");
        assert_eq!(cmd.to_gcode(), "F800");
        assert!(!cmd.is_motion());
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        assert_eq!(format_number(-0.00001), "0");
        assert_eq!(format_number(-3.25), "-3.25");
    }
}
