//! G-Code decoder and modal state tracking
//!
//! Each line is split into words first and then applied to the modal state
//! as a single transition, so the order of words on a line never matters and
//! a line with a malformed word leaves the state untouched.

use laserkit_core::{GcodeError, Point};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{Command, CommandKind};

/// Maximum laser power in percent
pub const MAX_POWER: f64 = 100.0;

/// Modal motion mode (G0 / G1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionMode {
    /// G0
    #[default]
    Rapid,
    /// G1
    Linear,
}

impl MotionMode {
    fn kind(self) -> CommandKind {
        match self {
            MotionMode::Rapid => CommandKind::RapidMove,
            MotionMode::Linear => CommandKind::LinearMove,
        }
    }
}

/// Modal state carried from one line to the next
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecoderState {
    /// Last G0/G1 seen; used by lines that only carry X/Y
    pub motion_mode: MotionMode,
    /// Target of the last decoded move
    pub position: Point,
    /// Sticky F value (mm/min)
    pub feed_rate: Option<f64>,
    /// Sticky S value, already clamped to 0-100
    pub power: f64,
    /// Whether M3 is active
    pub laser_enabled: bool,
}

impl DecoderState {
    /// Power applied to moves: the modal S value while the laser is on
    pub fn effective_power(&self) -> f64 {
        if self.laser_enabled {
            self.power
        } else {
            0.0
        }
    }
}

/// Outcome of decoding one line
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A command to execute or transmit
    Command(Command),
    /// Blank line, comment, or a line that failed to decode
    Skip,
}

/// Result of decoding a whole program
#[derive(Debug, Clone, Default)]
pub struct DecodedProgram {
    /// Commands in program order
    pub commands: Vec<Command>,
    /// Blank/comment lines skipped
    pub skipped: usize,
    /// Lines dropped because a word could not be parsed
    pub rejected: usize,
}

/// A single word of a G-Code line
#[derive(Debug, Clone, Copy, PartialEq)]
enum Word {
    G(u32),
    M(u32),
    X(f64),
    Y(f64),
    F(f64),
    S(f64),
}

/// Stateful G-Code decoder
#[derive(Debug, Clone, Default)]
pub struct GcodeDecoder {
    state: DecoderState,
}

impl GcodeDecoder {
    /// Create a decoder with default modal state (G0, laser off, origin)
    pub fn new() -> Self {
        Self::default()
    }

    /// Current modal state
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Replace the modal state, e.g. to resume from a known position
    pub fn set_state(&mut self, state: DecoderState) {
        self.state = state;
    }

    /// Reset to power-on defaults
    pub fn reset(&mut self) {
        self.state = DecoderState::default();
    }

    /// Decode one line, skipping (with a warning) anything malformed
    pub fn decode(&mut self, line: &str) -> Decoded {
        match self.try_decode(line) {
            Ok(Some(command)) => Decoded::Command(command),
            Ok(None) => Decoded::Skip,
            Err(e) => {
                tracing::warn!("Skipping undecodable G-Code line: {}", e);
                Decoded::Skip
            }
        }
    }

    /// Decode one line, returning the error for malformed words
    ///
    /// `Ok(None)` is returned for blank and comment lines. On error the modal
    /// state is left as it was.
    pub fn try_decode(&mut self, line: &str) -> Result<Option<Command>, GcodeError> {
        let cleaned = strip_comments(line);
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Ok(None);
        }

        let words = cleaned
            .split_whitespace()
            .filter_map(|token| parse_word(cleaned, token).transpose())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(self.apply(cleaned, &words)))
    }

    /// Decode every line of a program
    pub fn decode_program(&mut self, program: &str) -> DecodedProgram {
        let mut result = DecodedProgram::default();
        for line in program.lines() {
            match self.try_decode(line) {
                Ok(Some(command)) => result.commands.push(command),
                Ok(None) => result.skipped += 1,
                Err(e) => {
                    tracing::warn!("Skipping undecodable G-Code line: {}", e);
                    result.rejected += 1;
                }
            }
        }
        result
    }

    /// Apply all words of one line as a single state transition
    fn apply(&mut self, source: &str, words: &[Word]) -> Command {
        let mut next = self.state;

        let mut motion = None;
        let mut x = None;
        let mut y = None;
        let (mut laser_on, mut laser_off, mut program_end) = (false, false, false);

        for word in words {
            match *word {
                Word::G(0) => motion = Some(MotionMode::Rapid),
                Word::G(1) => motion = Some(MotionMode::Linear),
                Word::M(3) => laser_on = true,
                Word::M(5) => laser_off = true,
                Word::M(2) => program_end = true,
                Word::X(v) => x = Some(v),
                Word::Y(v) => y = Some(v),
                Word::F(v) => next.feed_rate = Some(v),
                Word::S(v) => next.power = v.clamp(0.0, MAX_POWER),
                Word::G(_) | Word::M(_) => {}
            }
        }

        // Off wins over on so a line carrying both leaves the laser dark.
        if laser_on {
            next.laser_enabled = true;
        }
        if laser_off || program_end {
            next.laser_enabled = false;
        }

        if let Some(mode) = motion {
            next.motion_mode = mode;
        }

        let is_move = motion.is_some() || x.is_some() || y.is_some();
        let command = if is_move {
            // An explicit G0 homes any axis it does not name.
            let base = if motion == Some(MotionMode::Rapid) {
                Point::ORIGIN
            } else {
                self.state.position
            };
            let target = Point::new(x.unwrap_or(base.x), y.unwrap_or(base.y));
            next.position = target;

            let kind = next.motion_mode.kind();
            let power = match kind {
                CommandKind::RapidMove => 0.0,
                _ => next.effective_power(),
            };
            Command::new(kind, Some(target), next.feed_rate, Some(power), source)
        } else {
            let kind = if program_end {
                CommandKind::ProgramEnd
            } else if laser_off {
                CommandKind::LaserOff
            } else if laser_on {
                CommandKind::LaserOn
            } else {
                CommandKind::Other
            };
            Command::new(
                kind,
                None,
                next.feed_rate,
                Some(next.effective_power()),
                source,
            )
        };

        self.state = next;
        command
    }
}

/// Remove `;` and `(` comments from a G-Code line
fn strip_comments(line: &str) -> std::borrow::Cow<'_, str> {
    static COMMENT_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    let regex =
        COMMENT_REGEX.get_or_init(|| Regex::new(r"[;(].*").expect("invalid regex pattern"));
    regex.replace(line, "")
}

/// Parse one whitespace-separated token
///
/// Returns `Ok(None)` for tokens this decoder does not consume.
fn parse_word(line: &str, token: &str) -> Result<Option<Word>, GcodeError> {
    let mut chars = token.chars();
    let letter = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return Ok(None),
    };
    let value = chars.as_str();

    let invalid = |reason: &str| GcodeError::InvalidParameter {
        line: line.to_string(),
        param: token.to_string(),
        reason: reason.to_string(),
    };

    let number = || -> Result<f64, GcodeError> {
        let v = value
            .parse::<f64>()
            .map_err(|_| invalid("not a number"))?;
        if v.is_finite() {
            Ok(v)
        } else {
            Err(invalid("not finite"))
        }
    };

    let word = match letter {
        'G' | 'M' => match value.parse::<u32>() {
            Ok(code) if letter == 'G' => Some(Word::G(code)),
            Ok(code) => Some(Word::M(code)),
            // G91.1, G38.2 and friends are outside the consumed subset.
            Err(_) => None,
        },
        'X' => Some(Word::X(number()?)),
        'Y' => Some(Word::Y(number()?)),
        'F' => {
            let feed = number()?;
            if feed < 0.0 {
                return Err(invalid("feed rate cannot be negative"));
            }
            Some(Word::F(feed))
        }
        'S' => Some(Word::S(number()?)),
        _ => None,
    };
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_stripping() {
        assert_eq!(strip_comments("G1 X1 ; engrave"), "G1 X1 ");
        assert_eq!(strip_comments("(header)"), "");
        assert_eq!(strip_comments("M3"), "M3");
    }

    #[test]
    fn test_word_parsing() {
        assert_eq!(parse_word("", "g01").unwrap(), Some(Word::G(1)));
        assert_eq!(parse_word("", "X-2.5").unwrap(), Some(Word::X(-2.5)));
        assert_eq!(parse_word("", "N10").unwrap(), None);
        assert_eq!(parse_word("", "G91.1").unwrap(), None);
        assert!(parse_word("", "Y1.2.3").is_err());
        assert!(parse_word("", "Finf").is_err());
        assert!(parse_word("", "F-10").is_err());
    }
}
