// ABOUTME: Blue-green color tags baked into instance names and labels.
// ABOUTME: Computes the color a swap moves an instance to.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown color '{0}' (expected blue or green)")]
pub struct ParseColorError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Blue,
    Green,
}

impl Color {
    /// Color a blue-green swap launches into, given the color currently live.
    ///
    /// Blue moves to green; green or an unknown color moves to blue.
    pub fn swap_target(current: Option<Color>) -> Color {
        match current {
            Some(Color::Blue) => Color::Green,
            _ => Color::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(Color::Blue),
            "green" => Ok(Color::Green),
            other => Err(ParseColorError(other.to_string())),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
