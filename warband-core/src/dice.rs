//! Dice rolling for the combat engine.
//!
//! Supports the simple notation the engine needs: `XdY+Z` with a single die
//! kind per expression. Initiative, attacks, and item healing all roll
//! through here so tests can inject a seeded RNG.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("empty dice expression")]
    Empty,
}

/// Standard die kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Die {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl Die {
    pub fn sides(&self) -> u32 {
        match self {
            Die::D4 => 4,
            Die::D6 => 6,
            Die::D8 => 8,
            Die::D10 => 10,
            Die::D12 => 12,
            Die::D20 => 20,
            Die::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<Die> {
        match sides {
            4 => Some(Die::D4),
            6 => Some(Die::D6),
            8 => Some(Die::D8),
            10 => Some(Die::D10),
            12 => Some(Die::D12),
            20 => Some(Die::D20),
            100 => Some(Die::D100),
            _ => None,
        }
    }

    /// Roll this die once.
    pub fn roll<R: Rng>(&self, rng: &mut R) -> u32 {
        rng.gen_range(1..=self.sides())
    }
}

impl fmt::Display for Die {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A dice expression of the form `XdY+Z` (or `XdY-Z`, or a bare `XdY`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpr {
    pub count: u32,
    pub die: Die,
    pub modifier: i32,
}

impl DiceExpr {
    pub fn new(count: u32, die: Die, modifier: i32) -> Self {
        Self {
            count,
            die,
            modifier,
        }
    }

    /// Parse dice notation like `1d20`, `2d6+3`, or `1d8-1`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::Empty);
        }

        let (dice_part, modifier) = match notation.find(|c| c == '+' || c == '-') {
            Some(pos) => {
                let value: i32 = notation[pos + 1..]
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
                let sign = if notation.as_bytes()[pos] == b'+' { 1 } else { -1 };
                (&notation[..pos], sign * value)
            }
            None => (notation.as_str(), 0),
        };

        let d_pos = dice_part
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.clone()))?;
        let count: u32 = if dice_part[..d_pos].is_empty() {
            1
        } else {
            dice_part[..d_pos]
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.clone()))?
        };
        let sides: u32 = dice_part[d_pos + 1..]
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.clone()))?;
        let die = Die::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        Ok(Self {
            count,
            die,
            modifier,
        })
    }

    /// Roll with the thread-local RNG.
    pub fn roll(&self) -> Roll {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG (used by tests for determinism).
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> Roll {
        let rolls: Vec<u32> = (0..self.count).map(|_| self.die.roll(rng)).collect();
        let dice_total: i32 = rolls.iter().map(|r| *r as i32).sum();
        let total = dice_total + self.modifier;

        // Natural 20/1 detection only applies to a single d20.
        let d20 = (self.die == Die::D20 && self.count == 1).then(|| rolls[0]);

        Roll {
            expr: self.clone(),
            rolls,
            total,
            natural_20: d20 == Some(20),
            natural_1: d20 == Some(1),
        }
    }

    /// The lowest total this expression can produce.
    pub fn minimum(&self) -> i32 {
        self.count as i32 + self.modifier
    }

    /// The highest total this expression can produce.
    pub fn maximum(&self) -> i32 {
        (self.count * self.die.sides()) as i32 + self.modifier
    }
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpr::parse(s)
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.die)?;
        match self.modifier.cmp(&0) {
            std::cmp::Ordering::Greater => write!(f, "+{}", self.modifier),
            std::cmp::Ordering::Less => write!(f, "{}", self.modifier),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }
}

/// Outcome of rolling a [`DiceExpr`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roll {
    pub expr: DiceExpr,
    pub rolls: Vec<u32>,
    pub total: i32,
    pub natural_20: bool,
    pub natural_1: bool,
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let faces: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
        write!(f, "{} [{}] = {}", self.expr, faces.join(", "), self.total)
    }
}

/// Roll a d20 with a flat modifier.
pub fn d20<R: Rng>(modifier: i32, rng: &mut R) -> Roll {
    DiceExpr::new(1, Die::D20, modifier).roll_with_rng(rng)
}
