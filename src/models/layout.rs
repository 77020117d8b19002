// ABOUTME: Fixed set of slot grid layouts and their capacities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arrangement of slots on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GridLayout {
    #[serde(rename = "1", alias = "single")]
    Single,
    #[serde(rename = "2", alias = "pair")]
    Pair,
    #[serde(rename = "3", alias = "trio")]
    Trio,
    /// Four side by side
    #[serde(rename = "4", alias = "row4")]
    Row4,
    #[default]
    #[serde(rename = "2x2", alias = "grid2x2")]
    Grid2x2,
    #[serde(rename = "6", alias = "3x2")]
    Grid3x2,
    #[serde(rename = "8", alias = "4x2")]
    Grid4x2,
}

impl GridLayout {
    pub const ALL: [GridLayout; 7] = [
        GridLayout::Single,
        GridLayout::Pair,
        GridLayout::Trio,
        GridLayout::Row4,
        GridLayout::Grid2x2,
        GridLayout::Grid3x2,
        GridLayout::Grid4x2,
    ];

    pub fn capacity(&self) -> usize {
        let (cols, rows) = self.grid();
        cols * rows
    }

    /// (columns, rows)
    pub fn grid(&self) -> (usize, usize) {
        match self {
            GridLayout::Single => (1, 1),
            GridLayout::Pair => (2, 1),
            GridLayout::Trio => (3, 1),
            GridLayout::Row4 => (4, 1),
            GridLayout::Grid2x2 => (2, 2),
            GridLayout::Grid3x2 => (3, 2),
            GridLayout::Grid4x2 => (4, 2),
        }
    }

    /// Next layout in cycling order
    pub fn next(&self) -> GridLayout {
        let idx = Self::ALL.iter().position(|l| l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(&self) -> &'static str {
        match self {
            GridLayout::Single => "1",
            GridLayout::Pair => "2",
            GridLayout::Trio => "3",
            GridLayout::Row4 => "4",
            GridLayout::Grid2x2 => "2x2",
            GridLayout::Grid3x2 => "6",
            GridLayout::Grid4x2 => "8",
        }
    }
}

impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GridLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "single" => Ok(GridLayout::Single),
            "2" | "pair" => Ok(GridLayout::Pair),
            "3" | "trio" => Ok(GridLayout::Trio),
            "4" | "row4" => Ok(GridLayout::Row4),
            "2x2" | "grid2x2" => Ok(GridLayout::Grid2x2),
            "6" | "3x2" => Ok(GridLayout::Grid3x2),
            "8" | "4x2" => Ok(GridLayout::Grid4x2),
            other => Err(format!(
                "unknown layout '{}' (expected 1, 2, 3, 4, 2x2, 6 or 8)",
                other
            )),
        }
    }
}
