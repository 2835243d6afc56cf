use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::HighlightError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub document_width: f64,
    pub document_height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            document_width: 1280.0,
            document_height: 720.0,
        }
    }
}

/// Axis-aligned box in viewport coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn contains(&self, other: &ElementRect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn overlap_area(&self, other: &ElementRect) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 {
            0.0
        } else {
            w * h
        }
    }

    pub fn center_distance(&self, other: &ElementRect) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Capability class an element is bucketed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CapabilityTag {
    #[serde(rename = "CLICKABLE")]
    Clickable,
    #[serde(rename = "FILLABLE")]
    Fillable,
    #[serde(rename = "SELECTABLE")]
    Selectable,
    #[serde(rename = "NON_INTERACTIVE_ELEMENT")]
    NonInteractive,
}

impl CapabilityTag {
    pub const ALL: [CapabilityTag; 4] = [
        CapabilityTag::Clickable,
        CapabilityTag::Fillable,
        CapabilityTag::Selectable,
        CapabilityTag::NonInteractive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityTag::Clickable => "CLICKABLE",
            CapabilityTag::Fillable => "FILLABLE",
            CapabilityTag::Selectable => "SELECTABLE",
            CapabilityTag::NonInteractive => "NON_INTERACTIVE_ELEMENT",
        }
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityTag {
    type Err = HighlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CLICKABLE" => Ok(CapabilityTag::Clickable),
            "FILLABLE" => Ok(CapabilityTag::Fillable),
            "SELECTABLE" => Ok(CapabilityTag::Selectable),
            "NON_INTERACTIVE" | "NON_INTERACTIVE_ELEMENT" => Ok(CapabilityTag::NonInteractive),
            other => Err(HighlightError::ConfigurationError(format!(
                "unknown capability tag '{}'",
                other
            ))),
        }
    }
}
