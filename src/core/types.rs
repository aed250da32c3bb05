//! Core value types: sample representations and pixel rectangles.

use crate::core::error::AlgebraError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric sample representation of a raster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Unsigned 8-bit
    Byte,
    /// Unsigned 16-bit
    UShort,
    /// Signed 16-bit
    Short,
    /// Signed 32-bit integer
    Int,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
}

impl DataType {
    /// All supported representations, narrowest first.
    pub const ALL: [DataType; 6] = [
        DataType::Byte,
        DataType::UShort,
        DataType::Short,
        DataType::Int,
        DataType::Float,
        DataType::Double,
    ];

    /// Lowercase name used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Byte => "byte",
            DataType::UShort => "ushort",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }

    /// Size of one sample in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Byte => 1,
            DataType::UShort | DataType::Short => 2,
            DataType::Int | DataType::Float => 4,
            DataType::Double => 8,
        }
    }

    /// Whether samples are IEEE floating point.
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float | DataType::Double)
    }

    /// Smallest representation able to hold values of both `self` and `other`.
    ///
    /// Unsigned and signed 16-bit samples meet at 32-bit integers.
    pub fn promote(self, other: DataType) -> DataType {
        match (self, other) {
            (DataType::UShort, DataType::Short) | (DataType::Short, DataType::UShort) => {
                DataType::Int
            }
            (a, b) if a.rank() >= b.rank() => a,
            (_, b) => b,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            DataType::Byte => 0,
            DataType::UShort => 1,
            DataType::Short => 2,
            DataType::Int => 3,
            DataType::Float => 4,
            DataType::Double => 5,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = AlgebraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "byte" | "u8" => Ok(DataType::Byte),
            "ushort" | "u16" => Ok(DataType::UShort),
            "short" | "i16" => Ok(DataType::Short),
            "int" | "i32" => Ok(DataType::Int),
            "float" | "f32" => Ok(DataType::Float),
            "double" | "f64" => Ok(DataType::Double),
            other => Err(AlgebraError::UnsupportedRepresentation(other.to_string())),
        }
    }
}

/// A rectangle in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// X offset from the image origin
    pub x: u32,
    /// Y offset from the image origin
    pub y: u32,
    /// Width of the region
    pub width: u32,
    /// Height of the region
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Get the right edge coordinate (exclusive), saturating at `u32::MAX`.
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Get the bottom edge coordinate (exclusive), saturating at `u32::MAX`.
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    // Exact edges; a caller-supplied rectangle may reach past `u32::MAX`.
    fn right_edge(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    fn bottom_edge(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Calculate the area of this region in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the pixel `(x, y)` lies inside.
    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && (x as u64) < self.right_edge()
            && (y as u64) < self.bottom_edge()
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right_edge() <= self.right_edge()
            && other.bottom_edge() <= self.bottom_edge()
    }

    /// Whether the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && (self.x as u64) < other.right_edge()
            && (other.x as u64) < self.right_edge()
            && (self.y as u64) < other.bottom_edge()
            && (other.y as u64) < self.bottom_edge()
    }

    /// The overlapping part of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right_edge().min(other.right_edge());
        let bottom = self.bottom_edge().min(other.bottom_edge());
        // Both spans are bounded by the narrower rectangle.
        Some(Rect::new(x, y, (right - x as u64) as u32, (bottom - y as u64) as u32))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.width, self.height)
    }
}
