//! Region-of-interest capability.
//!
//! The engine only consumes a [`Roi`]: a membership test over absolute
//! pixel coordinates plus a bounding rectangle used to skip whole regions.

use crate::core::error::{AlgebraError, AlgebraResult};
use crate::core::types::Rect;
use std::fmt::Debug;

/// Pixel membership predicate restricting where results are computed.
pub trait Roi: Debug + Send + Sync {
    /// Whether absolute pixel `(x, y)` is inside the region of interest.
    fn contains(&self, x: u32, y: u32) -> bool;

    /// Rectangle enclosing every member pixel.
    fn bounds(&self) -> Rect;

    /// Whether any member pixel could lie inside `rect`.
    fn intersects(&self, rect: &Rect) -> bool {
        self.bounds().intersects(rect)
    }
}

/// Rectangular region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectRoi {
    rect: Rect,
}

impl RectRoi {
    /// Create a rectangular ROI.
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }
}

impl Roi for RectRoi {
    #[inline]
    fn contains(&self, x: u32, y: u32) -> bool {
        self.rect.contains_point(x, y)
    }

    fn bounds(&self) -> Rect {
        self.rect
    }
}

/// Region of interest given as one flag per pixel of a rectangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRoi {
    area: Rect,
    members: Vec<bool>,
    bounds: Rect,
}

impl MaskRoi {
    /// Create a mask ROI over `area`; `members` is row-major.
    pub fn new(area: Rect, members: Vec<bool>) -> AlgebraResult<Self> {
        if members.len() as u64 != area.area() {
            return Err(AlgebraError::GeometryMismatch {
                what: "mask pixels",
                expected: area.area() as usize,
                actual: members.len(),
            });
        }
        let bounds = Self::tight_bounds(area, &members);
        Ok(Self {
            area,
            members,
            bounds,
        })
    }

    /// Build a mask by evaluating `predicate` at every pixel of `area`.
    pub fn from_fn<F>(area: Rect, predicate: F) -> Self
    where
        F: Fn(u32, u32) -> bool,
    {
        let mut members = Vec::with_capacity(area.area() as usize);
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                members.push(predicate(x, y));
            }
        }
        let bounds = Self::tight_bounds(area, &members);
        Self {
            area,
            members,
            bounds,
        }
    }

    /// Number of member pixels.
    pub fn count(&self) -> usize {
        self.members.iter().filter(|&&m| m).count()
    }

    fn tight_bounds(area: Rect, members: &[bool]) -> Rect {
        let width = area.width as usize;
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        let mut any = false;
        for (i, &member) in members.iter().enumerate() {
            if !member {
                continue;
            }
            let x = area.x + (i % width) as u32;
            let y = area.y + (i / width) as u32;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            any = true;
        }
        if any {
            Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
        } else {
            Rect::new(area.x, area.y, 0, 0)
        }
    }
}

impl Roi for MaskRoi {
    #[inline]
    fn contains(&self, x: u32, y: u32) -> bool {
        if !self.area.contains_point(x, y) {
            return false;
        }
        let i = (y - self.area.y) as usize * self.area.width as usize + (x - self.area.x) as usize;
        self.members[i]
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_roi() {
        let roi = RectRoi::new(Rect::new(2, 2, 3, 3));
        assert!(roi.contains(2, 2));
        assert!(roi.contains(4, 4));
        assert!(!roi.contains(5, 4));
        assert!(roi.intersects(&Rect::new(0, 0, 3, 3)));
        assert!(!roi.intersects(&Rect::new(5, 0, 3, 3)));
    }

    #[test]
    fn test_mask_roi() {
        let roi = MaskRoi::from_fn(Rect::new(10, 10, 8, 8), |x, y| x == 12 && y >= 14);
        assert_eq!(roi.count(), 4);
        assert!(roi.contains(12, 15));
        assert!(!roi.contains(13, 15));
        assert!(!roi.contains(0, 0));
        assert_eq!(roi.bounds(), Rect::new(12, 14, 1, 4));
        assert!(!roi.intersects(&Rect::new(10, 10, 8, 4)));
    }

    #[test]
    fn test_mask_roi_length_mismatch() {
        let result = MaskRoi::new(Rect::new(0, 0, 2, 2), vec![true; 3]);
        assert!(matches!(result, Err(AlgebraError::GeometryMismatch { .. })));
    }

    #[test]
    fn test_empty_mask_intersects_nothing() {
        let roi = MaskRoi::new(Rect::new(0, 0, 2, 2), vec![false; 4]).unwrap();
        assert!(!roi.intersects(&Rect::new(0, 0, 2, 2)));
    }
}
