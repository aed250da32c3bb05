//! Raster buffers, sample layouts and windowed views.
//!
//! A raster is one flat typed buffer addressed through a [`SampleLayout`]:
//!
//! ```text
//! index = offset + row * scanline_stride + col * pixel_stride + band_offsets[band]
//! ```
//!
//! which covers banded, pixel-interleaved and custom-interleaved storage
//! with the same arithmetic. Kernels never see a [`RasterImage`] directly;
//! they read [`Window`]s acquired per region and write a [`RegionBuffer`]
//! that is copied back into the destination afterwards.

use crate::core::error::{AlgebraError, AlgebraResult};
use crate::core::sample::{with_sample_type, Sample};
use crate::core::types::{DataType, Rect};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Physical addressing of samples inside a flat buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleLayout {
    /// Distance between horizontally adjacent pixels.
    pub pixel_stride: usize,
    /// Distance between vertically adjacent pixels.
    pub scanline_stride: usize,
    /// Offset of each band relative to the pixel start.
    pub band_offsets: Vec<usize>,
}

impl SampleLayout {
    /// Pixel-interleaved layout (`RGBRGB...`).
    pub fn interleaved(width: u32, bands: usize) -> Self {
        Self {
            pixel_stride: bands,
            scanline_stride: width as usize * bands,
            band_offsets: (0..bands).collect(),
        }
    }

    /// Band-sequential layout (`RRR...GGG...BBB...`) in a single buffer.
    pub fn banded(width: u32, height: u32, bands: usize) -> Self {
        let plane = width as usize * height as usize;
        Self {
            pixel_stride: 1,
            scanline_stride: width as usize,
            band_offsets: (0..bands).map(|b| b * plane).collect(),
        }
    }

    /// Arbitrary strides and band offsets.
    pub fn custom(pixel_stride: usize, scanline_stride: usize, band_offsets: Vec<usize>) -> Self {
        Self {
            pixel_stride,
            scanline_stride,
            band_offsets,
        }
    }

    /// Number of bands addressed by this layout.
    pub fn num_bands(&self) -> usize {
        self.band_offsets.len()
    }

    /// Buffer index of `(col, row, band)` relative to the buffer origin.
    #[inline]
    pub fn index(&self, col: usize, row: usize, band: usize) -> usize {
        row * self.scanline_stride + col * self.pixel_stride + self.band_offsets[band]
    }

    /// Minimum buffer length needed to address a `width` x `height` raster.
    pub fn required_len(&self, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 || self.band_offsets.is_empty() {
            return 0;
        }
        let max_band = self.band_offsets.iter().copied().max().unwrap_or(0);
        self.index(width as usize - 1, height as usize - 1, 0) - self.band_offsets[0]
            + max_band
            + 1
    }
}

/// Typed sample storage, one variant per representation.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum SampleData {
    Byte(Vec<u8>),
    UShort(Vec<u16>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl SampleData {
    /// A zero-filled buffer of `len` samples.
    pub fn zeros(data_type: DataType, len: usize) -> Self {
        with_sample_type!(data_type, T => T::wrap(vec![T::from_f64(0.0); len]))
    }

    /// Representation of the stored samples.
    pub fn data_type(&self) -> DataType {
        match self {
            SampleData::Byte(_) => DataType::Byte,
            SampleData::UShort(_) => DataType::UShort,
            SampleData::Short(_) => DataType::Short,
            SampleData::Int(_) => DataType::Int,
            SampleData::Float(_) => DataType::Float,
            SampleData::Double(_) => DataType::Double,
        }
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Byte(v) => v.len(),
            SampleData::UShort(v) => v.len(),
            SampleData::Short(v) => v.len(),
            SampleData::Int(v) => v.len(),
            SampleData::Float(v) => v.len(),
            SampleData::Double(v) => v.len(),
        }
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` widened to f64.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            SampleData::Byte(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::UShort(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::Short(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::Int(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::Float(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::Double(v) => v.get(index).copied(),
        }
    }
}

/// Read access to a source raster.
///
/// Implementations hand out tiles covering at least the requested
/// rectangle; the engine never mutates a source.
pub trait RasterSource: Send + Sync {
    /// Area covered by this raster, in absolute pixel coordinates.
    fn bounds(&self) -> Rect;

    /// Number of bands.
    fn num_bands(&self) -> usize;

    /// Sample representation.
    fn data_type(&self) -> DataType;

    /// Acquire samples for `rect`.
    fn tile(&self, rect: Rect) -> AlgebraResult<SourceTile<'_>>;
}

/// A source's backing store positioned on a requested rectangle.
#[derive(Debug, Clone, Copy)]
pub struct SourceTile<'a> {
    rect: Rect,
    data: &'a SampleData,
    layout: &'a SampleLayout,
    offset: usize,
}

impl<'a> SourceTile<'a> {
    /// Rectangle this tile was acquired for.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Representation of the backing store.
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// View the tile as samples of type `T`.
    ///
    /// Borrows the backing store when it already holds `T`; otherwise only
    /// the requested rectangle is converted, rounding and clamping into
    /// `T`'s range.
    pub fn window<T: Sample>(&self) -> Window<'a, T> {
        if let Some(samples) = T::slice(self.data) {
            return Window {
                samples: Cow::Borrowed(samples),
                offset: self.offset,
                pixel_stride: self.layout.pixel_stride,
                scanline_stride: self.layout.scanline_stride,
                band_offsets: Cow::Borrowed(&self.layout.band_offsets),
            };
        }

        let bands = self.layout.num_bands();
        let width = self.rect.width as usize;
        let height = self.rect.height as usize;
        let mut converted = Vec::with_capacity(width * height * bands);
        for row in 0..height {
            for col in 0..width {
                for band in 0..bands {
                    let index = self.offset + self.layout.index(col, row, band);
                    let value = self.data.get_f64(index).unwrap_or(0.0);
                    converted.push(T::from_f64(value));
                }
            }
        }
        let layout = SampleLayout::interleaved(self.rect.width, bands);
        Window {
            samples: Cow::Owned(converted),
            offset: 0,
            pixel_stride: layout.pixel_stride,
            scanline_stride: layout.scanline_stride,
            band_offsets: Cow::Owned(layout.band_offsets),
        }
    }
}

/// Typed, read-only view of one source over one region.
#[derive(Debug, Clone)]
pub struct Window<'a, T: Sample> {
    samples: Cow<'a, [T]>,
    offset: usize,
    pixel_stride: usize,
    scanline_stride: usize,
    band_offsets: Cow<'a, [usize]>,
}

impl<'a, T: Sample> Window<'a, T> {
    /// Number of bands visible through this window.
    pub fn num_bands(&self) -> usize {
        self.band_offsets.len()
    }

    /// Buffer index of the first sample of `row` in `band`.
    #[inline]
    pub fn row_start(&self, row: usize, band: usize) -> usize {
        self.offset + row * self.scanline_stride + self.band_offsets[band]
    }

    /// Distance between horizontally adjacent samples.
    #[inline]
    pub fn pixel_stride(&self) -> usize {
        self.pixel_stride
    }

    /// The underlying sample buffer.
    #[inline]
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Sample at `(col, row, band)` relative to the window origin.
    pub fn get(&self, col: usize, row: usize, band: usize) -> T {
        self.samples[self.row_start(row, band) + col * self.pixel_stride]
    }
}

/// Invocation-local output buffer for one region, band-sequential.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionBuffer<T: Sample> {
    rect: Rect,
    bands: usize,
    samples: Vec<T>,
}

impl<T: Sample> RegionBuffer<T> {
    /// A buffer for `rect` with every sample set to `fill`.
    pub fn new(rect: Rect, bands: usize, fill: T) -> Self {
        Self {
            rect,
            bands,
            samples: vec![fill; rect.area() as usize * bands],
        }
    }

    /// Region covered by the buffer.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Number of bands.
    pub fn num_bands(&self) -> usize {
        self.bands
    }

    /// Mutable samples of one row of one band.
    #[inline]
    pub fn row_mut(&mut self, row: usize, band: usize) -> &mut [T] {
        let width = self.rect.width as usize;
        let start = (band * self.rect.height as usize + row) * width;
        &mut self.samples[start..start + width]
    }

    /// Sample at `(col, row, band)` relative to the region origin.
    pub fn get(&self, col: usize, row: usize, band: usize) -> T {
        let width = self.rect.width as usize;
        self.samples[(band * self.rect.height as usize + row) * width + col]
    }
}

/// An owned raster: bounds, layout and typed samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    bounds: Rect,
    layout: SampleLayout,
    data: SampleData,
}

impl RasterImage {
    /// A zero-filled, pixel-interleaved raster.
    pub fn new(bounds: Rect, bands: usize, data_type: DataType) -> Self {
        let layout = SampleLayout::interleaved(bounds.width, bands);
        let len = layout.required_len(bounds.width, bounds.height);
        Self {
            bounds,
            layout,
            data: SampleData::zeros(data_type, len),
        }
    }

    /// A pixel-interleaved raster holding one constant per band.
    pub fn constant(bounds: Rect, data_type: DataType, values: &[f64]) -> Self {
        let layout = SampleLayout::interleaved(bounds.width, values.len());
        let data = with_sample_type!(data_type, T => {
            let pixel: Vec<T> = values.iter().map(|&v| T::from_f64(v)).collect();
            T::wrap(pixel.repeat(bounds.area() as usize))
        });
        Self {
            bounds,
            layout,
            data,
        }
    }

    /// Wrap an existing buffer, validating that the layout fits it.
    pub fn from_data(bounds: Rect, layout: SampleLayout, data: SampleData) -> AlgebraResult<Self> {
        if layout.num_bands() == 0 {
            return Err(AlgebraError::InvalidLayout("layout has no bands".to_string()));
        }
        let required = layout.required_len(bounds.width, bounds.height);
        if data.len() < required {
            return Err(AlgebraError::InvalidLayout(format!(
                "buffer holds {} samples, layout needs {}",
                data.len(),
                required
            )));
        }
        Ok(Self {
            bounds,
            layout,
            data,
        })
    }

    /// Wrap a pixel-interleaved vector.
    pub fn from_vec<T: Sample>(bounds: Rect, bands: usize, samples: Vec<T>) -> AlgebraResult<Self> {
        let layout = SampleLayout::interleaved(bounds.width, bands);
        Self::from_data(bounds, layout, T::wrap(samples))
    }

    /// Physical layout of the samples.
    pub fn layout(&self) -> &SampleLayout {
        &self.layout
    }

    /// The typed sample storage.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Borrow the samples as `T`, if that is the stored representation.
    pub fn samples<T: Sample>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    fn locate(&self, x: u32, y: u32, band: usize) -> Option<usize> {
        if !self.bounds.contains_point(x, y) || band >= self.layout.num_bands() {
            return None;
        }
        let col = (x - self.bounds.x) as usize;
        let row = (y - self.bounds.y) as usize;
        Some(self.layout.index(col, row, band))
    }

    /// Sample at absolute `(x, y)` in `band`, if stored as `T`.
    pub fn get<T: Sample>(&self, x: u32, y: u32, band: usize) -> Option<T> {
        let index = self.locate(x, y, band)?;
        T::slice(&self.data)?.get(index).copied()
    }

    /// Sample at absolute `(x, y)` in `band`, widened to f64.
    pub fn get_f64(&self, x: u32, y: u32, band: usize) -> Option<f64> {
        let index = self.locate(x, y, band)?;
        self.data.get_f64(index)
    }

    /// Overwrite one sample.
    pub fn set<T: Sample>(&mut self, x: u32, y: u32, band: usize, value: T) -> AlgebraResult<()> {
        let bounds = self.bounds;
        let index = self
            .locate(x, y, band)
            .ok_or(AlgebraError::RegionOutOfBounds {
                what: "raster",
                region: Rect::new(x, y, 1, 1),
                bounds,
            })?;
        let data_type = self.data.data_type();
        let samples = Self::typed_mut::<T>(&mut self.data, data_type)?;
        samples[index] = value;
        Ok(())
    }

    /// Fill `rect` with one constant per band.
    pub fn fill_region<T: Sample>(&mut self, rect: Rect, values: &[T]) -> AlgebraResult<()> {
        self.check_region(rect)?;
        if values.len() != self.layout.num_bands() {
            return Err(AlgebraError::GeometryMismatch {
                what: "fill values",
                expected: self.layout.num_bands(),
                actual: values.len(),
            });
        }
        let col0 = (rect.x - self.bounds.x) as usize;
        let row0 = (rect.y - self.bounds.y) as usize;
        let data_type = self.data.data_type();
        let samples = Self::typed_mut::<T>(&mut self.data, data_type)?;
        for (band, &value) in values.iter().enumerate() {
            for row in row0..row0 + rect.height as usize {
                for col in col0..col0 + rect.width as usize {
                    samples[self.layout.index(col, row, band)] = value;
                }
            }
        }
        Ok(())
    }

    /// Copy a computed region back into this raster's own layout.
    pub fn write_region<T: Sample>(&mut self, region: &RegionBuffer<T>) -> AlgebraResult<()> {
        let rect = region.rect();
        self.check_region(rect)?;
        let bands = region.num_bands().min(self.layout.num_bands());
        let col0 = (rect.x - self.bounds.x) as usize;
        let row0 = (rect.y - self.bounds.y) as usize;
        let data_type = self.data.data_type();
        let samples = Self::typed_mut::<T>(&mut self.data, data_type)?;
        for band in 0..bands {
            for row in 0..rect.height as usize {
                for col in 0..rect.width as usize {
                    let index = self.layout.index(col0 + col, row0 + row, band);
                    samples[index] = region.get(col, row, band);
                }
            }
        }
        Ok(())
    }

    /// Copy the overlapping part of `other` into this raster.
    ///
    /// Both rasters must share a representation.
    pub fn copy_from(&mut self, other: &RasterImage) -> AlgebraResult<()> {
        let Some(overlap) = self.bounds.intersection(&other.bounds) else {
            return Ok(());
        };
        with_sample_type!(self.data_type(), T => self.copy_typed::<T>(other, overlap))
    }

    fn copy_typed<T: Sample>(&mut self, other: &RasterImage, overlap: Rect) -> AlgebraResult<()> {
        let source = T::slice(&other.data).ok_or_else(|| {
            AlgebraError::UnsupportedRepresentation(format!(
                "cannot copy {} samples into a {} raster",
                other.data_type(),
                T::DATA_TYPE
            ))
        })?;
        let bands = self.layout.num_bands().min(other.layout.num_bands());
        let data_type = self.data.data_type();
        let target = Self::typed_mut::<T>(&mut self.data, data_type)?;
        for band in 0..bands {
            for y in overlap.y..overlap.bottom() {
                for x in overlap.x..overlap.right() {
                    let from = other.layout.index(
                        (x - other.bounds.x) as usize,
                        (y - other.bounds.y) as usize,
                        band,
                    );
                    let to = self.layout.index(
                        (x - self.bounds.x) as usize,
                        (y - self.bounds.y) as usize,
                        band,
                    );
                    target[to] = source[from];
                }
            }
        }
        Ok(())
    }

    fn check_region(&self, rect: Rect) -> AlgebraResult<()> {
        if self.bounds.contains_rect(&rect) {
            Ok(())
        } else {
            Err(AlgebraError::RegionOutOfBounds {
                what: "raster",
                region: rect,
                bounds: self.bounds,
            })
        }
    }

    fn typed_mut<T: Sample>(data: &mut SampleData, data_type: DataType) -> AlgebraResult<&mut [T]> {
        T::slice_mut(data).ok_or_else(|| {
            AlgebraError::UnsupportedRepresentation(format!(
                "cannot write {} samples into a {} raster",
                T::DATA_TYPE,
                data_type
            ))
        })
    }
}

impl RasterSource for RasterImage {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn num_bands(&self) -> usize {
        self.layout.num_bands()
    }

    fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    fn tile(&self, rect: Rect) -> AlgebraResult<SourceTile<'_>> {
        self.check_region(rect)?;
        let col = (rect.x - self.bounds.x) as usize;
        let row = (rect.y - self.bounds.y) as usize;
        Ok(SourceTile {
            rect,
            data: &self.data,
            layout: &self.layout,
            offset: row * self.layout.scanline_stride + col * self.layout.pixel_stride,
        })
    }
}
