//! Decoded tile payloads.

/// Sample data for one tile, row-major with the origin at the southwest
/// corner (rows run south to north). Sources that deliver north-to-south
/// rows flip during decode so consumers see a single orientation.
#[derive(Clone, Debug, PartialEq)]
pub enum TileData {
    /// One 32-bit float height sample per post, in meters.
    Height32F(Vec<f32>),
    /// Four bytes (RGBA) per post.
    Rgba8(Vec<u8>),
}

/// A decoded tile: dimensions plus sample data.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePayload {
    width: usize,
    height: usize,
    data: TileData,
}

impl TilePayload {
    /// Wrap decoded samples.
    ///
    /// # Panics
    ///
    /// Panics if the sample count does not match `width * height` (times four
    /// bytes for RGBA) — a malformed decode is a programming error by the
    /// source, not a runtime condition.
    pub fn new(width: usize, height: usize, data: TileData) -> Self {
        let expected = width * height;
        match &data {
            TileData::Height32F(samples) => assert_eq!(
                samples.len(),
                expected,
                "height payload sample count mismatch for {width}x{height}"
            ),
            TileData::Rgba8(pixels) => assert_eq!(
                pixels.len(),
                expected * 4,
                "rgba payload byte count mismatch for {width}x{height}"
            ),
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &TileData {
        &self.data
    }

    /// Height samples, if this is a height payload.
    pub fn heights(&self) -> Option<&[f32]> {
        match &self.data {
            TileData::Height32F(samples) => Some(samples),
            TileData::Rgba8(_) => None,
        }
    }

    /// RGBA bytes, if this is an imagery payload.
    pub fn rgba(&self) -> Option<&[u8]> {
        match &self.data {
            TileData::Rgba8(pixels) => Some(pixels),
            TileData::Height32F(_) => None,
        }
    }

    /// Approximate resident size in bytes, used for cache accounting.
    pub fn size_bytes(&self) -> usize {
        match &self.data {
            TileData::Height32F(samples) => samples.len() * 4,
            TileData::Rgba8(pixels) => pixels.len(),
        }
    }
}
