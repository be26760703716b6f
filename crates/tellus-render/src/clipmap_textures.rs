//! Per-level clipmap textures with toroidal sub-region writes.
//!
//! Each clipmap level owns a fixed-size height texture (and optionally an
//! imagery texture) addressed toroidally: post (x, y) of the level's window
//! lives at texel (x mod W, y mod W). Moving the window only rewrites the
//! strip of texels that entered it; the rest stay in place, wrapped.

use tellus_clipmap::{ClipmapFrame, ReadyRegion};
use tellus_raster::TileData;

/// Errors for clipmap texture creation and writes.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// A ready region's payload does not match its update extent.
    #[error("region data size ({actual}) does not match extent {width}x{height}")]
    RegionSizeMismatch {
        actual: usize,
        width: i64,
        height: i64,
    },

    /// A ready region names a level the texture set does not have.
    #[error("no clipmap texture for level {level} (have {count})")]
    NoSuchLevel { level: usize, count: usize },

    /// An imagery region arrived but the set was created without imagery.
    #[error("imagery region for a height-only texture set")]
    ImageryNotAllocated,
}

/// One axis of a toroidal write: destination texel start, run length, and
/// source offset within the region buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToroidalSlice {
    pub texel_start: u32,
    pub length: u32,
    pub source_offset: u32,
}

/// Split one axis of a region into the (at most two) contiguous texel runs
/// it occupies in a `window`-wide wrap-addressed texture.
///
/// # Panics
///
/// Panics if the region is wider than the window — the window is the whole
/// texture, so a larger write is a caller bug.
pub fn toroidal_slices(start_post: i64, length: i64, window: i64) -> Vec<ToroidalSlice> {
    assert!(
        length <= window,
        "a {length}-post write cannot fit a {window}-post texture"
    );
    let texel_start = start_post.rem_euclid(window) as u32;
    let length = length as u32;
    let window = window as u32;

    if texel_start + length <= window {
        vec![ToroidalSlice {
            texel_start,
            length,
            source_offset: 0,
        }]
    } else {
        let first = window - texel_start;
        vec![
            ToroidalSlice {
                texel_start,
                length: first,
                source_offset: 0,
            },
            ToroidalSlice {
                texel_start: 0,
                length: length - first,
                source_offset: first,
            },
        ]
    }
}

/// The GPU-resident clipmap stack: one height texture (R32Float) and
/// optionally one imagery texture (RGBA8) per level, all `window` texels
/// square.
pub struct ClipmapTextureSet {
    height_textures: Vec<wgpu::Texture>,
    height_views: Vec<wgpu::TextureView>,
    imagery_textures: Vec<wgpu::Texture>,
    imagery_views: Vec<wgpu::TextureView>,
    window: u32,
}

impl ClipmapTextureSet {
    /// Allocate textures for `level_count` levels of `window`-post windows.
    pub fn new(
        device: &wgpu::Device,
        level_count: usize,
        window: u32,
        with_imagery: bool,
    ) -> Self {
        let make = |label: &str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: window,
                    height: window,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            })
        };

        let mut height_textures = Vec::with_capacity(level_count);
        let mut imagery_textures = Vec::new();
        for level in 0..level_count {
            height_textures.push(make(
                &format!("clipmap-height-{level}"),
                wgpu::TextureFormat::R32Float,
            ));
            if with_imagery {
                imagery_textures.push(make(
                    &format!("clipmap-imagery-{level}"),
                    wgpu::TextureFormat::Rgba8UnormSrgb,
                ));
            }
        }

        let height_views = height_textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();
        let imagery_views = imagery_textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();

        Self {
            height_textures,
            height_views,
            imagery_textures,
            imagery_views,
            window,
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn level_count(&self) -> usize {
        self.height_textures.len()
    }

    pub fn height_view(&self, level: usize) -> &wgpu::TextureView {
        &self.height_views[level]
    }

    pub fn imagery_view(&self, level: usize) -> Option<&wgpu::TextureView> {
        self.imagery_views.get(level)
    }

    /// Upload every ready region of a controller frame. Render thread only.
    pub fn apply_frame(
        &self,
        queue: &wgpu::Queue,
        frame: &ClipmapFrame,
    ) -> Result<(), TextureError> {
        for region in &frame.height_updates {
            self.write_region(queue, region, false)?;
        }
        for region in &frame.imagery_updates {
            self.write_region(queue, region, true)?;
        }
        Ok(())
    }

    /// Write one ready region into its level's wrap-addressed texture,
    /// splitting across the texture edges as needed (up to four writes).
    pub fn write_region(
        &self,
        queue: &wgpu::Queue,
        region: &ReadyRegion,
        imagery: bool,
    ) -> Result<(), TextureError> {
        let level = region.update.level();
        let texture = if imagery {
            self.imagery_textures
                .get(level)
                .ok_or(TextureError::ImageryNotAllocated)?
        } else {
            self.height_textures
                .get(level)
                .ok_or(TextureError::NoSuchLevel {
                    level,
                    count: self.height_textures.len(),
                })?
        };

        let extent = region.update.region();
        let (bytes, bytes_per_post): (&[u8], u32) = match &region.data {
            TileData::Height32F(samples) => (bytemuck::cast_slice(samples), 4),
            TileData::Rgba8(pixels) => (pixels, 4),
        };
        let expected = (extent.area() as usize) * bytes_per_post as usize;
        if bytes.len() != expected {
            return Err(TextureError::RegionSizeMismatch {
                actual: bytes.len() / bytes_per_post as usize,
                width: extent.width(),
                height: extent.height(),
            });
        }

        let window = self.window as i64;
        let row_bytes = extent.width() as u32 * bytes_per_post;

        for y_slice in toroidal_slices(extent.south, extent.height(), window) {
            for x_slice in toroidal_slices(extent.west, extent.width(), window) {
                let offset = (y_slice.source_offset as u64 * extent.width() as u64
                    + x_slice.source_offset as u64)
                    * bytes_per_post as u64;
                queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d {
                            x: x_slice.texel_start,
                            y: y_slice.texel_start,
                            z: 0,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    &bytes[offset as usize..],
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(row_bytes),
                        rows_per_image: None,
                    },
                    wgpu::Extent3d {
                        width: x_slice.length,
                        height: y_slice.length,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }
        Ok(())
    }
}

/// The texel a level-wide post occupies in its wrap-addressed texture.
pub fn post_to_texel(post: i64, window: i64) -> u32 {
    post.rem_euclid(window) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_region_is_one_slice() {
        let slices = toroidal_slices(3, 4, 16);
        assert_eq!(
            slices,
            vec![ToroidalSlice {
                texel_start: 3,
                length: 4,
                source_offset: 0
            }]
        );
    }

    /// A region crossing the texture edge splits into two runs whose
    /// lengths sum to the region width.
    #[test]
    fn test_wrapping_region_splits_in_two() {
        let slices = toroidal_slices(14, 5, 16);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].texel_start, 14);
        assert_eq!(slices[0].length, 2);
        assert_eq!(slices[1].texel_start, 0);
        assert_eq!(slices[1].length, 3);
        assert_eq!(slices[1].source_offset, 2);
    }

    #[test]
    fn test_negative_posts_wrap() {
        let slices = toroidal_slices(-3, 3, 16);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].texel_start, 13);
    }

    #[test]
    fn test_full_window_write_is_one_slice_when_aligned() {
        let slices = toroidal_slices(32, 16, 16);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].texel_start, 0);
        assert_eq!(slices[0].length, 16);
    }

    #[test]
    #[should_panic(expected = "cannot fit")]
    fn test_oversized_write_panics() {
        toroidal_slices(0, 17, 16);
    }

    /// Every post of a wrapped write lands on the texel post_to_texel says
    /// it should, with no texel written twice.
    #[test]
    fn test_slices_cover_region_exactly() {
        let (start, length, window) = (11, 7, 16);
        let slices = toroidal_slices(start, length, window);

        let mut covered = vec![false; window as usize];
        for slice in &slices {
            for i in 0..slice.length {
                let texel = (slice.texel_start + i) as usize;
                assert!(!covered[texel], "texel {texel} written twice");
                covered[texel] = true;
                // The source post this texel receives.
                let post = start + (slice.source_offset + i) as i64;
                assert_eq!(post_to_texel(post, window), texel as u32);
            }
        }
        assert_eq!(covered.iter().filter(|&&c| c).count(), length as usize);
    }
}
