//! Incremental update regions: the set difference between a level's old and
//! new resident windows.

use crate::extent::PostExtent;

/// A rectangular sub-region of one clipmap level that must be (re)written
/// this frame. Created transiently during the update pass; never persisted.
///
/// The region always lies within the owning level's next extent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipmapUpdate {
    level: usize,
    region: PostExtent,
}

impl ClipmapUpdate {
    pub fn new(level: usize, region: PostExtent) -> Self {
        Self { level, region }
    }

    /// Index of the clipmap level this update belongs to.
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn region(&self) -> PostExtent {
        self.region
    }

    pub fn west(&self) -> i64 {
        self.region.west
    }

    pub fn south(&self) -> i64 {
        self.region.south
    }

    pub fn east(&self) -> i64 {
        self.region.east
    }

    pub fn north(&self) -> i64 {
        self.region.north
    }

    pub fn width(&self) -> i64 {
        self.region.width()
    }

    pub fn height(&self) -> i64 {
        self.region.height()
    }

    /// An equivalent update with a one-post buffer added around the
    /// perimeter, clamped so it never exceeds `next_extent`.
    ///
    /// The buffer gives bilinear sampling and normal computation a valid
    /// halo at the region's edge. Applying the buffer twice yields the same
    /// result as applying it once when the region already touches the
    /// window bounds.
    pub fn add_buffer_within_level_next_extent(&self, next_extent: PostExtent) -> ClipmapUpdate {
        debug_assert!(
            next_extent.contains(&self.region),
            "update region {:?} escapes next extent {next_extent:?}",
            self.region
        );
        ClipmapUpdate::new(
            self.level,
            PostExtent::new(
                (self.region.west - 1).max(next_extent.west),
                (self.region.south - 1).max(next_extent.south),
                (self.region.east + 1).min(next_extent.east),
                (self.region.north + 1).min(next_extent.north),
            ),
        )
    }
}

/// Decompose the difference between the resident window and the window it
/// is transitioning toward into at most two disjoint strips.
///
/// Both windows are the same size, so a move can introduce at most one new
/// column strip (west or east) and one new row strip (south or north); the
/// row strip is trimmed to the columns shared with the old window so the
/// strips never overlap. With no prior window, or no overlap at all, the
/// whole new window is returned.
pub fn update_regions(current: Option<PostExtent>, next: PostExtent) -> Vec<PostExtent> {
    let Some(current) = current else {
        return vec![next];
    };
    if current == next {
        return Vec::new();
    }
    if current.intersection(&next).is_none() {
        return vec![next];
    }

    let mut regions = Vec::with_capacity(2);

    if next.west < current.west {
        regions.push(PostExtent::new(
            next.west,
            next.south,
            current.west - 1,
            next.north,
        ));
    } else if next.east > current.east {
        regions.push(PostExtent::new(
            current.east + 1,
            next.south,
            next.east,
            next.north,
        ));
    }

    let shared_west = next.west.max(current.west);
    let shared_east = next.east.min(current.east);
    if next.south < current.south {
        regions.push(PostExtent::new(
            shared_west,
            next.south,
            shared_east,
            current.south - 1,
        ));
    } else if next.north > current.north {
        regions.push(PostExtent::new(
            shared_west,
            current.north + 1,
            shared_east,
            next.north,
        ));
    }

    regions
}
