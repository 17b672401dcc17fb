//! Memoization of resampled slice textures.
//!
//! Resampling an X or Z slice touches one row of every layer, so repeating it
//! every frame dominates the cost of a redraw. The cache holds at most one
//! texture per plane; lookups use approximate plane equality.
//!
//! With [`CachePolicy::RetainAll`] nothing is evicted while a dataset is
//! loaded. The number of distinct planes is bounded by the number of mesh
//! layers, but for very fine cell grids the total can grow large; use
//! [`CachePolicy::Bounded`] to cap it.

use std::sync::Arc;

use image::RgbaImage;
use stackscope_core::{Axis, CachePolicy, PlaneDescriptor, Result};

use crate::voxel_volume::SliceSource;

#[derive(Debug)]
struct CacheEntry {
    plane: PlaneDescriptor,
    texture: Arc<RgbaImage>,
    last_used: u64,
}

/// Plane-keyed texture cache.
#[derive(Debug)]
pub struct SliceCache {
    entries: Vec<CacheEntry>,
    policy: CachePolicy,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl Default for SliceCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}

impl SliceCache {
    /// Creates an empty cache with the given retention policy.
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the slice perpendicular to `axis` at `offset`, resampling only on a miss.
    pub fn get<S: SliceSource + ?Sized>(
        &mut self,
        source: &S,
        axis: Axis,
        offset: f32,
    ) -> Arc<RgbaImage> {
        self.lookup_or_sample(source, axis, PlaneDescriptor::for_axis(axis, offset))
    }

    /// Returns the slice for an arbitrary plane descriptor.
    ///
    /// Oblique planes fail before the cache is consulted.
    pub fn texture_for<S: SliceSource + ?Sized>(
        &mut self,
        source: &S,
        plane: &PlaneDescriptor,
    ) -> Result<Arc<RgbaImage>> {
        let axis = plane.axis()?;
        Ok(self.lookup_or_sample(source, axis, *plane))
    }

    fn lookup_or_sample<S: SliceSource + ?Sized>(
        &mut self,
        source: &S,
        axis: Axis,
        plane: PlaneDescriptor,
    ) -> Arc<RgbaImage> {
        self.clock += 1;

        if let Some(entry) = self.entries.iter_mut().find(|e| e.plane.approx_eq(&plane)) {
            entry.last_used = self.clock;
            self.hits += 1;
            return Arc::clone(&entry.texture);
        }

        self.misses += 1;
        let index = source.index_for(axis, plane.offset());
        log::debug!(
            "slice cache miss: {axis:?} offset {} -> index {index}",
            plane.offset()
        );
        let texture = source.sample_slice(axis, index);

        if let CachePolicy::Bounded { max_entries } = self.policy {
            while self.entries.len() >= max_entries.max(1) {
                self.evict_least_recent();
            }
        }

        self.entries.push(CacheEntry {
            plane,
            texture: Arc::clone(&texture),
            last_used: self.clock,
        });
        texture
    }

    fn evict_least_recent(&mut self) {
        if let Some(oldest) = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(i, _)| i)
        {
            self.entries.swap_remove(oldest);
        }
    }

    /// Drops every cached slice. Counters are kept.
    pub fn invalidate_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("slice cache cleared ({} entries)", self.entries.len());
        }
        self.entries.clear();
    }

    /// Changes the retention policy, evicting immediately if the new bound is smaller.
    pub fn set_policy(&mut self, policy: CachePolicy) {
        self.policy = policy;
        if let CachePolicy::Bounded { max_entries } = policy {
            while self.entries.len() > max_entries.max(1) {
                self.evict_least_recent();
            }
        }
    }

    /// Returns the retention policy.
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns true if a texture for `plane` is cached.
    pub fn contains(&self, plane: &PlaneDescriptor) -> bool {
        self.entries.iter().any(|e| e.plane.approx_eq(plane))
    }

    /// Number of cached slices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lookups answered from the cache.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookups that had to resample.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use glam::Vec3;
    use image::Rgba;
    use stackscope_core::StackscopeError;

    use crate::voxel_volume::VoxelVolume;

    /// Wraps a volume and counts resamples.
    struct CountingSource {
        volume: VoxelVolume,
        samples: Cell<usize>,
    }

    impl CountingSource {
        fn new(width: u32, height: u32, layers: u32) -> Self {
            let images = (0..layers)
                .map(|l| {
                    RgbaImage::from_fn(width, height, |c, r| {
                        Rgba([l as u8, r as u8, c as u8, 255])
                    })
                })
                .collect();
            Self {
                volume: VoxelVolume::load(images, 1.0).unwrap(),
                samples: Cell::new(0),
            }
        }
    }

    impl SliceSource for CountingSource {
        fn extent(&self, axis: Axis) -> u32 {
            self.volume.extent(axis)
        }

        fn sample_slice(&self, axis: Axis, index: u32) -> Arc<RgbaImage> {
            self.samples.set(self.samples.get() + 1);
            self.volume.sample_slice(axis, index)
        }
    }

    #[test]
    fn test_second_get_is_a_hit() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::default();

        let first = cache.get(&source, Axis::X, 0.5);
        let second = cache.get(&source, Axis::X, 0.5);

        assert_eq!(source.samples.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.as_raw(), second.as_raw());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_near_equal_offsets_share_entry() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::default();

        cache.get(&source, Axis::Z, 0.3);
        cache.get(&source, Axis::Z, 0.3 + 5e-5);
        cache.get(&source, Axis::Z, 0.4);

        assert_eq!(source.samples.get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_axes_are_distinct_keys() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::default();
        for axis in Axis::ALL {
            cache.get(&source, axis, 0.0);
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(source.samples.get(), 3);
    }

    #[test]
    fn test_retain_all_never_evicts() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::new(CachePolicy::RetainAll);
        for i in 0..50 {
            cache.get(&source, Axis::X, i as f32 / 49.0);
        }
        assert_eq!(cache.len(), 50);
        for i in 0..50 {
            cache.get(&source, Axis::X, i as f32 / 49.0);
        }
        assert_eq!(source.samples.get(), 50);
    }

    #[test]
    fn test_bounded_evicts_least_recent() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::new(CachePolicy::Bounded { max_entries: 2 });

        cache.get(&source, Axis::Z, 0.0);
        cache.get(&source, Axis::Z, 0.5);
        cache.get(&source, Axis::Z, 0.0); // touch 0.0
        cache.get(&source, Axis::Z, 1.0); // evicts 0.5

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&PlaneDescriptor::for_axis(Axis::Z, 0.0)));
        assert!(!cache.contains(&PlaneDescriptor::for_axis(Axis::Z, 0.5)));
        assert!(cache.contains(&PlaneDescriptor::for_axis(Axis::Z, 1.0)));

        cache.set_policy(CachePolicy::Bounded { max_entries: 1 });
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_all_forces_resample() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::default();
        cache.get(&source, Axis::X, 0.25);
        cache.invalidate_all();
        assert!(cache.is_empty());
        cache.get(&source, Axis::X, 0.25);
        assert_eq!(source.samples.get(), 2);
    }

    #[test]
    fn test_oblique_plane_does_not_touch_cache() {
        let source = CountingSource::new(8, 6, 4);
        let mut cache = SliceCache::default();
        let plane = PlaneDescriptor::new(Vec3::new(1.0, 0.0, 1.0).normalize(), 0.5);
        assert!(matches!(
            cache.texture_for(&source, &plane),
            Err(StackscopeError::PlaneResolution { .. })
        ));
        assert_eq!(cache.misses(), 0);
        assert_eq!(source.samples.get(), 0);
    }
}
