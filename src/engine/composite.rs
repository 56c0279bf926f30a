//! Composite cache: the last confirmed overlay raster.
//!
//! Only confirm interactions write here, and every write replaces the whole
//! raster. Previews read the base and build their own copy.

use image::RgbaImage;

#[derive(Default, Debug)]
pub struct CompositeCache {
    confirmed: Option<RgbaImage>,
}

impl CompositeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The confirmed raster, or `None` when nothing has been confirmed.
    pub fn base(&self) -> Option<&RgbaImage> {
        self.confirmed.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_none()
    }

    pub fn commit(&mut self, raster: RgbaImage) {
        self.confirmed = Some(raster);
    }

    pub fn reset(&mut self) {
        self.confirmed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn starts_empty() {
        let cache = CompositeCache::new();
        assert!(cache.is_empty());
        assert!(cache.base().is_none());
    }

    #[test]
    fn commit_replaces_whole_raster() {
        let mut cache = CompositeCache::new();
        let mut a = RgbaImage::new(2, 2);
        a.put_pixel(0, 0, Rgba([1, 1, 1, 1]));
        cache.commit(a);
        let b = RgbaImage::new(2, 2);
        cache.commit(b.clone());
        assert_eq!(cache.base().map(|r| r.as_raw().clone()), Some(b.into_raw()));
    }

    #[test]
    fn reset_clears_and_is_repeatable() {
        let mut cache = CompositeCache::new();
        cache.commit(RgbaImage::new(1, 1));
        cache.reset();
        cache.reset();
        assert!(cache.is_empty());
    }
}
