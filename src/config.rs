//! Central world configuration and coordinate canonicalization.

use serde::{Deserialize, Serialize};

use crate::hex::Axial;

/// Cache cap for worlds too large to keep fully resident per model.
const LARGE_WORLD_CACHE_CAP: usize = 200_000;

/// Named world-size profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldProfile {
    Dev,
    Target,
}

impl WorldProfile {
    pub fn size(self) -> (u32, u32) {
        match self {
            WorldProfile::Dev => (512, 256),
            WorldProfile::Target => (4000, 2000),
        }
    }
}

/// Seed bundle for the generation models. Climate and hydrology seeds are
/// derived from the terrain seed by convention so a world is reproducible
/// from a single integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSeeds {
    pub terrain: u64,
    pub climate: u64,
    pub hydrology: u64,
}

impl WorldSeeds {
    pub fn from_terrain(seed: u64) -> Self {
        Self {
            terrain: seed,
            climate: seed.wrapping_add(1),
            hydrology: seed.wrapping_add(3),
        }
    }
}

/// Canonical world dimensions and wrapping behavior. Constructed once at
/// startup, immutable afterward, shared by reference among all models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub profile: WorldProfile,
    pub width: u32,
    pub height: u32,
    pub wrap_x: bool,
    pub wrap_y: bool,
}

impl WorldConfig {
    pub fn new(profile: WorldProfile) -> Self {
        let (width, height) = profile.size();
        Self::with_size(profile, width, height)
    }

    /// Custom-size world under a profile's cache policy. Used by tests and
    /// embedding hosts that want small worlds.
    pub fn with_size(profile: WorldProfile, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "world dimensions must be positive");
        Self {
            profile,
            width,
            height,
            wrap_x: true,
            wrap_y: false,
        }
    }

    pub fn q_min(&self) -> i32 {
        -((self.width / 2) as i32)
    }

    pub fn q_max(&self) -> i32 {
        self.q_min() + self.width as i32 - 1
    }

    pub fn r_min(&self) -> i32 {
        -((self.height / 2) as i32)
    }

    pub fn r_max(&self) -> i32 {
        self.r_min() + self.height as i32 - 1
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_r_in_bounds(&self, r: i32) -> bool {
        r >= self.r_min() && r <= self.r_max()
    }

    /// Returns the canonical in-world coordinate, or `None` for rows outside
    /// the world (and, without x-wrap, columns outside the world). Any two
    /// x-translates by a multiple of `width` canonicalize identically.
    pub fn canonicalize(&self, q: i32, r: i32) -> Option<Axial> {
        if !self.is_r_in_bounds(r) {
            return None;
        }

        let q = if self.wrap_x {
            let folded =
                (i64::from(q) - i64::from(self.q_min())).rem_euclid(i64::from(self.width));
            (folded + i64::from(self.q_min())) as i32
        } else if q < self.q_min() || q > self.q_max() {
            return None;
        } else {
            q
        };

        Some(Axial::new(q, r))
    }

    /// Per-model cache capacity: full world residency for dev-sized worlds,
    /// a fixed cap for large ones.
    pub fn cache_capacity(&self) -> usize {
        match self.profile {
            WorldProfile::Dev => self.area(),
            WorldProfile::Target => LARGE_WORLD_CACHE_CAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_bounds_cover_width_and_height() {
        for config in [
            WorldConfig::new(WorldProfile::Dev),
            WorldConfig::with_size(WorldProfile::Dev, 7, 5),
        ] {
            assert_eq!(config.q_max() - config.q_min() + 1, config.width as i32);
            assert_eq!(config.r_max() - config.r_min() + 1, config.height as i32);
        }
    }

    #[test]
    fn canonicalize_folds_x_translates_to_same_hex() {
        let config = WorldConfig::with_size(WorldProfile::Dev, 8, 6);
        let base = config.canonicalize(2, 1).unwrap();
        for k in [-3i32, -1, 1, 2, 5] {
            let wrapped = config.canonicalize(2 + k * config.width as i32, 1).unwrap();
            assert_eq!(base, wrapped);
        }
    }

    #[test]
    fn out_of_bounds_rows_have_no_canonical_form() {
        let config = WorldConfig::with_size(WorldProfile::Dev, 8, 6);
        assert_eq!(config.canonicalize(0, config.r_max() + 1), None);
        assert_eq!(config.canonicalize(0, config.r_min() - 1), None);
    }

    #[test]
    fn unwrapped_x_rejects_out_of_bounds_columns() {
        let mut config = WorldConfig::with_size(WorldProfile::Dev, 8, 6);
        config.wrap_x = false;
        assert_eq!(config.canonicalize(config.q_max() + 1, 0), None);
        assert!(config.canonicalize(config.q_max(), 0).is_some());
    }

    #[test]
    fn seed_bundle_follows_convention() {
        let seeds = WorldSeeds::from_terrain(1337);
        assert_eq!(seeds.terrain, 1337);
        assert_eq!(seeds.climate, 1338);
        assert_eq!(seeds.hydrology, 1340);
    }

    #[test]
    fn dev_profile_caches_are_world_sized() {
        let config = WorldConfig::new(WorldProfile::Dev);
        assert_eq!(config.cache_capacity(), config.area());
        let large = WorldConfig::new(WorldProfile::Target);
        assert!(large.cache_capacity() < large.area());
    }
}
