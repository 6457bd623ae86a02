//! Terrain generation models.

pub mod climate;
pub mod erosion;
pub mod heightfield;
pub mod hydrology;
mod noise;
pub mod tectonics;

pub use climate::*;
pub use erosion::*;
pub use heightfield::*;
pub use hydrology::*;
pub use tectonics::*;

use crate::hex::Axial;

/// Elevation source seen by the models downstream of height synthesis.
/// Implementations must answer for any coordinate, wrapped or not.
pub trait TerrainSampler {
    fn height_at(&self, q: i32, r: i32) -> f64;
    fn is_ocean_at(&self, q: i32, r: i32) -> bool;
}

/// River network seen by erosion and map consumers.
pub trait RiverSampler {
    fn river_strength_at(&self, q: i32, r: i32) -> u32;
    fn flow_target_at(&self, q: i32, r: i32) -> Option<Axial>;
}
