#![warn(clippy::all, rust_2018_idioms)]

pub mod cache;
pub mod config;
pub mod hex;
pub mod terrain;
pub mod world;

pub use config::{WorldConfig, WorldProfile, WorldSeeds};
pub use hex::Axial;
pub use world::World;
