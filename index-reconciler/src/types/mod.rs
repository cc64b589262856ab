pub mod index;
pub mod params;
