pub mod entries;
pub mod seed;
