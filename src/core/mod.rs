pub mod fibonacci;
pub mod indicators;
pub mod pivots;
pub mod waves;
