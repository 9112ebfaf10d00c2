pub mod celebration;
pub mod confidence;
pub mod rewards;
pub mod xp;
