pub mod rejection;
pub mod resume;
pub mod score;
