pub mod anchor;
pub mod lifecycle;
pub mod repository;
pub mod sequence;
pub mod types;
pub mod window;
