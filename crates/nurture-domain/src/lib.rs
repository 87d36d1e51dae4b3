//! Value types shared across the nurture services.
//!
//! This crate contains only pure types with no framework dependencies.
//! Import in `usecase/` and `domain/` layers; adapters convert at their boundary.

pub mod id;
pub mod locale;
pub mod recipient;
