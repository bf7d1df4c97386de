// src/utils/mod.rs
pub mod clock;
pub mod crypto;
pub mod serialization;
pub mod validation;
