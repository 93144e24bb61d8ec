//! Domain models and the terminology-backed workflows built on them.

pub mod drug;
pub mod interaction;
pub mod prescription;
pub mod term;
