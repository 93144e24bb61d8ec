#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod events;
pub mod gateway;
pub mod sources;
pub mod verifier;

mod render;
mod transform;
mod utils;

pub use config::Config;
pub use error::RxVerifyError;
pub use verifier::Verifier;
