//! Internal serde helpers.

pub(crate) mod serde;
