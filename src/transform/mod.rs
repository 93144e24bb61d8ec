//! Pure mapping from upstream payloads and completions to domain records.

pub(crate) mod candidate;
pub(crate) mod extraction;
pub(crate) mod interaction;
