use serde::{Deserialize, Serialize};

/// Numeric field that upstream APIs emit either as a JSON number or a string.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrNumber {
    #[default]
    None,
    Number(u64),
    Text(String),
}

impl StringOrNumber {
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Number(value) => u32::try_from(*value).ok(),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}
