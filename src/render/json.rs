use serde::Serialize;

use crate::error::RxVerifyError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, RxVerifyError> {
    Ok(serde_json::to_string_pretty(value)?)
}
