use serde::de::DeserializeOwned;
use std::fs;

use crate::error::{SimError, SimResult};

/// load a yaml file and deserialize it into `T`
///
/// # Arguments
///
/// *  `file_path` - yaml file path (`.yaml` or `.yml`)
///
/// # Returns
///
/// *  the deserialized value, or a `ConfigLoad`/`ConfigParse`/`InvalidConfig` error
pub fn load_yaml<T: DeserializeOwned>(file_path: &str) -> SimResult<T> {
    if !file_path.ends_with(".yaml") && !file_path.ends_with(".yml") {
        return Err(SimError::InvalidConfig(format!(
            "Invalid file type: {}",
            file_path
        )));
    }
    let file_content = fs::read_to_string(file_path).map_err(|source| SimError::ConfigLoad {
        path: file_path.to_string(),
        source,
    })?;
    serde_yaml::from_str(&file_content).map_err(|source| SimError::ConfigParse {
        path: file_path.to_string(),
        source,
    })
}
