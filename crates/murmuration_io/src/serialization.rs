//! JSON helpers with error handling.

use crate::error::{IoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializes data to compact JSON.
pub fn to_json<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Serializes data to pretty-printed JSON.
pub fn to_json_pretty<T>(data: &T) -> Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(data)
        .map_err(|e| IoError::serialization(format!("JSON serialization failed: {}", e)))
}

/// Deserializes data from a JSON string. Empty input is a validation error.
pub fn from_json<T>(json: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    if json.trim().is_empty() {
        return Err(IoError::validation("Empty JSON string"));
    }

    serde_json::from_str(json)
        .map_err(|e| IoError::serialization(format!("JSON deserialization failed: {}", e)))
}

/// Checks that a JSON string deserializes into `T`.
pub fn validate_json<T>(json: &str) -> Result<()>
where
    T: for<'de> Deserialize<'de>,
{
    let _: T = from_json(json)?;
    Ok(())
}

/// Writes pretty-printed JSON to `path`.
pub fn write_json_file<T, P>(data: &T, path: P) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let json = to_json_pretty(data)?;
    std::fs::write(&path, json).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("writing JSON to {:?}", path.as_ref()))
    })?;
    Ok(())
}

/// Reads and deserializes JSON from `path`.
pub fn read_json_file<T, P>(path: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let json = std::fs::read_to_string(&path).map_err(|e| {
        IoError::FileSystem(e).with_context(format!("reading JSON from {:?}", path.as_ref()))
    })?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmuration_data::InitialState;

    #[test]
    fn test_state_json_is_lossless() {
        let state = InitialState {
            indices: vec![0, 1],
            positions: vec![0.1, -1.0 / 3.0, 1e-17, 1.959_999_999_999_999_9, 0.0, -0.0],
            velocities: vec![0.3, 0.2, 0.1, f64::MIN_POSITIVE, 2.0_f64.sqrt(), 0.7],
        };

        let json = to_json(&state).unwrap();
        let restored: InitialState = from_json(&json).unwrap();
        assert_eq!(state, restored);
    }

    #[test]
    fn test_empty_json_fails() {
        let result: Result<InitialState> = from_json("  ");
        assert!(matches!(result, Err(IoError::Validation(_))));
    }

    #[test]
    fn test_invalid_json_fails() {
        let result: Result<InitialState> = from_json("{ invalid json");
        assert!(matches!(result, Err(IoError::Serialization(_))));
    }

    #[test]
    fn test_validate_json_reports_missing_array() {
        let missing = r#"{"indices":[0],"positions":[0.0,0.0,0.0]}"#;
        assert!(validate_json::<InitialState>(missing).is_err());

        let complete = r#"{"indices":[0],"positions":[0.0,0.0,0.0],"velocities":[1.0,0.0,0.0]}"#;
        assert!(validate_json::<InitialState>(complete).is_ok());
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "murmuration_io_state_{}.json",
            std::process::id()
        ));
        let state = InitialState {
            indices: vec![1, 0],
            positions: vec![0.5, 0.25, -0.5, -0.25],
            velocities: vec![0.3, 0.0, 0.0, -0.3],
        };
        write_json_file(&state, &path).unwrap();
        let restored: InitialState = read_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_missing_file_has_context() {
        let path = std::env::temp_dir().join("murmuration_io_missing_file.json");
        let _ = std::fs::remove_file(&path);
        let err = read_json_file::<InitialState, _>(&path).unwrap_err();
        assert!(err.to_string().contains("reading JSON"));
        assert!(matches!(err.root(), IoError::FileSystem(_)));
    }
}
