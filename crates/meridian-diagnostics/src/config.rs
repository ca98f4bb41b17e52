// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Self-diagnostics configuration file.

use crate::error::DiagnosticsError;
use meridian_core::EventLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Smallest log file, in KiB.
pub const MIN_FILE_SIZE_KIB: u64 = 1024;
/// Largest log file, in KiB.
pub const MAX_FILE_SIZE_KIB: u64 = 128 * 1024;

/// Where and how much the self-diagnostics listener logs.
///
/// ```json
/// { "LogDirectory": ".", "FileSize": 1024, "LogLevel": "Error" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelfDiagnosticsConfig {
    /// Directory the log file is created in.
    pub log_directory: PathBuf,
    /// Log file size in KiB, clamped to `[1024, 131072]`.
    pub file_size: u64,
    /// Most verbose level captured, by name.
    pub log_level: String,
}

impl Default for SelfDiagnosticsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("."),
            file_size: MIN_FILE_SIZE_KIB,
            log_level: EventLevel::Error.name().to_string(),
        }
    }
}

impl SelfDiagnosticsConfig {
    /// Parses a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self, DiagnosticsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DiagnosticsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The log file size in bytes, after clamping.
    pub fn log_file_size(&self) -> usize {
        let kib = self.file_size.clamp(MIN_FILE_SIZE_KIB, MAX_FILE_SIZE_KIB);
        (kib * 1024) as usize
    }

    /// The configured level.
    pub fn level(&self) -> Result<EventLevel, DiagnosticsError> {
        EventLevel::from_name(&self.log_level)
            .ok_or_else(|| DiagnosticsError::InvalidLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pascal_case_keys() {
        let config = SelfDiagnosticsConfig::from_json(
            r#"{ "LogDirectory": "/var/log/app", "FileSize": 2048, "LogLevel": "warning" }"#,
        )
        .unwrap();
        assert_eq!(config.log_directory, PathBuf::from("/var/log/app"));
        assert_eq!(config.log_file_size(), 2048 * 1024);
        assert_eq!(config.level().unwrap(), EventLevel::Warning);
    }

    #[test]
    fn test_file_size_is_clamped() {
        let mut config = SelfDiagnosticsConfig {
            file_size: 1,
            ..Default::default()
        };
        assert_eq!(config.log_file_size(), 1024 * 1024);
        config.file_size = u64::MAX;
        assert_eq!(config.log_file_size(), 128 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_level_is_an_error() {
        let config = SelfDiagnosticsConfig {
            log_level: "Chatty".into(),
            ..Default::default()
        };
        assert!(matches!(
            config.level(),
            Err(DiagnosticsError::InvalidLevel(name)) if name == "Chatty"
        ));
    }

    #[test]
    fn test_missing_keys_are_rejected() {
        assert!(matches!(
            SelfDiagnosticsConfig::from_json(r#"{ "LogDirectory": "." }"#),
            Err(DiagnosticsError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagnostics.json");
        std::fs::write(
            &path,
            r#"{ "LogDirectory": ".", "FileSize": 1024, "LogLevel": "Error" }"#,
        )
        .unwrap();
        assert_eq!(
            SelfDiagnosticsConfig::from_file(&path).unwrap(),
            SelfDiagnosticsConfig::default()
        );
    }
}
