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

use anyhow::Result;
use meridian_core::event::EventSourceRegistry;
use meridian_core::SdkEventSource;
use meridian_diagnostics::{
    CircularLog, LogStore, MmapLogStore, SelfDiagnostics, SelfDiagnosticsConfig,
};
use std::sync::Arc;

#[test]
fn wrapped_record_is_split_across_the_file_end() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("wrap.log");
    let log = CircularLog::new(Box::new(MmapLogStore::create(&path, 16)?))?;

    log.write(b"0123456789AB")?;
    log.write(b"cdefgh")?;
    assert_eq!(log.position(), 2);
    assert!(log.close());

    let bytes = std::fs::read(&path)?;
    assert_eq!(&bytes[..], b"gh23456789ABcdef");
    Ok(())
}

#[test]
fn store_tolerates_writes_after_close() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = Arc::new(MmapLogStore::create(dir.path().join("closed.log"), 32)?);
    let log = CircularLog::new(Box::new(store.clone()))?;

    // The store is released behind the log's back.
    store.close();
    assert!(log.write(b"late").is_err());
    assert!(!log.is_closed());
    Ok(())
}

#[test]
fn configured_listener_writes_sdk_events_to_file() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir()?;
    let config = SelfDiagnosticsConfig::from_json(&format!(
        r#"{{ "LogDirectory": {}, "FileSize": 1024, "LogLevel": "Warning" }}"#,
        serde_json::to_string(&dir.path().join("logs"))?
    ))?;

    let registry = EventSourceRegistry::new();
    let sdk = SdkEventSource::new(&registry, "Meridian-Metrics");
    let diagnostics = SelfDiagnostics::from_config(&config, registry.clone())?;
    assert!(diagnostics.listener().is_active());
    assert_eq!(diagnostics.listener().log().capacity(), 1024 * 1024);

    sdk.export_failed(12, true);
    sdk.worker_started(std::time::Duration::from_secs(5));
    let path = diagnostics.path().to_path_buf();
    assert!(diagnostics.dispose());

    let content = std::fs::read(&path)?;
    assert_eq!(content.len(), 1024 * 1024);
    let text = String::from_utf8_lossy(&content);
    let text = text.trim_end_matches('\0');

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(":Exporter rejected a batch{12}{true}"));
    // `YYYY-MM-DDTHH:MM:SS.fffffffZ`
    assert_eq!(lines[0].find(':'), Some(13));
    assert_eq!(&lines[0][19..20], ".");
    assert_eq!(&lines[0][27..28], "Z");
    Ok(())
}

#[test]
fn records_larger_than_the_remaining_tail_wrap_around() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = SelfDiagnosticsConfig {
        log_directory: dir.path().to_path_buf(),
        file_size: 1024,
        log_level: "Verbose".to_string(),
    };
    let registry = EventSourceRegistry::new();
    let diagnostics = SelfDiagnostics::from_config(&config, registry)?;
    let listener = diagnostics.listener();
    let capacity = listener.log().capacity();

    let long = "x".repeat(10_000);
    let mut written = 0;
    while written <= capacity {
        let before = listener.log().position();
        listener.write_event(&long, &[]);
        let after = listener.log().position();
        written += (after + capacity - before) % capacity;
    }

    assert!(listener.log().position() < capacity);
    assert!(diagnostics.dispose());
    Ok(())
}
