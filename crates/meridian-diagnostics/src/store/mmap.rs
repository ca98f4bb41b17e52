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

use super::{check_range, closed_error, LogStore};
use crate::error::DiagnosticsError;
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// A log file of fixed size mapped into memory.
///
/// Writes land in the page cache and reach the file when the OS flushes the
/// mapping or on [`close`](LogStore::close).
#[derive(Debug)]
pub struct MmapLogStore {
    path: PathBuf,
    capacity: usize,
    map: Mutex<Option<MmapMut>>,
}

impl MmapLogStore {
    /// Creates (or truncates) `path`, sizes it to `capacity` bytes and maps
    /// it.
    pub fn create(path: impl AsRef<Path>, capacity: usize) -> Result<Self, DiagnosticsError> {
        if capacity == 0 {
            return Err(DiagnosticsError::InvalidCapacity(capacity));
        }
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.set_len(capacity as u64)?;

        // SAFETY: the file was just created and sized by us; the mapping is
        // only accessed through the mutex below.
        let map = unsafe { MmapMut::map_mut(&file)? };
        log::debug!(
            "Mapped self-diagnostics log '{}' ({} bytes).",
            path.display(),
            capacity
        );

        Ok(Self {
            path,
            capacity,
            map: Mutex::new(Some(map)),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once the mapping has been released.
    pub fn is_closed(&self) -> bool {
        self.map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl LogStore for MmapLogStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn write_at(&self, offset: usize, bytes: &[u8]) -> io::Result<()> {
        check_range(self.capacity, offset, bytes.len())?;
        let mut guard = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        let map = guard.as_mut().ok_or_else(closed_error)?;
        map[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn close(&self) {
        let map = self
            .map
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(map) = map {
            if let Err(e) = map.flush() {
                log::warn!(
                    "Failed to flush self-diagnostics log '{}': {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

impl Drop for MmapLogStore {
    fn drop(&mut self) {
        self.close();
    }
}
