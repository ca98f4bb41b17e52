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
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A heap-backed store, used in tests and when no log directory is
/// configured.
#[derive(Debug)]
pub struct MemoryLogStore {
    bytes: Mutex<Vec<u8>>,
    closed: AtomicBool,
}

impl MemoryLogStore {
    /// Creates a zero-filled store of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: Mutex::new(vec![0; capacity]),
            closed: AtomicBool::new(false),
        }
    }

    /// Copy of the whole region.
    pub fn snapshot(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns `true` once closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl LogStore for MemoryLogStore {
    fn capacity(&self) -> usize {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn write_at(&self, offset: usize, bytes: &[u8]) -> io::Result<()> {
        if self.is_closed() {
            return Err(closed_error());
        }
        let mut region = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        check_range(region.len(), offset, bytes.len())?;
        region[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
