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

//! Wrap-around writer over a fixed-capacity [`LogStore`].

use crate::error::DiagnosticsError;
use crate::store::LogStore;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// A window of the log claimed by one writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Where the window starts.
    pub offset: usize,
    /// Bytes available before the end of the region.
    pub contiguous: usize,
    /// Total bytes claimed. Anything past `contiguous` goes to offset 0.
    pub len: usize,
}

impl Reservation {
    /// Returns `true` if the window wraps around the end of the region.
    pub fn wraps(&self) -> bool {
        self.len > self.contiguous
    }
}

/// Fixed-size log where new records overwrite the oldest bytes.
///
/// Writers claim their window under a short lock on the cursor and copy
/// their bytes afterwards, so concurrent writers never block each other on
/// I/O. Writes never fail from the caller's point of view: errors are
/// returned for inspection but the listener discards them.
pub struct CircularLog {
    store: Box<dyn LogStore>,
    capacity: usize,
    cursor: Mutex<usize>,
    closed: AtomicBool,
}

impl CircularLog {
    /// Wraps a store. The store must have a non-zero capacity.
    pub fn new(store: Box<dyn LogStore>) -> Result<Self, DiagnosticsError> {
        let capacity = store.capacity();
        if capacity == 0 {
            return Err(DiagnosticsError::InvalidCapacity(capacity));
        }
        Ok(Self {
            store,
            capacity,
            cursor: Mutex::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Size of the region.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Offset the next reservation starts at.
    pub fn position(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `count` bytes and advances the cursor, wrapping to 0.
    ///
    /// Requests larger than the region are clamped to its capacity. Returns
    /// `None` once the log is closed.
    pub fn reserve(&self, count: usize) -> Option<Reservation> {
        if self.is_closed() {
            return None;
        }
        let len = count.min(self.capacity);
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let offset = *cursor;
        *cursor = (offset + len) % self.capacity;
        Some(Reservation {
            offset,
            contiguous: len.min(self.capacity - offset),
            len,
        })
    }

    /// Appends `bytes`, splitting the copy when it crosses the end of the
    /// region.
    pub fn write(&self, bytes: &[u8]) -> io::Result<()> {
        let Some(window) = self.reserve(bytes.len()) else {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "log is closed"));
        };
        let bytes = &bytes[..window.len];
        self.store
            .write_at(window.offset, &bytes[..window.contiguous])?;
        if window.wraps() {
            self.store.write_at(0, &bytes[window.contiguous..])?;
        }
        Ok(())
    }

    /// Releases the store. Only the first call has an effect; returns whether
    /// this call performed the release.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.store.close();
        true
    }

    /// Returns `true` once closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for CircularLog {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for CircularLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircularLog")
            .field("capacity", &self.capacity)
            .field("position", &self.position())
            .field("closed", &self.is_closed())
            .finish()
    }
}
