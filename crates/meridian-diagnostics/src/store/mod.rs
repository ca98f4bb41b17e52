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

//! Fixed-capacity byte sinks backing the circular log.

mod memory;
mod mmap;

pub use memory::MemoryLogStore;
pub use mmap::MmapLogStore;

use std::io;
use std::sync::Arc;

/// A fixed-capacity, randomly addressable byte region.
///
/// Implementations must tolerate writes after [`close`](LogStore::close) by
/// returning an error.
pub trait LogStore: Send + Sync + 'static {
    /// Size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Copies `bytes` to `offset`. The range must lie inside the region.
    fn write_at(&self, offset: usize, bytes: &[u8]) -> io::Result<()>;

    /// Flushes and releases the region.
    fn close(&self) {}
}

impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn write_at(&self, offset: usize, bytes: &[u8]) -> io::Result<()> {
        (**self).write_at(offset, bytes)
    }

    fn close(&self) {
        (**self).close()
    }
}

pub(crate) fn check_range(capacity: usize, offset: usize, len: usize) -> io::Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("write of {len} bytes at {offset} exceeds capacity {capacity}"),
        )),
    }
}

pub(crate) fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "log store is closed")
}
