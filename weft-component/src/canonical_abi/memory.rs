// Copyright (c) 2025 The Weft Project Developers
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Memory and allocation capabilities.
//!
//! The transcoder never owns a linear memory; the host hands one in
//! through [`Memory`], and lowering allocates through [`Realloc`] with
//! component-model semantics (`old_ptr = 0, old_size = 0` allocates,
//! `new_size = 0` frees, 0 return means failure).

use crate::prelude::*;

fn read_bounds_error(addr: u32, len: u32) -> Error {
    Error::lift(ErrorKind::Bounds, format!("memory read of {} bytes at {:#x} out of range", len, addr))
}

fn write_bounds_error(addr: u32, len: usize) -> Error {
    Error::lower(ErrorKind::Bounds, format!("memory write of {} bytes at {:#x} out of range", len, addr))
}

/// Read/write access to one linear memory. All addresses are u32;
/// out-of-range access fails with a bounds error.
pub trait Memory {
    /// Read `len` bytes at `addr`.
    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>>;

    /// Write bytes at `addr`.
    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<()>;

    /// Memory size in bytes.
    fn size(&self) -> u32;

    /// Read one byte.
    fn read_u8(&self, addr: u32) -> Result<u8> {
        let bytes = self.read(addr, 1)?;
        Ok(bytes[0])
    }

    /// Read a little-endian u16.
    fn read_u16(&self, addr: u32) -> Result<u16> {
        let bytes = self.read(addr, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a little-endian u32.
    fn read_u32(&self, addr: u32) -> Result<u32> {
        let bytes = self.read(addr, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian u64.
    fn read_u64(&self, addr: u32) -> Result<u64> {
        let bytes = self.read(addr, 8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Write one byte.
    fn write_u8(&mut self, addr: u32, value: u8) -> Result<()> {
        self.write(addr, &[value])
    }

    /// Write a little-endian u16.
    fn write_u16(&mut self, addr: u32, value: u16) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Write a little-endian u32.
    fn write_u32(&mut self, addr: u32, value: u32) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Write a little-endian u64.
    fn write_u64(&mut self, addr: u32, value: u64) -> Result<()> {
        self.write(addr, &value.to_le_bytes())
    }
}

/// Guest-side allocation with component-model realloc semantics.
pub trait Realloc {
    /// `realloc(old_ptr, old_size, align, new_size)`; returns 0 on
    /// failure.
    fn realloc(&mut self, old_ptr: u32, old_size: u32, align: u32, new_size: u32) -> Result<u32>;
}

/// A plain byte-vector memory, used in tests and by embedders that manage
/// memory themselves.
#[derive(Debug, Clone)]
pub struct SimpleMemory {
    data: Vec<u8>,
}

impl SimpleMemory {
    /// Create a zeroed memory of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self { data: vec![0; size] }
    }

    /// Borrow the underlying bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutably borrow the underlying bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Memory for SimpleMemory {
    fn read(&self, addr: u32, len: u32) -> Result<Vec<u8>> {
        let start = addr as usize;
        let end = start.checked_add(len as usize).ok_or_else(|| read_bounds_error(addr, len))?;
        if end > self.data.len() {
            return Err(read_bounds_error(addr, len));
        }
        Ok(self.data[start..end].to_vec())
    }

    fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<()> {
        let start = addr as usize;
        let end = start
            .checked_add(bytes.len())
            .ok_or_else(|| write_bounds_error(addr, bytes.len()))?;
        if end > self.data.len() {
            return Err(write_bounds_error(addr, bytes.len()));
        }
        self.data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

/// A bump-pointer allocator over some memory region; never reuses freed
/// space. Good enough for tests and one-shot lowering arenas.
#[derive(Debug, Clone)]
pub struct BumpAllocator {
    next: u32,
    limit: u32,
}

impl BumpAllocator {
    /// Allocate upwards from `start`, never past `limit`.
    pub fn new(start: u32, limit: u32) -> Self {
        Self { next: start, limit }
    }

    /// The next allocation offset.
    pub fn watermark(&self) -> u32 {
        self.next
    }
}

impl Realloc for BumpAllocator {
    fn realloc(&mut self, _old_ptr: u32, _old_size: u32, align: u32, new_size: u32) -> Result<u32> {
        if new_size == 0 {
            return Ok(0);
        }
        let align = align.max(1);
        let aligned = match self.next.checked_add(align - 1) {
            Some(v) => v / align * align,
            None => return Ok(0),
        };
        let end = match aligned.checked_add(new_size) {
            Some(v) => v,
            None => return Ok(0),
        };
        if end > self.limit {
            return Ok(0);
        }
        self.next = end;
        Ok(aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_memory_bounds_checks() {
        let mut memory = SimpleMemory::new(8);
        memory.write_u32(0, 0xAABBCCDD).unwrap();
        assert_eq!(memory.read_u32(0).unwrap(), 0xAABBCCDD);
        assert_eq!(memory.read_u8(3).unwrap(), 0xAA);

        assert!(memory.read(5, 4).is_err());
        assert!(memory.write(7, &[0, 0]).is_err());
        assert!(memory.read(u32::MAX, 2).is_err());
    }

    #[test]
    fn bump_allocator_aligns_and_fails_with_zero() {
        let mut alloc = BumpAllocator::new(1, 64);
        let a = alloc.realloc(0, 0, 4, 8).unwrap();
        assert_eq!(a, 4);
        let b = alloc.realloc(0, 0, 8, 8).unwrap();
        assert_eq!(b, 16);
        // Exhaustion returns 0, the component-model failure value.
        assert_eq!(alloc.realloc(0, 0, 1, 1000).unwrap(), 0);
        // Free is a no-op returning 0.
        assert_eq!(alloc.realloc(a, 8, 4, 0).unwrap(), 0);
    }
}
