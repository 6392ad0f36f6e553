//! Heap growth providers.
//!
//! The allocator only asks for new memory when no free block can serve a
//! request. Growth is one-way: carved regions are never handed back.
//!
//! ```text
//!   Sbrk::grow(64):
//!
//!   before   ... ─────────┤ break (maybe unaligned)
//!   after    ... ─────────┤pad├──────── 64 bytes ────────┤ new break
//!                              ▲
//!                              └── returned block (word aligned)
//! ```

use std::{collections::TryReserveError, io, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};
use thiserror::Error;

use crate::align;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeapError {
  #[error("sbrk could not extend the program break by {requested} bytes (errno {errno})")]
  Sbrk { requested: usize, errno: i32 },
  #[error("heap region exhausted: {requested} bytes requested, {remaining} bytes left")]
  OutOfSpace { requested: usize, remaining: usize },
  #[error("cannot reserve a {bytes}-byte heap region: {source}")]
  Reserve {
    bytes: usize,
    #[source]
    source: TryReserveError,
  },
}

/// Source of fresh blocks.
pub trait HeapGrowth {
  /// Carves a new, exclusively owned region of at least `capacity` bytes.
  fn grow(
    &mut self,
    capacity: usize,
  ) -> Result<NonNull<u8>, HeapError>;
}

impl<H: HeapGrowth + ?Sized> HeapGrowth for Box<H> {
  fn grow(
    &mut self,
    capacity: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    (**self).grow(capacity)
  }
}

/// Current program break, as reported by `sbrk(0)`.
pub fn program_break() -> *mut u8 {
  unsafe { sbrk(0) as *mut u8 }
}

fn last_errno() -> i32 {
  io::Error::last_os_error().raw_os_error().unwrap_or(libc::ENOMEM)
}

/// Grows the process data segment with `sbrk(2)`.
///
/// Only one `Sbrk` should be driving the break at a time, and nothing else
/// in the process may shrink it.
#[derive(Debug, Default)]
pub struct Sbrk {
  grown: usize,
}

impl Sbrk {
  pub fn new() -> Self {
    Self::default()
  }

  /// Total bytes this provider has moved the break by, padding included.
  pub fn bytes_grown(&self) -> usize {
    self.grown
  }
}

impl HeapGrowth for Sbrk {
  fn grow(
    &mut self,
    capacity: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let exhausted = |errno| HeapError::Sbrk {
      requested: capacity,
      errno,
    };

    let current = program_break() as usize;
    let padding = align!(current) - current;
    let increment = padding
      .checked_add(capacity)
      .and_then(|total| intptr_t::try_from(total).ok())
      .ok_or(exhausted(libc::ENOMEM))?;

    let address = unsafe { sbrk(increment) };

    if address == usize::MAX as *mut c_void {
      return Err(exhausted(last_errno()));
    }

    self.grown += padding + capacity;

    let block = unsafe { (address as *mut u8).add(padding) };
    NonNull::new(block).ok_or(exhausted(libc::ENOMEM))
  }
}

/// Serves blocks from a fixed-size buffer owned by the provider.
///
/// Useful wherever a bounded, deterministic heap is wanted: tests, and the
/// driver's `--heap-limit` mode. Like `sbrk` memory, the region is handed
/// out uninitialized.
#[derive(Debug)]
pub struct BufferHeap {
  region: Vec<u8>,
  limit: usize,
  used: usize,
}

impl BufferHeap {
  /// Reserves a region of `bytes` bytes up front.
  ///
  /// Fails instead of aborting when the reservation cannot be made.
  pub fn with_capacity(bytes: usize) -> Result<Self, HeapError> {
    let mut region = Vec::new();
    region
      .try_reserve_exact(bytes)
      .map_err(|source| HeapError::Reserve { bytes, source })?;

    Ok(Self {
      region,
      limit: bytes,
      used: 0,
    })
  }

  pub fn used(&self) -> usize {
    self.used
  }

  pub fn remaining(&self) -> usize {
    self.limit - self.used
  }
}

impl HeapGrowth for BufferHeap {
  fn grow(
    &mut self,
    capacity: usize,
  ) -> Result<NonNull<u8>, HeapError> {
    let out_of_space = HeapError::OutOfSpace {
      requested: capacity,
      remaining: self.remaining(),
    };

    let base = self.region.as_mut_ptr();
    let start = align!(base as usize + self.used) - base as usize;
    let end = start
      .checked_add(capacity)
      .filter(|&end| end <= self.limit)
      .ok_or(out_of_space.clone())?;

    self.used = end;

    NonNull::new(base.wrapping_add(start)).ok_or(out_of_space)
  }
}
