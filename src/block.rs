use std::{fmt, ptr::NonNull};

/// Stable handle to a block record inside the registry.
///
/// Handles are minted once, when heap growth creates the record, and stay
/// valid for the whole life of the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub(crate) usize);

impl fmt::Display for BlockId {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Bookkeeping for one region of raw memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRecord {
  /// Size class the region was carved for.
  pub capacity: usize,
  /// Size the current owner asked for. Zero while the block is free.
  pub requested_size: usize,
  /// Start of the region.
  pub address: NonNull<u8>,
}

impl BlockRecord {
  pub fn new(
    capacity: usize,
    requested_size: usize,
    address: NonNull<u8>,
  ) -> Self {
    Self {
      capacity,
      requested_size,
      address,
    }
  }
}
