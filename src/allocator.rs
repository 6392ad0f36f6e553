use std::ptr::NonNull;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
  block::{BlockId, BlockRecord},
  diagnostics::BlockListing,
  heap::{HeapError, HeapGrowth, Sbrk},
  registry::{List, Registry, RegistryError},
  size_class,
  strategy::{FreeView, PlacementStrategy, Strategy},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocError {
  #[error("requested {requested} units, but the largest size class is {max}")]
  SizeTooLarge { requested: usize, max: usize },
  #[error("failed to grow the heap: {0}")]
  HeapExhausted(#[from] HeapError),
  #[error("attempting to release invalid block {address:#x}")]
  InvalidReleaseTarget { address: usize },
  #[error("block registry is inconsistent: {0}")]
  Registry(#[from] RegistryError),
  #[error("{strategy} picked block {block} of capacity {capacity} for a {needed}-unit class")]
  UnfitBlock {
    strategy: &'static str,
    block: BlockId,
    capacity: usize,
    needed: usize,
  },
}

impl AllocError {
  /// Whether the allocator can no longer be trusted after this error.
  ///
  /// Only an oversized request is recoverable. Every other error means the
  /// heap is exhausted, the caller broke the release contract or a strategy
  /// broke the search contract, and the process is expected to terminate.
  pub fn is_fatal(&self) -> bool {
    !matches!(self, AllocError::SizeTooLarge { .. })
  }
}

/// Outcome of a successful [`Allocator::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
  /// The block moved to the free list.
  Block(BlockId),
  /// Nothing was allocated, so nothing happened.
  NothingAllocated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocStats {
  /// Successful `allocate` calls.
  pub allocations: u64,
  /// Allocations served from the free list.
  pub reused: u64,
  /// Allocations that had to grow the heap.
  pub heap_growths: u64,
  /// Sum of the capacities carved by heap growth.
  pub bytes_grown: usize,
  /// Blocks moved back to the free list.
  pub releases: u64,
}

/// Size-class allocator with a pluggable placement strategy.
///
/// Blocks are tracked in two lists. `allocate` first asks the strategy for
/// a reusable free block and only grows the heap when there is none;
/// `release` moves a block back to the free list. Memory is never returned
/// to the heap provider.
pub struct Allocator<S = Box<dyn PlacementStrategy>, H = Sbrk> {
  registry: Registry,
  strategy: S,
  heap: H,
  stats: AllocStats,
}

impl Allocator {
  /// An `sbrk`-backed allocator using the selected strategy.
  pub fn with_strategy(strategy: Strategy) -> Self {
    Self::new(strategy.boxed(), Sbrk::new())
  }
}

impl<S: PlacementStrategy, H: HeapGrowth> Allocator<S, H> {
  pub fn new(
    strategy: S,
    heap: H,
  ) -> Self {
    Self {
      registry: Registry::new(),
      strategy,
      heap,
      stats: AllocStats::default(),
    }
  }

  /// Hands out a block able to hold `requested_size` units.
  pub fn allocate(
    &mut self,
    requested_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    let capacity = size_class::normalize(requested_size).ok_or(AllocError::SizeTooLarge {
      requested: requested_size,
      max: size_class::MAX_CLASS,
    })?;

    if let Some(id) = self.strategy.search(FreeView::new(&self.registry), capacity) {
      let found = self.registry.get(id).ok_or(RegistryError::UnknownBlock(id))?.capacity;
      if found < capacity {
        error!(
          strategy = self.strategy.name(),
          block = %id,
          capacity = found,
          needed = capacity,
          "strategy picked a block that is too small"
        );
        return Err(AllocError::UnfitBlock {
          strategy: self.strategy.name(),
          block: id,
          capacity: found,
          needed: capacity,
        });
      }
      return self.reuse(id, requested_size);
    }

    let address = self.heap.grow(capacity).inspect_err(|err| {
      error!(capacity, requested = requested_size, %err, "heap growth failed");
    })?;

    debug_assert!(
      self.registry.find_by_address(List::Allocated, address).is_none()
        && self.registry.find_by_address(List::Free, address).is_none(),
      "heap growth returned an address that is already tracked"
    );

    let id = self
      .registry
      .insert_new(BlockRecord::new(capacity, requested_size, address), List::Allocated);

    self.stats.allocations += 1;
    self.stats.heap_growths += 1;
    self.stats.bytes_grown += capacity;

    debug!(
      block = %id,
      capacity,
      requested = requested_size,
      address = ?address,
      "grew heap for new block"
    );

    Ok(address)
  }

  fn reuse(
    &mut self,
    id: BlockId,
    requested_size: usize,
  ) -> Result<NonNull<u8>, AllocError> {
    self.registry.transfer(id, List::Free, List::Allocated)?;

    let record = self.registry.get_mut(id).ok_or(RegistryError::UnknownBlock(id))?;
    record.requested_size = requested_size;
    let (capacity, address) = (record.capacity, record.address);

    self.stats.allocations += 1;
    self.stats.reused += 1;

    debug!(
      strategy = self.strategy.name(),
      block = %id,
      capacity,
      requested = requested_size,
      address = ?address,
      "reused free block"
    );

    Ok(address)
  }

  /// Moves a block back to the free list.
  ///
  /// `None` releases the most recently allocated block. `Some(address)`
  /// releases the block that starts at `address`; an address that is not
  /// currently allocated is a fatal [`AllocError::InvalidReleaseTarget`],
  /// returned before anything is modified.
  pub fn release(
    &mut self,
    target: Option<NonNull<u8>>,
  ) -> Result<Released, AllocError> {
    let Some(head) = self.registry.head_of(List::Allocated) else {
      warn!("no allocated memory to free");
      return Ok(Released::NothingAllocated);
    };

    let id = match target {
      None => head,
      Some(address) => self
        .registry
        .find_by_address(List::Allocated, address)
        .ok_or_else(|| {
          error!(address = ?address, "attempting to release invalid block");
          AllocError::InvalidReleaseTarget {
            address: address.as_ptr() as usize,
          }
        })?,
    };

    self.registry.transfer(id, List::Allocated, List::Free)?;

    let record = self.registry.get_mut(id).ok_or(RegistryError::UnknownBlock(id))?;
    record.requested_size = 0;

    self.stats.releases += 1;

    debug!(
      block = %id,
      capacity = record.capacity,
      address = ?record.address,
      "released block"
    );

    Ok(Released::Block(id))
  }

  pub fn registry(&self) -> &Registry {
    &self.registry
  }

  pub fn strategy_name(&self) -> &'static str {
    self.strategy.name()
  }

  pub fn stats(&self) -> AllocStats {
    self.stats
  }

  pub fn heap(&self) -> &H {
    &self.heap
  }

  /// Human-readable listing of one of the block lists.
  pub fn listing(
    &self,
    list: List,
  ) -> BlockListing<'_> {
    BlockListing::new(&self.registry, list)
  }
}
