//! Placement strategies.
//!
//! A strategy picks which free block serves a request. It sees the free
//! list only through [`FreeView`], which exposes the registry's cursor walk
//! and block capacities and nothing that could mutate the registry. The
//! allocator performs every list move after the search returns.

use std::fmt;

use crate::{
  block::BlockId,
  registry::{List, Registry},
};

/// Read-only window on the free list.
#[derive(Clone, Copy)]
pub struct FreeView<'a> {
  registry: &'a Registry,
}

impl<'a> FreeView<'a> {
  pub fn new(registry: &'a Registry) -> Self {
    Self { registry }
  }

  /// Free block after `cursor`, or the first one for a `None` cursor.
  pub fn next_after(
    &self,
    cursor: Option<BlockId>,
  ) -> Option<BlockId> {
    self.registry.iterate(List::Free, cursor)
  }

  pub fn capacity(
    &self,
    id: BlockId,
  ) -> Option<usize> {
    self.registry.get(id).map(|record| record.capacity)
  }

  /// Lazily walks the free list, yielding each block with its capacity.
  pub fn blocks(&self) -> FreeBlocks<'a> {
    FreeBlocks {
      view: *self,
      cursor: None,
      done: false,
    }
  }
}

pub struct FreeBlocks<'a> {
  view: FreeView<'a>,
  cursor: Option<BlockId>,
  done: bool,
}

impl Iterator for FreeBlocks<'_> {
  type Item = (BlockId, usize);

  fn next(&mut self) -> Option<Self::Item> {
    if self.done {
      return None;
    }
    while let Some(id) = self.view.next_after(self.cursor) {
      self.cursor = Some(id);
      // A handle without a record has nothing to offer; skip it.
      if let Some(capacity) = self.view.capacity(id) {
        return Some((id, capacity));
      }
    }
    self.done = true;
    None
  }
}

/// Chooses a free block for a normalized request size.
///
/// Implementations never fail: "nothing suitable" is `None`, and the
/// allocator falls back to growing the heap.
pub trait PlacementStrategy {
  fn name(&self) -> &'static str;

  fn search(
    &self,
    free: FreeView<'_>,
    size: usize,
  ) -> Option<BlockId>;
}

impl<S: PlacementStrategy + ?Sized> PlacementStrategy for Box<S> {
  fn name(&self) -> &'static str {
    (**self).name()
  }

  fn search(
    &self,
    free: FreeView<'_>,
    size: usize,
  ) -> Option<BlockId> {
    (**self).search(free, size)
  }
}

/// Takes the first free block, in list order, that is large enough.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl PlacementStrategy for FirstFit {
  fn name(&self) -> &'static str {
    "first-fit"
  }

  fn search(
    &self,
    free: FreeView<'_>,
    size: usize,
  ) -> Option<BlockId> {
    free
      .blocks()
      .find(|&(_, capacity)| capacity >= size)
      .map(|(id, _)| id)
  }
}

/// Takes the smallest free block that is large enough. Among equally small
/// blocks the one met first in list order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestFit;

impl PlacementStrategy for BestFit {
  fn name(&self) -> &'static str {
    "best-fit"
  }

  fn search(
    &self,
    free: FreeView<'_>,
    size: usize,
  ) -> Option<BlockId> {
    let mut best: Option<(BlockId, usize)> = None;

    for (id, capacity) in free.blocks() {
      if capacity < size {
        continue;
      }
      match best {
        Some((_, best_capacity)) if best_capacity <= capacity => {}
        _ => best = Some((id, capacity)),
      }
    }

    best.map(|(id, _)| id)
  }
}

/// Strategy selector for configuration surfaces such as the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
  #[default]
  FirstFit,
  BestFit,
}

impl Strategy {
  pub fn boxed(self) -> Box<dyn PlacementStrategy> {
    match self {
      Strategy::FirstFit => Box::new(FirstFit),
      Strategy::BestFit => Box::new(BestFit),
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(match self {
      Strategy::FirstFit => FirstFit.name(),
      Strategy::BestFit => BestFit.name(),
    })
  }
}
