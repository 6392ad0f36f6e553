//! Block registry.
//!
//! Owns every block record ever created and threads each of them through
//! exactly one of two singly linked lists: allocated or free. Records live
//! in an arena and are addressed by [`BlockId`]; the lists are chains of
//! ids, newest at the head.
//!
//! ```text
//!   arena:     [ #0 ] [ #1 ] [ #2 ] [ #3 ]
//!
//!   allocated: head -> #3 -> #0 -> end
//!   free:      head -> #2 -> #1 -> end
//! ```
//!
//! Callers outside the allocator only walk the lists through the cursor
//! contract of [`Registry::iterate`].

use std::{fmt, ptr::NonNull};

use thiserror::Error;

use crate::block::{BlockId, BlockRecord};

/// Selects one of the two collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum List {
  Allocated,
  Free,
}

impl fmt::Display for List {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(match self {
      List::Allocated => "allocated",
      List::Free => "free",
    })
  }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
  #[error("block {id} is not a member of the {list} list")]
  NotAMember { id: BlockId, list: List },
  #[error("block {id} is already a member of the {list} list")]
  AlreadyMember { id: BlockId, list: List },
  #[error("unknown block {0}")]
  UnknownBlock(BlockId),
}

struct Slot {
  record: BlockRecord,
  list: Option<List>,
  next: Option<BlockId>,
}

#[derive(Default)]
struct Head {
  first: Option<BlockId>,
  len: usize,
}

#[derive(Default)]
pub struct Registry {
  slots: Vec<Slot>,
  allocated: Head,
  free: Head,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  fn head(
    &self,
    list: List,
  ) -> &Head {
    match list {
      List::Allocated => &self.allocated,
      List::Free => &self.free,
    }
  }

  fn head_mut(
    &mut self,
    list: List,
  ) -> &mut Head {
    match list {
      List::Allocated => &mut self.allocated,
      List::Free => &mut self.free,
    }
  }

  fn slot(
    &self,
    id: BlockId,
  ) -> Result<&Slot, RegistryError> {
    self.slots.get(id.0).ok_or(RegistryError::UnknownBlock(id))
  }

  /// Adds a brand-new record at the head of `list` and returns its handle.
  pub fn insert_new(
    &mut self,
    record: BlockRecord,
    list: List,
  ) -> BlockId {
    let id = BlockId(self.slots.len());
    self.slots.push(Slot {
      record,
      list: None,
      next: None,
    });
    self.link(id, list);
    id
  }

  /// Puts a detached record back at the head of `list`.
  pub fn insert(
    &mut self,
    id: BlockId,
    list: List,
  ) -> Result<(), RegistryError> {
    if let Some(current) = self.slot(id)?.list {
      return Err(RegistryError::AlreadyMember { id, list: current });
    }
    self.link(id, list);
    Ok(())
  }

  fn link(
    &mut self,
    id: BlockId,
    list: List,
  ) {
    let head = self.head_mut(list);
    head.len += 1;
    let first = head.first.replace(id);

    let slot = &mut self.slots[id.0];
    slot.next = first;
    slot.list = Some(list);
  }

  /// Detaches `id` from `list`.
  ///
  /// Fails if `id` is not currently a member of `list`; nothing is changed
  /// in that case.
  pub fn remove(
    &mut self,
    id: BlockId,
    list: List,
  ) -> Result<(), RegistryError> {
    let slot = self.slot(id)?;
    if slot.list != Some(list) {
      return Err(RegistryError::NotAMember { id, list });
    }
    let next = slot.next;

    let mut prev = None;
    let mut cursor = self.head(list).first;
    while let Some(current) = cursor {
      if current == id {
        break;
      }
      prev = Some(current);
      cursor = self.slots[current.0].next;
    }
    // The membership tag says yes but the chain says no.
    if cursor.is_none() {
      return Err(RegistryError::NotAMember { id, list });
    }

    match prev {
      None => self.head_mut(list).first = next,
      Some(prev) => self.slots[prev.0].next = next,
    }
    self.head_mut(list).len -= 1;

    let slot = &mut self.slots[id.0];
    slot.next = None;
    slot.list = None;
    Ok(())
  }

  /// Moves `id` from the `from` list to the head of the `to` list.
  pub fn transfer(
    &mut self,
    id: BlockId,
    from: List,
    to: List,
  ) -> Result<(), RegistryError> {
    self.remove(id, from)?;
    self.link(id, to);
    Ok(())
  }

  /// Returns the record following `cursor` in `list`.
  ///
  /// A `None` cursor yields the head of the list. The walk ends with `None`
  /// after the last record, or straight away if `cursor` is not a member of
  /// `list`.
  pub fn iterate(
    &self,
    list: List,
    cursor: Option<BlockId>,
  ) -> Option<BlockId> {
    match cursor {
      None => self.head(list).first,
      Some(id) => {
        let slot = self.slots.get(id.0)?;
        if slot.list != Some(list) {
          return None;
        }
        slot.next
      }
    }
  }

  /// Walks `list` from head to tail.
  pub fn iter(
    &self,
    list: List,
  ) -> Iter<'_> {
    Iter {
      registry: self,
      list,
      cursor: self.iterate(list, None),
    }
  }

  pub fn get(
    &self,
    id: BlockId,
  ) -> Option<&BlockRecord> {
    self.slots.get(id.0).map(|slot| &slot.record)
  }

  pub(crate) fn get_mut(
    &mut self,
    id: BlockId,
  ) -> Option<&mut BlockRecord> {
    self.slots.get_mut(id.0).map(|slot| &mut slot.record)
  }

  /// The list `id` currently belongs to.
  pub fn list_of(
    &self,
    id: BlockId,
  ) -> Option<List> {
    self.slots.get(id.0).and_then(|slot| slot.list)
  }

  pub fn contains(
    &self,
    id: BlockId,
    list: List,
  ) -> bool {
    self.list_of(id) == Some(list)
  }

  pub fn head_of(
    &self,
    list: List,
  ) -> Option<BlockId> {
    self.head(list).first
  }

  pub fn len(
    &self,
    list: List,
  ) -> usize {
    self.head(list).len
  }

  pub fn is_empty(
    &self,
    list: List,
  ) -> bool {
    self.head(list).first.is_none()
  }

  /// Number of records ever created, across both lists.
  pub fn block_count(&self) -> usize {
    self.slots.len()
  }

  /// Scans `list` for the record owning `address`.
  pub fn find_by_address(
    &self,
    list: List,
    address: NonNull<u8>,
  ) -> Option<BlockId> {
    self
      .iter(list)
      .find(|&id| self.get(id).is_some_and(|record| record.address == address))
  }
}

/// Iterator over the handles of one list, head first.
pub struct Iter<'a> {
  registry: &'a Registry,
  list: List,
  cursor: Option<BlockId>,
}

impl Iterator for Iter<'_> {
  type Item = BlockId;

  fn next(&mut self) -> Option<BlockId> {
    let current = self.cursor?;
    self.cursor = self.registry.iterate(self.list, Some(current));
    Some(current)
  }
}
