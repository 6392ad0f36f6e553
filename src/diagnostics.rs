//! Block listings for inspection.
//!
//! ```text
//!   [Alloc] address=0x5581e2a4f000, capacity=64, requested=40
//!   [Free]  address=0x5581e2a4f040, capacity=32, requested=0
//! ```

use std::fmt;

use crate::{
  block::BlockRecord,
  heap::program_break,
  registry::{List, Registry},
};

/// One line per block of a list, head first.
pub struct BlockListing<'a> {
  registry: &'a Registry,
  list: List,
}

impl<'a> BlockListing<'a> {
  pub fn new(
    registry: &'a Registry,
    list: List,
  ) -> Self {
    Self { registry, list }
  }

  pub fn lines(&self) -> Vec<String> {
    self.records().map(|record| BlockLine::new(self.list, record).to_string()).collect()
  }

  fn records(&self) -> impl Iterator<Item = &'a BlockRecord> + 'a {
    let registry = self.registry;
    registry.iter(self.list).filter_map(move |id| registry.get(id))
  }
}

impl fmt::Display for BlockListing<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for record in self.records() {
      writeln!(f, "{}", BlockLine::new(self.list, record))?;
    }
    Ok(())
  }
}

struct BlockLine<'a> {
  list: List,
  record: &'a BlockRecord,
}

impl<'a> BlockLine<'a> {
  fn new(
    list: List,
    record: &'a BlockRecord,
  ) -> Self {
    Self { list, record }
  }
}

impl fmt::Display for BlockLine<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    let tag = match self.list {
      List::Allocated => "[Alloc]",
      List::Free => "[Free] ",
    };
    write!(
      f,
      "{tag} address={:p}, capacity={}, requested={}",
      self.record.address, self.record.capacity, self.record.requested_size
    )
  }
}

/// Prints where the program break currently sits.
pub fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    program_break(),
  );
}
