//! Command scripts.
//!
//! A script is a list of lines, one command each:
//!
//! ```text
//!   # comment
//!   alloc:40     allocate 40 units
//!   dealloc      release the newest block still held by the script
//! ```
//!
//! The driver remembers the addresses it was handed in a stack of its own
//! and releases them newest first, by address.

use std::{
  fs,
  num::IntErrorKind,
  path::{Path, PathBuf},
  ptr::NonNull,
};

use thiserror::Error;
use tracing::info;

use crate::{
  allocator::{AllocError, Allocator, Released},
  heap::{HeapError, HeapGrowth},
  size_class,
  strategy::PlacementStrategy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Alloc(usize),
  Dealloc,
}

/// A command and the script line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
  pub line: usize,
  pub command: Command,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
  #[error("line {line}: invalid allocation size {value:?}")]
  InvalidSize { line: usize, value: String },
  #[error("line {line}: requested {value} units, but the largest size class is {max}")]
  SizeTooLarge { line: usize, value: String, max: usize },
  #[error("line {line}: unrecognised command {text:?}")]
  UnknownCommand { line: usize, text: String },
}

#[derive(Debug, Error)]
pub enum DriverError {
  #[error("cannot read script {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error(transparent)]
  Script(#[from] ScriptError),
  #[error("cannot set up the heap: {0}")]
  Heap(#[from] HeapError),
  #[error("line {line}: {source}")]
  Alloc {
    line: usize,
    #[source]
    source: AllocError,
  },
}

impl DriverError {
  pub fn is_fatal(&self) -> bool {
    matches!(self, DriverError::Alloc { source, .. } if source.is_fatal())
  }
}

fn parse_line(
  line: usize,
  text: &str,
) -> Result<Option<Command>, ScriptError> {
  let text = text.trim();

  if text.is_empty() || text.starts_with('#') {
    return Ok(None);
  }

  if let Some(value) = text.strip_prefix("alloc:") {
    let value = value.trim();
    return match value.parse() {
      Ok(size) => Ok(Some(Command::Alloc(size))),
      // Too many digits for a usize is still a well-formed size.
      Err(err) if *err.kind() == IntErrorKind::PosOverflow => Err(ScriptError::SizeTooLarge {
        line,
        value: value.to_string(),
        max: size_class::MAX_CLASS,
      }),
      Err(_) => Err(ScriptError::InvalidSize {
        line,
        value: value.to_string(),
      }),
    };
  }

  if text == "dealloc" {
    return Ok(Some(Command::Dealloc));
  }

  Err(ScriptError::UnknownCommand {
    line,
    text: text.to_string(),
  })
}

/// Parses a whole script, stopping at the first bad line.
pub fn parse_script(source: &str) -> Result<Vec<Step>, ScriptError> {
  let mut steps = Vec::new();

  for (index, text) in source.lines().enumerate() {
    if let Some(command) = parse_line(index + 1, text)? {
      steps.push(Step {
        line: index + 1,
        command,
      });
    }
  }

  Ok(steps)
}

pub fn load_script(path: &Path) -> Result<Vec<Step>, DriverError> {
  let source = fs::read_to_string(path).map_err(|source| DriverError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  Ok(parse_script(&source)?)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  pub allocations: usize,
  pub releases: usize,
  /// `dealloc` lines that found nothing to release.
  pub empty_releases: usize,
  /// Addresses still held by the script when it ended, newest last.
  pub outstanding: Vec<NonNull<u8>>,
}

/// Runs `steps` against `allocator`, stopping at the first allocator error.
///
/// Every `dealloc` releases an address this function was handed itself, or
/// nothing at all, so a script can never produce
/// [`AllocError::InvalidReleaseTarget`]. That error only reaches callers
/// that drive [`Allocator::release`] directly.
pub fn run_script<S: PlacementStrategy, H: HeapGrowth>(
  allocator: &mut Allocator<S, H>,
  steps: &[Step],
) -> Result<RunReport, DriverError> {
  let mut report = RunReport::default();

  for step in steps {
    let fail = |source| DriverError::Alloc {
      line: step.line,
      source,
    };

    match step.command {
      Command::Alloc(size) => {
        let address = allocator.allocate(size).map_err(fail)?;
        info!(line = step.line, size, address = ?address, "alloc");
        report.outstanding.push(address);
        report.allocations += 1;
      }
      Command::Dealloc => {
        let target = report.outstanding.pop();
        match allocator.release(target).map_err(fail)? {
          Released::Block(id) => {
            info!(line = step.line, block = %id, "dealloc");
            report.releases += 1;
          }
          Released::NothingAllocated => report.empty_releases += 1,
        }
      }
    }
  }

  Ok(report)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{heap::BufferHeap, registry::List, strategy::FirstFit};

  #[test]
  fn test_parse_script() {
    let source = "# warm up\nalloc:5\n\n  alloc: 33 \ndealloc\n";

    let steps = parse_script(source).unwrap();

    assert_eq!(
      steps,
      vec![
        Step {
          line: 2,
          command: Command::Alloc(5)
        },
        Step {
          line: 4,
          command: Command::Alloc(33)
        },
        Step {
          line: 5,
          command: Command::Dealloc
        },
      ]
    );
  }

  #[test]
  fn test_parse_errors_carry_line() {
    assert_eq!(
      parse_script("alloc:1\nalloc:x\n"),
      Err(ScriptError::InvalidSize {
        line: 2,
        value: "x".to_string()
      })
    );
    assert_eq!(
      parse_script("alloc:-4"),
      Err(ScriptError::InvalidSize {
        line: 1,
        value: "-4".to_string()
      })
    );
    assert_eq!(
      parse_script("dealloc\nfree 0x10"),
      Err(ScriptError::UnknownCommand {
        line: 2,
        text: "free 0x10".to_string()
      })
    );
  }

  #[test]
  fn test_parse_overflowing_size_is_too_large() {
    assert_eq!(
      parse_script("alloc:8\nalloc:99999999999999999999999\n"),
      Err(ScriptError::SizeTooLarge {
        line: 2,
        value: "99999999999999999999999".to_string(),
        max: 512,
      })
    );
  }

  #[test]
  fn test_release_contract_breach_is_fatal() {
    let err = DriverError::Alloc {
      line: 3,
      source: AllocError::InvalidReleaseTarget { address: 0x1000 },
    };

    assert!(err.is_fatal());
    assert_eq!(err.to_string(), "line 3: attempting to release invalid block 0x1000");
  }

  #[test]
  fn test_run_script_releases_newest_first() {
    let mut allocator = Allocator::new(FirstFit, BufferHeap::with_capacity(4096).unwrap());
    let steps = parse_script("alloc:5\nalloc:33\ndealloc\ndealloc\nalloc:12\ndealloc\n").unwrap();

    let report = run_script(&mut allocator, &steps).unwrap();

    assert_eq!(report.allocations, 3);
    assert_eq!(report.releases, 3);
    assert_eq!(report.empty_releases, 0);
    assert!(report.outstanding.is_empty());

    let registry = allocator.registry();
    assert!(registry.is_empty(List::Allocated));
    assert_eq!(registry.len(List::Free), 2);
    assert_eq!(allocator.stats().reused, 1);
  }

  #[test]
  fn test_run_script_extra_dealloc_is_benign() {
    let mut allocator = Allocator::new(FirstFit, BufferHeap::with_capacity(4096).unwrap());
    let steps = parse_script("dealloc\nalloc:1\ndealloc\ndealloc\n").unwrap();

    let report = run_script(&mut allocator, &steps).unwrap();

    assert_eq!(report.releases, 1);
    assert_eq!(report.empty_releases, 2);
  }

  #[test]
  fn test_run_script_stops_on_oversized_request() {
    let mut allocator = Allocator::new(FirstFit, BufferHeap::with_capacity(4096).unwrap());
    let steps = parse_script("alloc:10\nalloc:1000\nalloc:10\n").unwrap();

    let err = run_script(&mut allocator, &steps).unwrap_err();

    assert!(matches!(
      err,
      DriverError::Alloc {
        line: 2,
        source: AllocError::SizeTooLarge { .. }
      }
    ));
    assert!(!err.is_fatal());
    assert_eq!(allocator.registry().len(List::Allocated), 1);
  }

  #[test]
  fn test_run_script_heap_exhaustion_is_fatal() {
    let mut allocator = Allocator::new(FirstFit, BufferHeap::with_capacity(64).unwrap());
    let steps = parse_script("alloc:10\nalloc:100\n").unwrap();

    let err = run_script(&mut allocator, &steps).unwrap_err();

    assert!(err.is_fatal());
    assert!(err.to_string().starts_with("line 2: failed to grow the heap"));
  }

  #[test]
  fn test_load_missing_script() {
    let err = load_script(Path::new("/definitely/not/here.txt")).unwrap_err();

    assert!(matches!(err, DriverError::Io { .. }));
    assert!(!err.is_fatal());
  }
}
