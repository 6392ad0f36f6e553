//! Size classes.
//!
//! Every request is rounded up to one of a fixed, ascending set of block
//! capacities. Blocks are never split, so the class table bounds how much
//! of a block can go unused.

/// Block capacities, smallest first.
pub const SIZE_CLASSES: [usize; 5] = [32, 64, 128, 256, 512];

/// Smallest block the allocator hands out.
pub const MIN_CLASS: usize = SIZE_CLASSES[0];

/// Largest request the allocator accepts.
pub const MAX_CLASS: usize = SIZE_CLASSES[SIZE_CLASSES.len() - 1];

/// Returns the smallest size class that can hold `size`, or `None` when
/// `size` is above [`MAX_CLASS`].
///
/// A zero-sized request maps to [`MIN_CLASS`].
pub fn normalize(size: usize) -> Option<usize> {
  SIZE_CLASSES.iter().copied().find(|&class| size <= class)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_normalize_rounds_up() {
    assert_eq!(normalize(0), Some(32));
    assert_eq!(normalize(1), Some(32));
    assert_eq!(normalize(33), Some(64));
    assert_eq!(normalize(40), Some(64));
    assert_eq!(normalize(100), Some(128));
    assert_eq!(normalize(129), Some(256));
    assert_eq!(normalize(511), Some(512));
  }

  #[test]
  fn test_normalize_is_idempotent_on_classes() {
    for class in SIZE_CLASSES {
      assert_eq!(normalize(class), Some(class));
      assert_eq!(normalize(class).and_then(normalize), Some(class));
    }
  }

  #[test]
  fn test_normalize_rejects_oversize() {
    assert_eq!(normalize(MAX_CLASS + 1), None);
    assert_eq!(normalize(usize::MAX), None);
  }

  #[test]
  fn test_class_table_ascending() {
    for pair in SIZE_CLASSES.windows(2) {
      assert!(pair[0] < pair[1], "{} must be below {}", pair[0], pair[1]);
    }
  }
}
