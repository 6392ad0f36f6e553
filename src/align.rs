/// Rounds `value` up to the next multiple of the machine word size.
///
/// The heap growth providers use it to keep every freshly carved block on a
/// word boundary, whatever state the program break was left in.
///
/// # Examples
///
/// ```rust
/// use fitalloc::align;
///
/// match std::mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    $crate::align_to!($value, ::core::mem::size_of::<usize>())
  };
}

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two.
///
/// ```rust
/// use fitalloc::align_to;
///
/// assert_eq!(align_to!(33, 32), 64);
/// assert_eq!(align_to!(64, 32), 64);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $alignment:expr) => {
    (($value) + ($alignment) - 1) & !(($alignment) - 1)
  };
}
