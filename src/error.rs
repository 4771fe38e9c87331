use std::{alloc::Layout, error::Error as StdError};

use thiserror::Error;

/// Result alias used by every fallible [`Sequence`](crate::Sequence) operation.
pub type Result<T> = std::result::Result<T, SequenceError>;

/// Failures surfaced by the storage and sequence layers.
///
/// Panicking element constructors (`Clone`, `Default`, infallible closures)
/// are not represented here: they unwind through the container, which
/// restores its invariants on the way out.
#[derive(Debug, Error)]
pub enum SequenceError {
  /// The allocator could not provide storage for `capacity` elements.
  ///
  /// `bytes` is `None` when the byte count itself does not fit in an
  /// `isize`, which also covers overflow of the growth schedule.
  #[error("cannot allocate storage for {capacity} elements ({})", describe_bytes(.bytes))]
  AllocationFailure {
    capacity: usize,
    bytes: Option<usize>,
  },

  /// A fallible element constructor reported an error.
  #[error("element construction failed: {0}")]
  ElementConstruct(#[source] Box<dyn StdError + Send + Sync>),
}

impl SequenceError {
  pub(crate) fn allocation<T>(capacity: usize) -> Self {
    Self::AllocationFailure {
      capacity,
      bytes: Layout::array::<T>(capacity).ok().map(|layout| layout.size()),
    }
  }

  pub(crate) fn construct<E>(err: E) -> Self
  where
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    Self::ElementConstruct(err.into())
  }

  /// Whether this is an allocation failure (including capacity overflow).
  pub fn is_allocation_failure(&self) -> bool {
    matches!(self, Self::AllocationFailure { .. })
  }

  /// Escalates the error the way the standard collections do for
  /// operations with no error channel: allocator exhaustion aborts through
  /// [`std::alloc::handle_alloc_error`], everything else panics.
  pub(crate) fn raise<T>(self) -> ! {
    match self {
      Self::AllocationFailure {
        capacity,
        bytes: Some(_),
      } => match Layout::array::<T>(capacity) {
        Ok(layout) => std::alloc::handle_alloc_error(layout),
        Err(_) => panic!("capacity overflow"),
      },
      Self::AllocationFailure { bytes: None, .. } => panic!("capacity overflow"),
      other => panic!("{other}"),
    }
  }
}

fn describe_bytes(bytes: &Option<usize>) -> String {
  match bytes {
    Some(bytes) => format!("{bytes} bytes"),
    None => "capacity overflow".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_allocation_display() {
    let err = SequenceError::allocation::<u32>(4);
    assert!(err.is_allocation_failure());
    assert_eq!(err.to_string(), "cannot allocate storage for 4 elements (16 bytes)");
  }

  #[test]
  fn test_overflow_display() {
    let err = SequenceError::allocation::<u64>(usize::MAX);
    assert!(matches!(err, SequenceError::AllocationFailure { bytes: None, .. }));
    assert_eq!(
      err.to_string(),
      format!("cannot allocate storage for {} elements (capacity overflow)", usize::MAX)
    );
  }

  #[test]
  fn test_construct_keeps_source() {
    let err = SequenceError::construct("bad input");
    assert!(!err.is_allocation_failure());
    assert_eq!(err.to_string(), "element construction failed: bad input");
    assert!(err.source().is_some());
  }
}
