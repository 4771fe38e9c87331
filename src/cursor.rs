use std::{
  cmp::Ordering,
  fmt,
  hash::{Hash, Hasher},
  ops::{Add, Sub},
};

/// A non-owning position inside a [`Sequence`](crate::Sequence).
///
/// A cursor is a raw address into the sequence's buffer: it can be
/// compared, offset and subtracted freely, but reading through it needs
/// either [`Sequence::element`](crate::Sequence::element), which checks
/// that the cursor still points at a live value, or the unsafe
/// [`Cursor::as_ref`].
///
/// Any operation that may reallocate invalidates every cursor of the
/// sequence; `erase`, `pop_back` and a shrinking `resize` invalidate the
/// cursors at or after the affected position.
pub struct Cursor<T> {
  ptr: *const T,
}

impl<T> Cursor<T> {
  pub(crate) fn new(ptr: *const T) -> Self {
    Self { ptr }
  }

  pub fn as_ptr(self) -> *const T {
    self.ptr
  }

  /// Signed distance in elements from `origin` to `self`.
  pub fn offset_from(
    self,
    origin: Self,
  ) -> isize {
    let size = std::mem::size_of::<T>().max(1) as isize;
    (self.ptr as isize).wrapping_sub(origin.ptr as isize) / size
  }

  /// Dereferences the cursor.
  ///
  /// # Safety
  ///
  /// The cursor must point at a live element of a sequence that has not
  /// been mutated since the cursor was obtained, and the returned
  /// reference must not outlive that sequence.
  pub unsafe fn as_ref<'a>(self) -> &'a T {
    unsafe { &*self.ptr }
  }
}

impl<T> Clone for Cursor<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Cursor<T> {}

impl<T> PartialEq for Cursor<T> {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.ptr == other.ptr
  }
}

impl<T> Eq for Cursor<T> {}

impl<T> PartialOrd for Cursor<T> {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<T> Ord for Cursor<T> {
  fn cmp(
    &self,
    other: &Self,
  ) -> Ordering {
    self.ptr.cmp(&other.ptr)
  }
}

impl<T> Hash for Cursor<T> {
  fn hash<H: Hasher>(
    &self,
    state: &mut H,
  ) {
    self.ptr.hash(state);
  }
}

impl<T> fmt::Debug for Cursor<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_tuple("Cursor").field(&self.ptr).finish()
  }
}

impl<T> Add<usize> for Cursor<T> {
  type Output = Self;

  fn add(
    self,
    rhs: usize,
  ) -> Self {
    Self::new(self.ptr.wrapping_add(rhs))
  }
}

impl<T> Sub<usize> for Cursor<T> {
  type Output = Self;

  fn sub(
    self,
    rhs: usize,
  ) -> Self {
    Self::new(self.ptr.wrapping_sub(rhs))
  }
}

impl<T> Sub for Cursor<T> {
  type Output = isize;

  fn sub(
    self,
    rhs: Self,
  ) -> isize {
    self.offset_from(rhs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cursor_arithmetic() {
    let values = [1u64, 2, 3, 4];
    let begin = Cursor::new(values.as_ptr());
    let end = begin + values.len();

    assert_eq!(end - begin, 4);
    assert_eq!(begin - end, -4);
    assert_eq!((end - 1) - begin, 3);
    assert!(begin < end);
    assert_eq!(begin + 4, end);
    assert_eq!(unsafe { *(begin + 2).as_ref() }, 3);
  }

  #[test]
  fn test_zero_sized_cursors_compare_equal() {
    let values = [(), ()];
    let begin = Cursor::new(values.as_ptr());

    assert_eq!(begin + 1, begin);
    assert_eq!((begin + 1) - begin, 0);
  }
}
