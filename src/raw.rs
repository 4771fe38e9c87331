use std::{alloc::Layout, fmt, marker::PhantomData, mem, ptr};

use libc::{c_void, free, malloc, max_align_t};

use crate::error::{Result, SequenceError};

/// An owned block of uninitialized storage for `capacity` values of `T`.
///
/// The block is obtained from the host C allocator. `RawStorage` never
/// reads or writes the slots it owns: it hands out addresses and frees the
/// block on drop without running any destructor. Tracking which slots hold
/// live values is the owner's job.
///
/// ```text
///   buffer ──►┌──────┬──────┬──────┬──────┐
///             │ slot │ slot │ slot │ slot │   capacity = 4
///             └──────┴──────┴──────┴──────┘
///             ▲                           ▲
///         address(0)                 address(4) (one past the end)
/// ```
pub struct RawStorage<T> {
  buffer: *mut T,
  capacity: usize,
  _owns: PhantomData<T>,
}

impl<T> RawStorage<T> {
  /// Storage with no buffer and zero capacity. Never allocates.
  pub const fn new() -> Self {
    Self {
      buffer: ptr::null_mut(),
      capacity: 0,
      _owns: PhantomData,
    }
  }

  /// Allocates uninitialized storage for `capacity` values of `T`.
  ///
  /// A zero capacity yields the null state without calling the allocator.
  pub fn try_new(capacity: usize) -> Result<Self> {
    Ok(Self {
      buffer: Self::allocate(capacity)?,
      capacity,
      _owns: PhantomData,
    })
  }

  fn allocate(capacity: usize) -> Result<*mut T> {
    if capacity == 0 {
      return Ok(ptr::null_mut());
    }

    debug_assert!(
      mem::align_of::<T>() <= mem::align_of::<max_align_t>(),
      "element alignment exceeds what the host allocator guarantees"
    );

    let layout = Layout::array::<T>(capacity).map_err(|_| SequenceError::allocation::<T>(capacity))?;

    if layout.size() == 0 {
      return Ok(ptr::NonNull::dangling().as_ptr());
    }

    let address = unsafe { malloc(layout.size()) } as *mut T;

    if address.is_null() {
      log::debug!("allocation of {} bytes for {} slots failed", layout.size(), capacity);
      return Err(SequenceError::allocation::<T>(capacity));
    }

    log::trace!(
      "allocated {} bytes for {} slots, address = {:?}",
      layout.size(),
      capacity,
      address
    );

    Ok(address)
  }

  unsafe fn deallocate(
    buffer: *mut T,
    capacity: usize,
  ) {
    if buffer.is_null() || mem::size_of::<T>() == 0 {
      return;
    }

    log::trace!("released {} slots, address = {:?}", capacity, buffer);

    unsafe { free(buffer as *mut c_void) };
  }

  /// Address of the `offset`-th slot.
  ///
  /// `offset == capacity` is allowed: the one-past-the-end address may be
  /// computed but never dereferenced.
  ///
  /// # Panics
  ///
  /// Panics if `offset > capacity`.
  pub fn address(
    &self,
    offset: usize,
  ) -> *mut T {
    assert!(
      offset <= self.capacity,
      "offset {offset} is past the end of storage with capacity {}",
      self.capacity
    );

    if self.buffer.is_null() {
      return self.buffer;
    }

    unsafe { self.buffer.add(offset) }
  }

  /// Reference to the slot at `index`.
  ///
  /// # Safety
  ///
  /// The slot must hold a live value.
  ///
  /// # Panics
  ///
  /// Panics if `index >= capacity`.
  pub unsafe fn at(
    &self,
    index: usize,
  ) -> &T {
    assert!(
      index < self.capacity,
      "index {index} is out of range for storage with capacity {}",
      self.capacity
    );

    unsafe { &*self.buffer.add(index) }
  }

  /// Mutable reference to the slot at `index`.
  ///
  /// # Safety
  ///
  /// The slot must hold a live value.
  ///
  /// # Panics
  ///
  /// Panics if `index >= capacity`.
  pub unsafe fn at_mut(
    &mut self,
    index: usize,
  ) -> &mut T {
    assert!(
      index < self.capacity,
      "index {index} is out of range for storage with capacity {}",
      self.capacity
    );

    unsafe { &mut *self.buffer.add(index) }
  }

  /// Exchanges buffers and capacities with `other`.
  pub fn swap(
    &mut self,
    other: &mut Self,
  ) {
    mem::swap(&mut self.buffer, &mut other.buffer);
    mem::swap(&mut self.capacity, &mut other.capacity);
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn as_ptr(&self) -> *const T {
    self.buffer
  }

  pub fn as_mut_ptr(&mut self) -> *mut T {
    self.buffer
  }
}

impl<T> Default for RawStorage<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Drop for RawStorage<T> {
  fn drop(&mut self) {
    unsafe { Self::deallocate(self.buffer, self.capacity) };
  }
}

impl<T> fmt::Debug for RawStorage<T> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("RawStorage")
      .field("buffer", &self.buffer)
      .field("capacity", &self.capacity)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_zero_capacity_is_null() {
    let storage = RawStorage::<u64>::try_new(0).unwrap();

    assert!(storage.as_ptr().is_null());
    assert_eq!(storage.capacity(), 0);
    assert!(storage.address(0).is_null());
  }

  #[test]
  fn test_slots_are_aligned_and_writable() {
    let mut storage = RawStorage::<u64>::try_new(6).unwrap();

    assert!(!storage.as_ptr().is_null());
    assert_eq!(storage.as_ptr() as usize % mem::align_of::<u64>(), 0);

    unsafe {
      for i in 0..6 {
        storage.address(i).write((i * 10) as u64);
      }

      for i in 0..6 {
        assert_eq!(*storage.at(i), (i * 10) as u64);
      }

      *storage.at_mut(3) = 99;
      assert_eq!(*storage.at(3), 99);
    }
  }

  #[test]
  fn test_one_past_end_address() {
    let storage = RawStorage::<u32>::try_new(4).unwrap();

    let end = storage.address(4);

    assert_eq!(end as usize - storage.as_ptr() as usize, 4 * mem::size_of::<u32>());
  }

  #[test]
  #[should_panic(expected = "past the end")]
  fn test_address_beyond_end_panics() {
    let storage = RawStorage::<u32>::try_new(4).unwrap();

    storage.address(5);
  }

  #[test]
  #[should_panic(expected = "out of range")]
  fn test_at_capacity_panics() {
    let storage = RawStorage::<u32>::try_new(2).unwrap();

    unsafe {
      storage.at(2);
    }
  }

  #[test]
  fn test_swap() {
    let mut first = RawStorage::<u8>::try_new(3).unwrap();
    let mut second = RawStorage::<u8>::new();

    let address = first.as_ptr();

    first.swap(&mut second);

    assert_eq!(first.capacity(), 0);
    assert!(first.as_ptr().is_null());
    assert_eq!(second.capacity(), 3);
    assert_eq!(second.as_ptr(), address);
  }

  #[test]
  fn test_overflowing_capacity_fails() {
    let result = RawStorage::<u64>::try_new(usize::MAX);

    assert!(matches!(
      result,
      Err(SequenceError::AllocationFailure { bytes: None, .. })
    ));
  }

  #[test]
  fn test_zero_sized_slots_skip_allocator() {
    let storage = RawStorage::<()>::try_new(1024).unwrap();

    assert!(!storage.as_ptr().is_null());
    assert_eq!(storage.capacity(), 1024);
  }
}
