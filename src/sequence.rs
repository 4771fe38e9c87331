use std::{
  error::Error as StdError,
  fmt,
  marker::PhantomData,
  ops::{Deref, DerefMut, Index, IndexMut},
  ptr, slice,
};

use crate::{
  cursor::Cursor,
  error::{Result, SequenceError},
  raw::RawStorage,
  relocate::{Bitwise, Constructed, Relocation, clone_into_raw, construct_into_raw},
};

/// Capacity of the first buffer allocated by a growing append or insert.
const INITIAL_CAPACITY: usize = 1;

/// Factor applied to a full buffer's capacity at a growth point.
const GROWTH_FACTOR: usize = 2;

/// A contiguous, growable sequence of `T`.
///
/// The first `len()` slots of the owned [`RawStorage`] hold live values;
/// the remaining `capacity() - len()` slots are raw. Every operation keeps
/// that split intact on all exit paths, including unwinding out of a
/// panicking element constructor.
///
/// ```text
///   ┌─────┬─────┬─────┬─────┬─────┬─────┐
///   │ v0  │ v1  │ v2  │ raw │ raw │ raw │     len = 3, capacity = 6
///   └─────┴─────┴─────┴─────┴─────┴─────┘
///   ▲                 ▲
///   begin()           end()
/// ```
///
/// `R` selects how live values move into a new buffer on reallocation; see
/// [`Relocation`]. The default [`Bitwise`] policy never runs user code
/// while relocating.
pub struct Sequence<T, R = Bitwise> {
  data: RawStorage<T>,
  size: usize,
  _relocation: PhantomData<fn() -> R>,
}

unsafe impl<T: Send, R> Send for Sequence<T, R> {}
unsafe impl<T: Sync, R> Sync for Sequence<T, R> {}

impl<T, R> Sequence<T, R> {
  /// An empty sequence. Does not allocate.
  pub const fn new() -> Self {
    Self {
      data: RawStorage::new(),
      size: 0,
      _relocation: PhantomData,
    }
  }

  /// A sequence of `size` default-constructed values, with capacity
  /// exactly `size`.
  pub fn with_len(size: usize) -> Result<Self>
  where
    T: Default,
  {
    let mut data = RawStorage::try_new(size)?;

    unsafe { construct_into_raw(data.as_mut_ptr(), size, |_| T::default()) };

    Ok(Self {
      data,
      size,
      _relocation: PhantomData,
    })
  }

  pub fn len(&self) -> usize {
    self.size
  }

  /// Same as [`len`](Self::len).
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn is_empty(&self) -> bool {
    self.size == 0
  }

  pub fn capacity(&self) -> usize {
    self.data.capacity()
  }

  /// # Panics
  ///
  /// Panics if `index >= len()`.
  pub fn at(
    &self,
    index: usize,
  ) -> &T {
    self.check_index(index);
    unsafe { self.data.at(index) }
  }

  /// # Panics
  ///
  /// Panics if `index >= len()`.
  pub fn at_mut(
    &mut self,
    index: usize,
  ) -> &mut T {
    self.check_index(index);
    unsafe { self.data.at_mut(index) }
  }

  fn check_index(
    &self,
    index: usize,
  ) {
    assert!(
      index < self.size,
      "index {index} is out of range for sequence of length {}",
      self.size
    );
  }

  pub fn as_slice(&self) -> &[T] {
    if self.size == 0 {
      return &[];
    }

    unsafe { slice::from_raw_parts(self.data.as_ptr(), self.size) }
  }

  pub fn as_mut_slice(&mut self) -> &mut [T] {
    if self.size == 0 {
      return &mut [];
    }

    unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr(), self.size) }
  }

  /// Start of the buffer. Null while nothing has been allocated.
  pub fn as_ptr(&self) -> *const T {
    self.data.as_ptr()
  }

  pub fn as_mut_ptr(&mut self) -> *mut T {
    self.data.as_mut_ptr()
  }

  /// Cursor to the first element.
  pub fn begin(&self) -> Cursor<T> {
    Cursor::new(self.data.address(0))
  }

  /// Cursor one past the last element.
  pub fn end(&self) -> Cursor<T> {
    Cursor::new(self.data.address(self.size))
  }

  pub fn cbegin(&self) -> Cursor<T> {
    self.begin()
  }

  pub fn cend(&self) -> Cursor<T> {
    self.end()
  }

  /// The element `pos` points at.
  ///
  /// # Panics
  ///
  /// Panics unless `begin() <= pos < end()`.
  pub fn element(
    &self,
    pos: Cursor<T>,
  ) -> &T {
    let offset = self.offset_of(pos, false);
    unsafe { self.data.at(offset) }
  }

  /// Index of `pos`, which must lie in `[begin, end)`, or `[begin, end]`
  /// when `allow_end` is set.
  fn offset_of(
    &self,
    pos: Cursor<T>,
    allow_end: bool,
  ) -> usize {
    let begin = self.begin();
    let end = self.end();

    // Zero-sized values share a single address, so every position is the front.
    if size_of::<T>() == 0 {
      assert!(pos == begin, "cursor {pos:?} does not belong to this sequence");
      assert!(allow_end || self.size > 0, "cursor {pos:?} is past the last element");
      return 0;
    }

    let inside = begin <= pos && (pos < end || (allow_end && pos == end));
    assert!(
      inside,
      "cursor {pos:?} is outside [{begin:?}, {end:?}{}",
      if allow_end { "]" } else { ")" }
    );

    (pos - begin) as usize
  }

  /// Destroys the last element. Does nothing when empty.
  pub fn pop_back(&mut self) {
    if self.size == 0 {
      return;
    }

    self.size -= 1;
    unsafe { ptr::drop_in_place(self.data.address(self.size)) };
  }

  /// Destroys every element past `new_size`.
  fn truncate(
    &mut self,
    new_size: usize,
  ) {
    if new_size >= self.size {
      return;
    }

    let tail = ptr::slice_from_raw_parts_mut(self.data.address(new_size), self.size - new_size);
    self.size = new_size;
    unsafe { ptr::drop_in_place(tail) };
  }

  /// Removes the element at `pos`, shifting the tail left by one.
  ///
  /// Returns a cursor to the element that took its place (or `end()`).
  ///
  /// # Panics
  ///
  /// Panics unless `begin() <= pos < end()`.
  pub fn erase(
    &mut self,
    pos: Cursor<T>,
  ) -> Cursor<T> {
    let offset = self.offset_of(pos, false);

    unsafe {
      let slot = self.data.address(offset);
      let removed = ptr::read(slot);
      ptr::copy(slot.add(1), slot, self.size - offset - 1);
      self.size -= 1;
      drop(removed);
    }

    self.begin() + offset
  }

  /// Exchanges contents and capacity with `other`.
  pub fn swap(
    &mut self,
    other: &mut Self,
  ) {
    self.data.swap(&mut other.data);
    std::mem::swap(&mut self.size, &mut other.size);
  }

  /// Moves the contents out, leaving `self` empty with zero capacity.
  pub fn take(&mut self) -> Self {
    let mut taken = Self::new();
    taken.swap(self);
    taken
  }

  /// Move-assignment: `self` takes over `rhs`'s contents and `rhs`
  /// receives the previous ones.
  pub fn assign_take(
    &mut self,
    rhs: &mut Self,
  ) {
    self.swap(rhs);
  }

  /// Installs `new_data` as the buffer holding `new_size` live values and
  /// retires the old one.
  ///
  /// # Safety
  ///
  /// Every live value must already have been transferred into `new_data`
  /// with `R`, and the first `new_size` slots of `new_data` must be live.
  unsafe fn adopt(
    &mut self,
    mut new_data: RawStorage<T>,
    new_size: usize,
  ) where
    R: Relocation<T>,
  {
    log::trace!(
      "relocated {} elements from capacity {} to {} ({})",
      self.size,
      self.data.capacity(),
      new_data.capacity(),
      R::NAME
    );

    let old_size = self.size;
    self.data.swap(&mut new_data);
    self.size = new_size;

    if R::SOURCES_SURVIVE && old_size > 0 {
      unsafe {
        ptr::drop_in_place(ptr::slice_from_raw_parts_mut(new_data.as_mut_ptr(), old_size));
      }
    }
  }

  /// Transfers `count` live values starting at `from` into `target`,
  /// starting at `to`.
  unsafe fn transfer_range(
    &mut self,
    target: &mut RawStorage<T>,
    from: usize,
    count: usize,
    to: usize,
  ) where
    R: Relocation<T>,
  {
    if count == 0 {
      return;
    }

    unsafe { R::transfer(self.data.address(from), target.address(to), count) };
  }

  fn grown_capacity(&self) -> Result<usize> {
    match self.data.capacity() {
      0 => Ok(INITIAL_CAPACITY),
      capacity => capacity
        .checked_mul(GROWTH_FACTOR)
        .ok_or(SequenceError::AllocationFailure {
          capacity: usize::MAX,
          bytes: None,
        }),
    }
  }
}

impl<T, R: Relocation<T>> Sequence<T, R> {
  /// Ensures room for at least `new_capacity` elements.
  ///
  /// Does nothing when the capacity is already large enough; otherwise
  /// the capacity becomes exactly `new_capacity`.
  pub fn reserve(
    &mut self,
    new_capacity: usize,
  ) -> Result<()> {
    if new_capacity <= self.data.capacity() {
      return Ok(());
    }

    let mut new_data = RawStorage::try_new(new_capacity)?;

    unsafe {
      self.transfer_range(&mut new_data, 0, self.size, 0);
      self.adopt(new_data, self.size);
    }

    Ok(())
  }

  /// Grows with default-constructed values or destroys the tail.
  ///
  /// The capacity never shrinks.
  pub fn resize(
    &mut self,
    new_size: usize,
  ) -> Result<()>
  where
    T: Default,
  {
    if new_size <= self.size {
      self.truncate(new_size);
      return Ok(());
    }

    self.reserve(new_size)?;

    unsafe {
      construct_into_raw(self.data.address(self.size), new_size - self.size, |_| T::default());
    }
    self.size = new_size;

    Ok(())
  }

  /// Appends `value`.
  pub fn push_back(
    &mut self,
    value: T,
  ) -> Result<&mut T> {
    self.emplace_back_with(|| Ok(value))
  }

  /// Appends the value built by `make`.
  ///
  /// At a growth point the new value is built in the new buffer before
  /// any existing element is relocated, so a panicking `make` leaves the
  /// sequence untouched.
  pub fn emplace_back<F>(
    &mut self,
    make: F,
  ) -> Result<&mut T>
  where
    F: FnOnce() -> T,
  {
    self.emplace_back_with(|| Ok(make()))
  }

  /// Appends the value built by a fallible `make`.
  ///
  /// An error from `make` is returned as
  /// [`SequenceError::ElementConstruct`] and leaves the sequence unchanged.
  pub fn try_emplace_back<F, E>(
    &mut self,
    make: F,
  ) -> Result<&mut T>
  where
    F: FnOnce() -> std::result::Result<T, E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    self.emplace_back_with(|| make().map_err(SequenceError::construct))
  }

  fn emplace_back_with<F>(
    &mut self,
    make: F,
  ) -> Result<&mut T>
  where
    F: FnOnce() -> Result<T>,
  {
    let size = self.size;

    if size < self.data.capacity() {
      let value = make()?;
      unsafe { self.data.address(size).write(value) };
      self.size += 1;
    } else {
      let mut new_data = RawStorage::<T>::try_new(self.grown_capacity()?)?;

      unsafe {
        let slot = new_data.address(size);
        slot.write(make()?);
        let element = Constructed::new(slot, 1);

        self.transfer_range(&mut new_data, 0, size, 0);

        element.commit();
        self.adopt(new_data, size + 1);
      }
    }

    Ok(unsafe { self.data.at_mut(size) })
  }

  /// Inserts `value` before `pos`. Returns a cursor to it.
  ///
  /// # Panics
  ///
  /// Panics unless `begin() <= pos <= end()`.
  pub fn insert(
    &mut self,
    pos: Cursor<T>,
    value: T,
  ) -> Result<Cursor<T>> {
    self.emplace_with(pos, || Ok(value))
  }

  /// Inserts the value built by `make` before `pos`. Returns a cursor to
  /// it.
  ///
  /// # Panics
  ///
  /// Panics unless `begin() <= pos <= end()`.
  pub fn emplace<F>(
    &mut self,
    pos: Cursor<T>,
    make: F,
  ) -> Result<Cursor<T>>
  where
    F: FnOnce() -> T,
  {
    self.emplace_with(pos, || Ok(make()))
  }

  /// Fallible counterpart of [`emplace`](Self::emplace).
  pub fn try_emplace<F, E>(
    &mut self,
    pos: Cursor<T>,
    make: F,
  ) -> Result<Cursor<T>>
  where
    F: FnOnce() -> std::result::Result<T, E>,
    E: Into<Box<dyn StdError + Send + Sync>>,
  {
    self.emplace_with(pos, || make().map_err(SequenceError::construct))
  }

  fn emplace_with<F>(
    &mut self,
    pos: Cursor<T>,
    make: F,
  ) -> Result<Cursor<T>>
  where
    F: FnOnce() -> Result<T>,
  {
    let offset = self.offset_of(pos, true);
    let size = self.size;

    if size == self.data.capacity() {
      let mut new_data = RawStorage::<T>::try_new(self.grown_capacity()?)?;

      unsafe {
        let slot = new_data.address(offset);
        slot.write(make()?);
        let element = Constructed::new(slot, 1);

        self.transfer_range(&mut new_data, 0, offset, 0);
        let prefix = Constructed::new(new_data.address(0), if R::SOURCES_SURVIVE { offset } else { 0 });

        self.transfer_range(&mut new_data, offset, size - offset, offset + 1);

        prefix.commit();
        element.commit();
        self.adopt(new_data, size + 1);
      }
    } else {
      let value = make()?;

      // Shift [offset, size) right by one, back to front.
      unsafe {
        let slot = self.data.address(offset);
        ptr::copy(slot, slot.add(1), size - offset);
        slot.write(value);
      }
      self.size += 1;
    }

    Ok(self.begin() + offset)
  }
}

impl<T: Clone, R> Sequence<T, R> {
  /// Copy-constructs a sequence with capacity exactly `len()`.
  ///
  /// A panicking `clone` destroys the copies made so far and releases the
  /// new buffer; `self` is never touched.
  pub fn try_clone(&self) -> Result<Self> {
    let mut data = RawStorage::try_new(self.size)?;

    unsafe { clone_into_raw(self.data.as_ptr(), data.as_mut_ptr(), self.size) };

    Ok(Self {
      data,
      size: self.size,
      _relocation: PhantomData,
    })
  }

  /// Copy-assignment.
  ///
  /// Reallocates (copy then swap) only when `rhs` does not fit in the
  /// current capacity. Otherwise the live prefix is overwritten in place
  /// with [`Clone::clone_from`], then the tail is either destroyed or
  /// copy-constructed. If an in-place `clone_from` panics the sequence is
  /// left with a mix of old and new values, all of them live.
  pub fn assign_from(
    &mut self,
    rhs: &Self,
  ) -> Result<()> {
    if rhs.size > self.data.capacity() {
      let mut copy = rhs.try_clone()?;
      self.swap(&mut copy);
      return Ok(());
    }

    if rhs.size < self.size {
      self.as_mut_slice()[..rhs.size].clone_from_slice(rhs.as_slice());
      self.truncate(rhs.size);
    } else {
      let size = self.size;
      self.as_mut_slice().clone_from_slice(&rhs.as_slice()[..size]);

      unsafe { clone_into_raw(rhs.data.address(size), self.data.address(size), rhs.size - size) };
      self.size = rhs.size;
    }

    Ok(())
  }
}

impl<T, R> Drop for Sequence<T, R> {
  fn drop(&mut self) {
    unsafe { ptr::drop_in_place(self.as_mut_slice()) };
  }
}

impl<T, R> Default for Sequence<T, R> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: Clone, R> Clone for Sequence<T, R> {
  fn clone(&self) -> Self {
    self.try_clone().unwrap_or_else(|err| err.raise::<T>())
  }

  fn clone_from(
    &mut self,
    source: &Self,
  ) {
    if let Err(err) = self.assign_from(source) {
      err.raise::<T>();
    }
  }
}

impl<T, R> Deref for Sequence<T, R> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    self.as_slice()
  }
}

impl<T, R> DerefMut for Sequence<T, R> {
  fn deref_mut(&mut self) -> &mut [T] {
    self.as_mut_slice()
  }
}

impl<T, R> Index<usize> for Sequence<T, R> {
  type Output = T;

  fn index(
    &self,
    index: usize,
  ) -> &T {
    self.at(index)
  }
}

impl<T, R> IndexMut<usize> for Sequence<T, R> {
  fn index_mut(
    &mut self,
    index: usize,
  ) -> &mut T {
    self.at_mut(index)
  }
}

impl<T: fmt::Debug, R> fmt::Debug for Sequence<T, R> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_list().entries(self.as_slice()).finish()
  }
}
