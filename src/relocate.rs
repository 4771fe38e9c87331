//! Relocation policies: how live values migrate into a fresh buffer when a
//! sequence reallocates.
//!
//! ```text
//!   old buffer   ┌───┬───┬───┐          new buffer   ┌───┬───┬───┬───┐
//!                │ a │ b │ c │  ──────►              │ a │ b │ c │   │
//!                └───┴───┴───┘  transfer             └───┴───┴───┴───┘
//!
//!   Bitwise: memcpy, old slots are raw afterwards (nothing to drop)
//!   ByClone: clone each value, old slots stay live until the caller drops them
//! ```

use std::{marker::PhantomData, mem, ptr};

/// Strategy used to move live values from an old buffer into raw slots of a
/// new one.
///
/// A transfer either completes (every destination slot live) or unwinds
/// with the destination slots raw again and the sources untouched. Whether
/// the sources still need dropping after a successful transfer is reported
/// by [`SOURCES_SURVIVE`](Relocation::SOURCES_SURVIVE).
///
/// # Safety
///
/// Implementors must honour the all-or-nothing contract above. When
/// `SOURCES_SURVIVE` is `false` a transfer must leave the source bytes
/// unmodified, so that an operation abandoned after a successful transfer
/// can keep treating the sources as live and simply forget the copies. A
/// [`Sequence`](crate::Sequence) relies on it for its strong failure
/// guarantee and for memory safety.
pub unsafe trait Relocation<T> {
  /// `true` when a successful transfer leaves the source values alive, so
  /// the caller must drop them once every transfer of an operation is done.
  const SOURCES_SURVIVE: bool;

  /// Short name used in trace records.
  const NAME: &'static str;

  /// Builds `count` values at `dst` from the `count` values at `src`.
  ///
  /// # Safety
  ///
  /// `src` must point to `count` live values, `dst` to `count` raw slots,
  /// and the two ranges must not overlap.
  unsafe fn transfer(
    src: *mut T,
    dst: *mut T,
    count: usize,
  );
}

/// Relocates by bitwise move. Cannot fail and never runs user code.
///
/// This is the default policy and the right one for every ordinary Rust
/// type.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bitwise;

unsafe impl<T> Relocation<T> for Bitwise {
  const SOURCES_SURVIVE: bool = false;
  const NAME: &'static str = "bitwise";

  unsafe fn transfer(
    src: *mut T,
    dst: *mut T,
    count: usize,
  ) {
    unsafe { ptr::copy_nonoverlapping(src, dst, count) };
  }
}

/// Relocates by cloning every value and dropping the originals afterwards.
///
/// A panicking clone destroys the clones built so far and leaves the source
/// buffer intact, so a reallocation either completes or leaves the sequence
/// as it was.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByClone;

unsafe impl<T: Clone> Relocation<T> for ByClone {
  const SOURCES_SURVIVE: bool = true;
  const NAME: &'static str = "clone";

  unsafe fn transfer(
    src: *mut T,
    dst: *mut T,
    count: usize,
  ) {
    unsafe { clone_into_raw(src, dst, count) };
  }
}

/// Clone-constructs `count` values at `dst` from `src`.
///
/// # Safety
///
/// `src` must point to `count` live values and `dst` to `count` raw slots.
pub(crate) unsafe fn clone_into_raw<T: Clone>(
  src: *const T,
  dst: *mut T,
  count: usize,
) {
  unsafe { construct_into_raw(dst, count, |i| (*src.add(i)).clone()) };
}

/// Fills `count` raw slots at `dst` with `make(0), make(1), ...`.
///
/// If `make` panics the values already built are destroyed before the
/// panic continues, so the slots end up raw again.
///
/// # Safety
///
/// `dst` must point to `count` raw slots.
pub(crate) unsafe fn construct_into_raw<T, F>(
  dst: *mut T,
  count: usize,
  mut make: F,
) where
  F: FnMut(usize) -> T,
{
  let mut built = unsafe { Constructed::new(dst, 0) };

  for i in 0..count {
    unsafe { dst.add(i).write(make(i)) };
    built.grow(1);
  }

  built.commit();
}

/// Rollback guard over a run of freshly constructed slots.
///
/// Dropping the guard destroys the run, turning the slots raw again. It is
/// meant to be dropped only while unwinding; on success the owner calls
/// [`commit`](Constructed::commit) to keep the values.
pub(crate) struct Constructed<T> {
  start: *mut T,
  len: usize,
  _values: PhantomData<T>,
}

impl<T> Constructed<T> {
  /// # Safety
  ///
  /// `[start, start + len)` must hold live values owned by nobody else
  /// for as long as the guard is armed.
  pub(crate) unsafe fn new(
    start: *mut T,
    len: usize,
  ) -> Self {
    Self {
      start,
      len,
      _values: PhantomData,
    }
  }

  pub(crate) fn grow(
    &mut self,
    additional: usize,
  ) {
    self.len += additional;
  }

  pub(crate) fn commit(self) {
    mem::forget(self);
  }
}

impl<T> Drop for Constructed<T> {
  fn drop(&mut self) {
    if self.len == 0 {
      return;
    }

    unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.start, self.len)) };
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::Cell,
    mem::MaybeUninit,
    panic::{self, AssertUnwindSafe},
  };

  use super::*;

  thread_local! {
    static CLONES: Cell<usize> = const { Cell::new(0) };
    static DROPS: Cell<usize> = const { Cell::new(0) };
  }

  struct Tracked {
    value: u32,
    fail_on_clone: Option<usize>,
  }

  impl Clone for Tracked {
    fn clone(&self) -> Self {
      let clones = CLONES.with(|c| c.get()) + 1;
      if self.fail_on_clone == Some(clones) {
        panic!("clone #{clones} failed");
      }
      CLONES.with(|c| c.set(clones));
      Self {
        value: self.value,
        fail_on_clone: self.fail_on_clone,
      }
    }
  }

  impl Drop for Tracked {
    fn drop(&mut self) {
      DROPS.with(|d| d.set(d.get() + 1));
    }
  }

  fn reset() {
    CLONES.with(|c| c.set(0));
    DROPS.with(|d| d.set(0));
  }

  fn drops() -> usize {
    DROPS.with(|d| d.get())
  }

  fn clones() -> usize {
    CLONES.with(|c| c.get())
  }

  fn sources(fail_on_clone: Option<usize>) -> [Tracked; 4] {
    [1, 2, 3, 4].map(|value| Tracked {
      value,
      fail_on_clone,
    })
  }

  #[test]
  fn test_bitwise_transfer_moves_without_cloning() {
    reset();

    let mut src = MaybeUninit::new(sources(None));
    let mut dst = MaybeUninit::<[Tracked; 4]>::uninit();

    unsafe {
      <Bitwise as Relocation<Tracked>>::transfer(src.as_mut_ptr().cast(), dst.as_mut_ptr().cast(), 4);
    }

    assert_eq!(clones(), 0);

    let dst = unsafe { dst.assume_init() };
    assert_eq!(dst.iter().map(|t| t.value).collect::<Vec<_>>(), [1, 2, 3, 4]);

    drop(dst);
    assert_eq!(drops(), 4);
  }

  #[test]
  fn test_clone_transfer_keeps_sources() {
    reset();

    let mut src = sources(None);
    let mut dst = MaybeUninit::<[Tracked; 4]>::uninit();

    unsafe {
      <ByClone as Relocation<Tracked>>::transfer(src.as_mut_ptr(), dst.as_mut_ptr().cast(), 4);
    }

    assert_eq!(clones(), 4);
    assert_eq!(drops(), 0);

    let dst = unsafe { dst.assume_init() };
    assert_eq!(dst.iter().map(|t| t.value).collect::<Vec<_>>(), [1, 2, 3, 4]);
    assert_eq!(src.iter().map(|t| t.value).collect::<Vec<_>>(), [1, 2, 3, 4]);
  }

  #[test]
  fn test_failed_clone_destroys_partial_destination() {
    reset();

    let mut src = sources(Some(3));
    let mut dst = MaybeUninit::<[Tracked; 4]>::uninit();

    let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
      <ByClone as Relocation<Tracked>>::transfer(src.as_mut_ptr(), dst.as_mut_ptr().cast(), 4);
    }));

    assert!(result.is_err());
    assert_eq!(clones(), 2);
    assert_eq!(drops(), 2);
    assert_eq!(src.iter().map(|t| t.value).collect::<Vec<_>>(), [1, 2, 3, 4]);
  }
}
