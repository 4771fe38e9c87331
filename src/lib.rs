//! # rsequence - A Contiguous Growable Sequence
//!
//! This crate provides [`Sequence`], a dynamically resizable array that
//! keeps memory allocation and value construction strictly apart. Storage is
//! requested from the host C allocator as raw bytes; values are built into
//! it one slot at a time.
//!
//! ## Overview
//!
//! ```text
//!   Sequence<T, R>
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │  size = 3                                                        │
//!   │  RawStorage<T>                                                   │
//!   │   ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┬──────┐      │
//!   │   │ live │ live │ live │ raw  │ raw  │ raw  │ raw  │ raw  │      │
//!   │   └──────┴──────┴──────┴──────┴──────┴──────┴──────┴──────┘      │
//!   │   ▲                    ▲                                   ▲     │
//!   │   begin()              end()                        capacity = 8 │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The first `size` slots always hold live values and the rest are raw,
//! including after a constructor panics or returns an error halfway through
//! an operation.
//!
//! ## Crate Structure
//!
//! ```text
//!   rsequence
//!   ├── raw       - RawStorage: owned uninitialized buffer (malloc/free)
//!   ├── relocate  - Relocation policies (Bitwise, ByClone) and rollback guards
//!   ├── cursor    - Cursor: raw positional handle into a sequence
//!   ├── sequence  - Sequence: the container
//!   └── error     - SequenceError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rsequence::Sequence;
//!
//! let mut seq: Sequence<i32> = Sequence::new();
//!
//! seq.push_back(10)?;
//! seq.push_back(20)?;
//! seq.push_back(30)?;
//! assert_eq!(seq.capacity(), 4);
//!
//! seq.insert(seq.begin() + 1, 15)?;
//! seq.erase(seq.end() - 1);
//!
//! assert_eq!(seq.as_slice(), [10, 15, 20]);
//! # Ok::<(), rsequence::SequenceError>(())
//! ```
//!
//! ## Growth
//!
//! Appending or inserting into a full sequence allocates a new buffer of
//! twice the capacity (one slot when empty), builds the new value in it
//! first, relocates the existing values around it and only then releases
//! the old buffer:
//!
//! ```text
//!   old  ┌───┬───┐                 new  ┌───┬───┬───┬───┐
//!        │ x │ y │        1. build      │   │   │ z │   │
//!        └───┴───┘        2. relocate   │ x │ y │ z │   │
//!                         3. free old   └───┴───┴───┴───┘
//! ```
//!
//! If step 1 or 2 fails, the new buffer is released and the sequence is left
//! exactly as it was.
//!
//! ## Relocation Policies
//!
//! - [`Bitwise`] (default): values are moved with `memcpy`. Never fails.
//! - [`ByClone`]: values are cloned into the new buffer and the originals
//!   dropped afterwards. A panicking clone rolls back the new buffer.
//!
//! ## Errors
//!
//! Allocation failures (including capacity overflow) and errors returned by
//! fallible constructors (`try_emplace_back`, `try_emplace`) are reported as
//! [`SequenceError`]. Panics from `Clone`, `Default` or constructor closures
//! unwind through the sequence, which cleans up on the way out. Precondition
//! violations (index out of range, foreign cursors) panic.
//!
//! ## Logging
//!
//! Buffer allocations, releases and reallocations are reported through the
//! [`log`] facade at `trace` level; failed allocations at `debug` level.
//!
//! ## Limitations
//!
//! - **Single-owner mutation**: no internal synchronization
//! - **No shrinking**: capacity only ever grows
//! - **Default alignment only**: element types must not need more alignment
//!   than `malloc` provides
//! - **Unix-only**: requires `libc`

mod cursor;
mod error;
mod raw;
mod relocate;
mod sequence;

pub use cursor::Cursor;
pub use error::{Result, SequenceError};
pub use raw::RawStorage;
pub use relocate::{Bitwise, ByClone, Relocation};
pub use sequence::Sequence;
