use std::io::Read;

use rsequence::{ByClone, Sequence};
use tracing_subscriber::EnvFilter;

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the process with tools like `pmap` or
/// `gdb` between steps, or just follow how the buffer moves around.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints length, capacity, buffer address and contents.
fn print_state<R>(
  label: &str,
  seq: &Sequence<String, R>,
) {
  println!(
    "[{}] size = {}, capacity = {}, buffer = {:?}, contents = {:?}",
    label,
    seq.size(),
    seq.capacity(),
    seq.as_ptr(),
    seq.as_slice(),
  );
}

fn main() -> rsequence::Result<()> {
  // Storage events are logged at trace level; RUST_LOG overrides the filter.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")))
    .init();

  let mut seq: Sequence<String> = Sequence::new();
  print_state("start", &seq);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Append three values. Capacity goes 0 -> 1 -> 2 -> 4 and the buffer
  //    moves on every growth point.
  // --------------------------------------------------------------------
  for word in ["alpha", "beta", "gamma"] {
    seq.push_back(word.to_string())?;
    print_state("1", &seq);
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Insert in the middle. There is a free slot, so the tail shifts
  //    right in place and the buffer stays where it is.
  // --------------------------------------------------------------------
  let pos = seq.insert(seq.begin() + 1, "inserted".to_string())?;
  println!("\n[2] Inserted {:?} at offset {}", seq.element(pos), pos - seq.begin());
  print_state("2", &seq);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Insert into the now full sequence. The new value is built in a
  //    fresh buffer of twice the capacity before anything else moves.
  // --------------------------------------------------------------------
  seq.emplace(seq.begin(), || "front".to_string())?;
  print_state("3", &seq);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Erase, pop and reserve.
  // --------------------------------------------------------------------
  let next = seq.erase(seq.begin() + 2);
  println!("\n[4] After erase the cursor points at {:?}", seq.element(next));
  seq.pop_back();
  seq.reserve(32)?;
  print_state("4", &seq);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) A fallible constructor that fails leaves everything untouched.
  // --------------------------------------------------------------------
  let result = seq.try_emplace_back(|| "not a number".parse::<u32>().map(|n| n.to_string()));
  if let Err(err) = result {
    println!("\n[5] {err}");
  }
  print_state("5", &seq);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) Same operations with the clone-based relocation policy: every
  //    reallocation now clones the values and drops the originals.
  // --------------------------------------------------------------------
  let mut cloned: Sequence<String, ByClone> = Sequence::new();
  for word in seq.iter() {
    cloned.push_back(word.clone())?;
    print_state("6", &cloned);
  }

  let mut copy = cloned.try_clone()?;
  copy.assign_from(&cloned)?;
  print_state("6 copy", &copy);

  // --------------------------------------------------------------------
  // 7) End of demo. Both sequences drop their values, then free their
  //    buffers.
  // --------------------------------------------------------------------
  println!("\n[7] End of example.");

  Ok(())
}
