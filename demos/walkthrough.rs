use std::io::Read;

use fitalloc::{Allocator, List, Strategy, diagnostics::print_program_break};

/// With `--step`, waits until the user presses ENTER so the heap can be
/// inspected with `pmap`, `gdb` or `/proc/<pid>/maps` between steps.
fn pause(step: bool) {
  if step {
    println!("\n>>> Press ENTER to continue...");
    let _ = std::io::stdin().bytes().next();
  }
}

fn show(allocator: &Allocator) {
  println!("  allocated:");
  for line in allocator.listing(List::Allocated).lines() {
    println!("    {line}");
  }
  println!("  free:");
  for line in allocator.listing(List::Free).lines() {
    println!("    {line}");
  }
}

fn main() -> Result<(), fitalloc::AllocError> {
  let step = std::env::args().any(|arg| arg == "--step");
  let strategy = if std::env::args().any(|arg| arg == "--first-fit") {
    Strategy::FirstFit
  } else {
    Strategy::BestFit
  };

  let mut allocator = Allocator::with_strategy(strategy);
  println!("Strategy: {}", allocator.strategy_name());

  print_program_break("start");
  pause(step);

  // 1) Three requests in three different size classes. Each one grows the
  //    heap, so the program break moves every time.
  let small = allocator.allocate(20)?;
  let medium = allocator.allocate(100)?;
  let large = allocator.allocate(300)?;
  println!("\n[1] allocate(20), allocate(100), allocate(300)");
  print_program_break("after growth");
  show(&allocator);

  // The blocks are plain memory; write into one to show it is usable.
  unsafe {
    medium.as_ptr().write_bytes(0xAB, 100);
    println!("[1] medium[99] = 0x{:X}", *medium.as_ptr().add(99));
  }
  pause(step);

  // 2) Release the large block by address and the newest remaining one
  //    (medium) with the LIFO form.
  allocator.release(Some(large))?;
  allocator.release(None)?;
  println!("\n[2] release(large), release(None)");
  show(&allocator);
  pause(step);

  // 3) A 90-unit request normalizes to 128. Best-fit picks the 128 block,
  //    first-fit picks whatever sufficient block comes first.
  let reused = allocator.allocate(90)?;
  println!("\n[3] allocate(90)");
  println!(
    "[3] reused = {:?} ({})",
    reused,
    if reused == medium {
      "the 128 block"
    } else if reused == large {
      "the 512 block"
    } else {
      "a new block"
    }
  );
  print_program_break("after reuse");
  show(&allocator);
  pause(step);

  // 4) Releasing something twice is a contract violation.
  allocator.release(Some(small))?;
  match allocator.release(Some(small)) {
    Ok(outcome) => println!("\n[4] second release returned {outcome:?}"),
    Err(err) => println!("\n[4] second release rejected (fatal = {}): {err}", err.is_fatal()),
  }

  // 5) Requests beyond the largest class are refused.
  if let Err(err) = allocator.allocate(4096) {
    println!("[5] allocate(4096): {err}");
  }

  let stats = allocator.stats();
  println!(
    "\n[6] {} allocations, {} reused, {} heap growths ({} bytes), {} releases",
    stats.allocations, stats.reused, stats.heap_growths, stats.bytes_grown, stats.releases
  );
  println!("[6] sbrk moved the break by {} bytes in total", allocator.heap().bytes_grown());
  println!("[6] End of walkthrough. The OS reclaims the heap when the process exits.");

  Ok(())
}
