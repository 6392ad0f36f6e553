//! # fitalloc - A Size-Class Allocator with Pluggable Placement
//!
//! This crate provides a small `malloc`/`free`-style allocator that rounds
//! every request up to a fixed size class, remembers every block it ever
//! carved, and reuses released blocks before it grows the heap again.
//!
//! ## Overview
//!
//! Blocks are tracked in two lists. A block is always in exactly one of them:
//!
//! ```text
//!   Block Lifecycle:
//!
//!               heap growth
//!                    │
//!                    ▼
//!   ┌───────────────────────────┐   release    ┌───────────────────────────┐
//!   │        ALLOCATED          │ ───────────► │           FREE            │
//!   │  capacity, requested > 0  │ ◄─────────── │  capacity, requested = 0  │
//!   └───────────────────────────┘   strategy   └───────────────────────────┘
//!                                    search
//! ```
//!
//! Nothing is ever given back to the operating system: "free" means the
//! block is parked in the free list, waiting for the next request that fits.
//!
//! ## Crate Structure
//!
//! ```text
//!   fitalloc
//!   ├── align        - Alignment macros (align!, align_to!)
//!   ├── block        - Block record and handle
//!   ├── size_class   - Size class table and normalization
//!   ├── registry     - Allocated/free lists over a record arena
//!   ├── strategy     - PlacementStrategy trait, FirstFit, BestFit
//!   ├── heap         - HeapGrowth trait, Sbrk, BufferHeap
//!   ├── allocator    - Allocator: allocate/release
//!   ├── diagnostics  - Block listings
//!   └── driver       - alloc:/dealloc script runner
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fitalloc::{Allocator, List, Strategy};
//!
//! let mut allocator = Allocator::with_strategy(Strategy::BestFit);
//!
//! let block = allocator.allocate(40)?; // served from a 64-unit class
//! allocator.release(Some(block))?;
//!
//! // The next request that fits gets the same block back.
//! assert_eq!(allocator.allocate(50)?, block);
//!
//! print!("{}", allocator.listing(List::Allocated));
//! # Ok::<(), fitalloc::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   allocate(n)
//!     │
//!     ├─ normalize n ──► 32 │ 64 │ 128 │ 256 │ 512      (n > 512: SizeTooLarge)
//!     │
//!     ├─ strategy.search(free list)
//!     │     ├─ hit  ──► move block free → allocated, return its address
//!     │     └─ miss ──► heap.grow(class), record new block as allocated
//!     ▼
//!   address
//!
//!   release(target)
//!     ├─ nothing allocated  ──► warning, no-op
//!     ├─ None               ──► newest allocated block → free
//!     ├─ Some(known)        ──► that block → free
//!     └─ Some(unknown)      ──► InvalidReleaseTarget (fatal)
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded only**: the allocator is a plain value driven through
//!   `&mut self`
//! - **No splitting or coalescing**: a block keeps its class forever
//! - **Unix-only `Sbrk`**: heap growth through `libc::sbrk`; use
//!   [`BufferHeap`] for a bounded in-process region

pub mod align;
mod allocator;
mod block;
pub mod diagnostics;
pub mod driver;
pub mod heap;
pub mod registry;
pub mod size_class;
pub mod strategy;

pub use allocator::{AllocError, AllocStats, Allocator, Released};
pub use block::{BlockId, BlockRecord};
pub use heap::{BufferHeap, HeapError, HeapGrowth, Sbrk};
pub use registry::{List, Registry, RegistryError};
pub use strategy::{BestFit, FirstFit, FreeView, PlacementStrategy, Strategy};
