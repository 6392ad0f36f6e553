//! Property tests for the block-list invariants.
//!
//! For any sequence of allocate/release calls:
//! - every address handed out is in the allocated list until it is released,
//!   and in the free list afterwards;
//! - each record is in exactly one list;
//! - no two records share an address;
//! - an allocated record never holds more than its capacity.

use std::{collections::HashSet, ptr::NonNull};

use fitalloc::{
  AllocError, Allocator, BestFit, BufferHeap, FirstFit, HeapGrowth, List, PlacementStrategy,
  Released,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
  Alloc(usize),
  /// Release one of the outstanding blocks, picked by index modulo count.
  Release(usize),
  ReleaseNewest,
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (0usize..=600).prop_map(Op::Alloc),
    2 => any::<usize>().prop_map(Op::Release),
    1 => Just(Op::ReleaseNewest),
  ]
}

fn check_invariants<S: PlacementStrategy, H: HeapGrowth>(
  allocator: &Allocator<S, H>,
  outstanding: &[NonNull<u8>],
  released: &HashSet<NonNull<u8>>,
) {
  let registry = allocator.registry();
  let allocated: Vec<_> = registry.iter(List::Allocated).collect();
  let free: Vec<_> = registry.iter(List::Free).collect();

  // Membership: every record sits in exactly one list.
  assert_eq!(allocated.len() + free.len(), registry.block_count());
  assert_eq!(allocated.len(), registry.len(List::Allocated));
  assert_eq!(free.len(), registry.len(List::Free));
  for &id in &allocated {
    assert_eq!(registry.list_of(id), Some(List::Allocated));
  }
  for &id in &free {
    assert_eq!(registry.list_of(id), Some(List::Free));
  }

  // Uniqueness across both lists.
  let addresses: HashSet<_> = allocated
    .iter()
    .chain(&free)
    .map(|&id| registry.get(id).unwrap().address)
    .collect();
  assert_eq!(addresses.len(), registry.block_count());

  // Capacity.
  for &id in &allocated {
    let record = registry.get(id).unwrap();
    assert!(record.requested_size <= record.capacity);
  }
  for &id in &free {
    assert_eq!(registry.get(id).unwrap().requested_size, 0);
  }

  // Caller view matches registry view.
  for &address in outstanding {
    assert!(registry.find_by_address(List::Allocated, address).is_some());
  }
  for &address in released {
    if !outstanding.contains(&address) {
      assert!(registry.find_by_address(List::Free, address).is_some());
    }
  }
  assert_eq!(outstanding.len(), allocated.len());
}

fn exercise<S: PlacementStrategy>(
  strategy: S,
  ops: Vec<Op>,
) {
  let mut allocator = Allocator::new(strategy, BufferHeap::with_capacity(1 << 20).unwrap());
  let mut outstanding: Vec<NonNull<u8>> = Vec::new();
  let mut released = HashSet::new();

  for op in ops {
    match op {
      Op::Alloc(size) => match allocator.allocate(size) {
        Ok(address) => {
          assert!(!outstanding.contains(&address));
          outstanding.push(address);
        }
        Err(err) => {
          assert_eq!(err, AllocError::SizeTooLarge { requested: size, max: 512 });
          assert!(size > 512);
        }
      },
      Op::Release(pick) => {
        if outstanding.is_empty() {
          assert_eq!(allocator.release(None), Ok(Released::NothingAllocated));
        } else {
          let address = outstanding.remove(pick % outstanding.len());
          assert!(matches!(allocator.release(Some(address)), Ok(Released::Block(_))));
          released.insert(address);
        }
      }
      Op::ReleaseNewest => {
        // `None` takes the head of the allocated list; mirror it in the
        // caller's view.
        let head = allocator.registry().head_of(List::Allocated);
        let outcome = allocator.release(None).unwrap();
        match head {
          None => assert_eq!(outcome, Released::NothingAllocated),
          Some(id) => {
            assert_eq!(outcome, Released::Block(id));
            let address = allocator.registry().get(id).unwrap().address;
            outstanding.retain(|&held| held != address);
            released.insert(address);
          }
        }
      }
    }

    check_invariants(&allocator, &outstanding, &released);
  }
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn first_fit_keeps_list_invariants(ops in proptest::collection::vec(op(), 1..80)) {
    exercise(FirstFit, ops);
  }

  #[test]
  fn best_fit_keeps_list_invariants(ops in proptest::collection::vec(op(), 1..80)) {
    exercise(BestFit, ops);
  }

  #[test]
  fn best_fit_never_wastes_more_than_first_fit_on_one_request(
    capacities in proptest::collection::vec(
      prop_oneof![Just(32usize), Just(64), Just(128), Just(256), Just(512)],
      1..12,
    ),
    request in 0usize..=512,
  ) {
    let mut first = Allocator::new(FirstFit, BufferHeap::with_capacity(1 << 16).unwrap());
    let mut best = Allocator::new(BestFit, BufferHeap::with_capacity(1 << 16).unwrap());
    fill_free_list(&mut first, &capacities);
    fill_free_list(&mut best, &capacities);

    let first_block = first.allocate(request).unwrap();
    let best_block = best.allocate(request).unwrap();

    prop_assert!(allocated_capacity(&best, best_block) <= allocated_capacity(&first, first_block));
  }
}

/// Parks one free block per entry of `capacities`.
fn fill_free_list<S: PlacementStrategy, H: HeapGrowth>(
  allocator: &mut Allocator<S, H>,
  capacities: &[usize],
) {
  let addresses: Vec<_> = capacities
    .iter()
    .map(|&capacity| allocator.allocate(capacity).unwrap())
    .collect();
  for address in addresses {
    allocator.release(Some(address)).unwrap();
  }
}

fn allocated_capacity<S: PlacementStrategy, H: HeapGrowth>(
  allocator: &Allocator<S, H>,
  address: NonNull<u8>,
) -> usize {
  let registry = allocator.registry();
  let id = registry.find_by_address(List::Allocated, address).unwrap();
  registry.get(id).unwrap().capacity
}
