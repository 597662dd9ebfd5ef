//! Integration tests for the tileheap allocator

use core::ptr::NonNull;
use core::slice;

use tileheap::{
    ALIGNMENT, Arena, CAPACITY, ChunkState, HEADER_SIZE, HeapError, MIN_CHUNK_SIZE, PointerFault,
};

/// Check the structural invariants: chunks tile the arena exactly, every
/// payload size is a positive multiple of 8, and no two adjacent chunks are
/// both free.
fn assert_invariants(arena: &Arena) {
    let mut expected_offset = 0;
    let mut previous_free = false;
    for chunk in arena.chunks() {
        assert_eq!(chunk.offset, expected_offset, "gap or overlap in tiling");
        assert!(chunk.size > 0);
        assert_eq!(chunk.size % ALIGNMENT, 0);
        let free = chunk.state == ChunkState::Free;
        assert!(!(free && previous_free), "uncoalesced adjacent free chunks");
        previous_free = free;
        expected_offset = chunk.offset + HEADER_SIZE + chunk.size;
    }
    assert_eq!(expected_offset, CAPACITY, "chunks do not cover the arena");
}

fn fill(ptr: NonNull<u8>, len: usize, pattern: u8) {
    // SAFETY: Caller allocated at least `len` bytes at `ptr`.
    unsafe { ptr.as_ptr().write_bytes(pattern, len) };
}

fn check_fill(ptr: NonNull<u8>, len: usize, pattern: u8) {
    // SAFETY: Caller allocated at least `len` bytes at `ptr`.
    let bytes = unsafe { slice::from_raw_parts(ptr.as_ptr(), len) };
    assert!(bytes.iter().all(|&b| b == pattern));
}

#[test]
fn test_allocations_are_isolated() {
    let mut arena = Arena::new();

    let sizes = [24, 100, 8, 256, 56];
    let mut live = Vec::new();
    for (index, &size) in sizes.iter().enumerate() {
        let ptr = arena.allocate(size).unwrap();
        let pattern = 0x10 + u8::try_from(index).unwrap();
        fill(ptr, size, pattern);
        live.push((ptr, size, pattern));
    }

    // Every region still holds its own pattern after all the writes.
    for &(ptr, size, pattern) in &live {
        check_fill(ptr, size, pattern);
    }

    // Freeing one region must not disturb the others.
    let (freed, _, _) = live.remove(2);
    arena.deallocate(freed).unwrap();
    for &(ptr, size, pattern) in &live {
        check_fill(ptr, size, pattern);
    }

    for (ptr, _, _) in live {
        arena.deallocate(ptr).unwrap();
    }
    assert_invariants(&arena);
}

#[test]
fn test_memory_is_reused_after_free() {
    let mut arena = Arena::new();

    let first = arena.allocate(300).unwrap();
    arena.deallocate(first).unwrap();
    let second = arena.allocate(300).unwrap();

    // Nothing was lost: the second allocation lands in the same chunk.
    assert_eq!(first, second);
    arena.deallocate(second).unwrap();
    assert_eq!(arena.chunks().count(), 1);
}

#[test]
fn test_coalescing_produces_contiguous_space() {
    let mut arena = Arena::new();

    let a = arena.allocate(200).unwrap();
    let b = arena.allocate(200).unwrap();
    let c = arena.allocate(200).unwrap();

    arena.deallocate(b).unwrap();
    arena.deallocate(a).unwrap();
    assert_invariants(&arena);

    // Larger than one chunk, no larger than A + B + the freed boundary
    // header: only a merged hole can satisfy this.
    let merged = arena.allocate(200 + 200 + HEADER_SIZE).unwrap();
    assert_eq!(merged, a);

    arena.deallocate(merged).unwrap();
    arena.deallocate(c).unwrap();
    assert_invariants(&arena);
}

#[test]
fn test_returned_pointers_are_aligned() {
    let mut arena = Arena::new();
    for size in [1, 7, 13, 32, 99] {
        let ptr = arena.allocate(size).unwrap();
        assert_eq!(ptr.as_ptr().addr() % ALIGNMENT, 0, "size {size}");
    }
}

#[test]
fn test_leak_accounting_is_exact() {
    let mut arena = Arena::new();

    let count = 5;
    let size = 100; // rounds up to 104
    for _ in 0..count {
        let _ = arena.allocate(size).unwrap();
    }

    let report = arena.leak_report();
    assert_eq!(report.objects, count);
    assert_eq!(report.bytes, count * 104);
}

#[test]
fn test_fatal_paths_leave_arena_intact() {
    let mut arena = Arena::new();
    let ptr = arena.allocate(64).unwrap();
    fill(ptr, 64, 0xEE);
    let before: Vec<_> = arena.chunks().collect();

    // A stack address.
    let local = 0u64;
    let foreign = NonNull::from(&local).cast::<u8>();
    assert_eq!(
        arena.deallocate(foreign),
        Err(HeapError::InvalidPointer(PointerFault::OutOfBounds))
    );

    // A pointer strictly inside the payload, both misaligned and aligned.
    // SAFETY: Offsets 3 and 16 are within the 64-byte payload.
    let misaligned = unsafe { ptr.add(3) };
    let interior = unsafe { ptr.add(16) };
    assert_eq!(
        arena.deallocate(misaligned),
        Err(HeapError::InvalidPointer(PointerFault::Misaligned))
    );
    assert_eq!(
        arena.deallocate(interior),
        Err(HeapError::InvalidPointer(PointerFault::CorruptHeader))
    );

    // The same valid pointer twice.
    arena.deallocate(ptr).unwrap();
    assert_eq!(arena.deallocate(ptr), Err(HeapError::DoubleFree));

    // None of the failed frees changed what a dump would have shown.
    let mut replay = Arena::new();
    let replay_ptr = replay.allocate(64).unwrap();
    assert_eq!(replay.chunks().collect::<Vec<_>>(), before);
    replay.deallocate(replay_ptr).unwrap();
}

#[test]
fn test_capacity_exhaustion_is_idempotent() {
    let mut arena = Arena::new();
    let before: Vec<_> = arena.chunks().collect();

    let oversized = CAPACITY - HEADER_SIZE + 1;
    assert_eq!(
        arena.allocate(oversized),
        Err(HeapError::OutOfMemory(oversized))
    );

    assert_eq!(arena.chunks().collect::<Vec<_>>(), before);

    // The whole arena minus one header is still available.
    let ptr = arena.allocate(CAPACITY - HEADER_SIZE).unwrap();
    arena.deallocate(ptr).unwrap();
    assert_invariants(&arena);
}

#[test]
fn test_exhaustion_by_many_small_chunks() {
    let mut arena = Arena::new();

    let mut live = Vec::new();
    loop {
        match arena.allocate(MIN_CHUNK_SIZE - HEADER_SIZE) {
            Ok(ptr) => live.push(ptr),
            Err(HeapError::OutOfMemory(_)) => break,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // Minimum-size chunks pack the arena completely.
    assert_eq!(live.len(), CAPACITY / MIN_CHUNK_SIZE);
    assert_invariants(&arena);

    for ptr in live {
        arena.deallocate(ptr).unwrap();
    }
    assert_eq!(arena.chunks().count(), 1);
}

#[test]
fn test_stress_mixed_operations() {
    let mut arena = Arena::new();

    let mut active: Vec<(NonNull<u8>, usize, u8)> = Vec::new();
    let mut rng_state = 12345u32;

    // Simple LCG for deterministic testing
    let mut next_random = move || {
        rng_state = rng_state.wrapping_mul(1103515245).wrapping_add(12345);
        rng_state
    };

    for round in 0..500 {
        let op = next_random() % 100;

        if op < 60 {
            let size: usize = match next_random() % 4 {
                0 => 8,
                1 => 24,
                2 => 100,
                _ => 400,
            };

            match arena.allocate(size) {
                Ok(ptr) => {
                    let pattern = u8::try_from(round % 251).unwrap();
                    fill(ptr, size, pattern);
                    active.push((ptr, size, pattern));
                }
                Err(HeapError::OutOfMemory(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        } else if !active.is_empty() {
            let index = usize::try_from(next_random()).unwrap() % active.len();
            let (ptr, size, pattern) = active.swap_remove(index);
            check_fill(ptr, size, pattern);
            arena.deallocate(ptr).unwrap();
        }

        assert_invariants(&arena);
    }

    for (ptr, size, pattern) in active {
        check_fill(ptr, size, pattern);
        arena.deallocate(ptr).unwrap();
    }
    assert_invariants(&arena);
    assert!(arena.leak_report().is_clean());
}
