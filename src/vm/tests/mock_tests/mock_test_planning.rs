use super::mock_test_prelude::*;

type VM = MockVM<Wide>;

/// A live 64-byte object, a dead 32-byte object, then a live 128-byte object.
fn two_sequences(heap: &mut MockHeap) -> (ObjectReference, ObjectReference) {
    let a = heap.alloc_sized(0, 64, 1);
    heap.alloc_sized(0, 32, 2);
    let b = heap.alloc_sized(0, 128, 3);
    VM::set_mark(a);
    VM::set_mark(b);
    (a, b)
}

#[test]
pub fn records_of_two_sequences() {
    let mut heap = MockHeap::<Wide>::new(1);
    let (a, b) = two_sequences(&mut heap);
    let start = heap.objects_start(0);

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());

    let first = LiveSequence::read::<WideLayout>(start);
    assert_eq!(first.start, a.to_raw_address());
    // The allocation cursor starts at the objects start of the first chunk.
    assert_eq!(first.destination, start);
    assert_eq!(first.size, 64);
    assert_eq!(WideLayout::next_offset(start), 96);
    assert_eq!(first.next, Some(b.to_raw_address()));

    let second = LiveSequence::read::<WideLayout>(b.to_raw_address());
    assert_eq!(second.destination, start + 64usize);
    assert_eq!(second.size, 128);
    assert_eq!(second.next, None);

    assert!(!VM::is_marked(a));
    assert!(!VM::is_marked(b));
    // No trailing gap, so the top stays.
    assert_eq!(heap.top(0), start + 224usize);

    let stats = compactor.stats().snapshot();
    assert_eq!(stats.sequences, 2);
    assert_eq!(stats.live_bytes, 192);
    assert_eq!(stats.truncated_bytes, 0);
}

#[test]
pub fn two_sequences_are_compacted() {
    let mut heap = MockHeap::<Wide>::new(1);
    two_sequences(&mut heap);
    let start = heap.objects_start(0);

    let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let objects = heap.objects_in(0);
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].to_raw_address(), start);
    assert_eq!(VM::tag(objects[0]), 1);
    assert_eq!(objects[1].to_raw_address(), start + 64usize);
    assert_eq!(VM::tag(objects[1]), 3);
    assert_eq!(heap.top(0), start + 192usize);

    assert!(summary.empty_chunks.is_empty());
    assert_eq!(summary.stats.moved_bytes, 128);
    assert_eq!(summary.stats.chunks_compacted, 1);
    assert_eq!(summary.stats.chunks_swept, 0);
}

#[test]
pub fn two_sequences_in_a_swept_chunk() {
    let mut heap = MockHeap::<Wide>::new(1);
    let (a, b) = two_sequences(&mut heap);
    heap.set_sweep(0, true);
    let top = heap.top(0);

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());
    assert_eq!(WideLayout::destination(a.to_raw_address()), a.to_raw_address());
    assert_eq!(WideLayout::destination(b.to_raw_address()), b.to_raw_address());

    compactor.fixup(heap.first(), &mut no_roots());
    compactor.sweep(heap.first());
    let empty = compactor.compact(heap.first());
    assert!(empty.is_empty());

    assert_eq!(heap.top(0), top);
    let objects = heap.objects_in(0);
    assert_eq!(objects.len(), 3);
    assert_eq!(objects[0], a);
    assert_eq!(VM::kind(objects[1]), MockKind::ArrayFiller);
    assert_eq!(VM::get_current_size(objects[1]), 32);
    assert_eq!(objects[2], b);
    assert_eq!(VM::tag(b), 3);
    assert_eq!(compactor.stats().snapshot().filler_bytes, 32);
}

#[test]
pub fn empty_chunk() {
    let mut heap = MockHeap::<Wide>::new(1);
    for i in 0..10 {
        heap.alloc(0, i % 3, i);
    }
    let start = heap.objects_start(0);

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());
    // A single terminal record that describes nothing.
    let record = LiveSequence::read::<WideLayout>(start);
    assert_eq!(record.size, 0);
    assert_eq!(record.next, None);
    assert_eq!(record.destination, start);
    assert_eq!(heap.top(0), start);

    compactor.fixup(heap.first(), &mut no_roots());
    compactor.sweep(heap.first());
    assert_eq!(compactor.compact(heap.first()), vec![heap.first()]);
    assert_eq!(heap.top(0), start);
}

#[test]
pub fn chunk_starting_with_a_gap() {
    let mut heap = MockHeap::<Wide>::new(1);
    heap.alloc_sized(0, 48, 1);
    let live = heap.alloc_sized(0, 64, 2);
    VM::set_mark(live);
    let start = heap.objects_start(0);

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());

    let leading = LiveSequence::read::<WideLayout>(start);
    assert!(leading.is_empty());
    assert_eq!(leading.next, Some(live.to_raw_address()));
    let sequence = LiveSequence::read::<WideLayout>(live.to_raw_address());
    assert_eq!(sequence.destination, start);
    assert_eq!(sequence.size, 64);
    assert_eq!(sequence.next, None);
    assert_eq!(VM::get(heap.first(), 0), start);
    assert_eq!(VM::get(heap.first(), 1), live.to_raw_address());
}

#[test]
pub fn trailing_gap_is_truncated() {
    let mut heap = MockHeap::<Wide>::new(1);
    let live = heap.alloc_sized(0, 64, 1);
    heap.alloc_sized(0, 40, 2);
    heap.alloc_sized(0, 80, 3);
    VM::set_mark(live);
    let start = heap.objects_start(0);

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());
    assert_eq!(heap.top(0), start + 64usize);
    assert_eq!(compactor.stats().snapshot().truncated_bytes, 120);
}

#[test]
pub fn bricks_lead_to_the_sequence_covering_them() {
    let mut heap = MockHeap::<Wide>::new(1);
    let start = heap.objects_start(0);
    // [0, 3000) live, [3000, 3040) dead, [3040, 3104) live, [3104, 5000) dead, [5000, 5064) live.
    let a = heap.alloc_sized(0, 3000, 1);
    heap.alloc_sized(0, 40, 2);
    let b = heap.alloc_sized(0, 64, 3);
    heap.alloc_sized(0, 1896, 4);
    let c = heap.alloc_sized(0, 64, 5);
    for o in [a, b, c] {
        VM::set_mark(o);
    }
    assert_eq!(c.to_raw_address(), start + 5000usize);

    mock_compactor::<Wide>(1).plan(heap.first());

    let chunk = heap.first();
    assert_eq!(VM::length(chunk), BRICKS_IN_CHUNK);
    // Bricks 0..=2 are covered by `a`.
    for brick in 0..=2 {
        assert_eq!(VM::get(chunk, brick), a.to_raw_address());
    }
    // `b` ends in brick 3, `c` ends in brick 4.
    assert_eq!(VM::get(chunk, 3), b.to_raw_address());
    assert_eq!(VM::get(chunk, 4), c.to_raw_address());
    // Every later brick leads to the last sequence.
    for brick in 5..BRICKS_IN_CHUNK {
        assert_eq!(VM::get(chunk, brick), c.to_raw_address());
    }
}

#[test]
pub fn remembered_bit_survives_planning() {
    let mut heap = MockHeap::<Wide>::new(1);
    heap.alloc(0, 0, 1);
    let live = heap.alloc(0, 0, 2);
    VM::set_mark(live);
    VM::set_remembered(live);

    mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let moved = heap.find(2).unwrap();
    assert_eq!(moved.to_raw_address(), heap.objects_start(0));
    assert!(VM::is_remembered(moved));
    assert!(!VM::is_marked(moved));
}

#[test]
pub fn cursor_rolls_over_to_the_next_chunk() {
    let mut heap = MockHeap::<Wide>::new(2);
    // Chunk 0: 1KB of garbage, then live objects up to the end of the chunk.
    heap.alloc_sized(0, 1024, 0);
    let mut tag = 1;
    while heap.top(0) < heap.chunk(0).end::<VM>() {
        let o = heap.alloc_sized(0, 512, tag);
        VM::set_mark(o);
        tag += 1;
    }
    // Chunk 1: 2KB of live objects. They do not fit in the 1KB chunk 0 gives up.
    let first_in_1 = tag;
    for _ in 0..4 {
        let o = heap.alloc_sized(1, 512, tag);
        VM::set_mark(o);
        tag += 1;
    }

    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());
    let cursor_top = heap.objects_start(1) + 2048usize;
    let start1 = heap.objects_start(1);
    assert_eq!(WideLayout::destination(start1), start1);

    compactor.fixup(heap.first(), &mut no_roots());
    compactor.sweep(heap.first());
    assert!(compactor.compact(heap.first()).is_empty());

    assert_eq!(heap.top(0), heap.chunk(0).end::<VM>() - 1024usize);
    assert_eq!(heap.top(1), cursor_top);
    assert_eq!(heap.tags(), (1..tag).collect::<Vec<_>>());
    assert_eq!(
        heap.find(first_in_1).unwrap().to_raw_address(),
        heap.objects_start(1)
    );
}
