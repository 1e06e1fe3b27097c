use super::mock_test_prelude::*;

type VM = MockVM<Wide>;

#[test]
pub fn references_follow_moved_objects() {
    let mut heap = MockHeap::<Wide>::new(2);
    heap.alloc(0, 0, 100);
    let x = heap.alloc(0, 2, 1);
    heap.alloc(1, 3, 101);
    let y = heap.alloc(1, 1, 2);
    heap.set_ref(x, 0, Some(y));
    heap.set_ref(x, 1, Some(x));
    heap.set_ref(y, 0, Some(x));
    VM::set_mark(x);
    VM::set_mark(y);

    let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let x = heap.find(1).unwrap();
    let y = heap.find(2).unwrap();
    assert_eq!(x.to_raw_address(), heap.objects_start(0));
    assert_eq!(
        y.to_raw_address(),
        heap.objects_start(0) + VM::object_size(2)
    );
    assert_eq!(heap.get_ref(x, 0), Some(y));
    assert_eq!(heap.get_ref(x, 1), Some(x));
    assert_eq!(heap.get_ref(y, 0), Some(x));
    assert_eq!(summary.stats.references_fixed, 3);
    assert_eq!(summary.stats.references_cleared, 0);
    assert_eq!(summary.empty_chunks, vec![heap.chunk(1)]);
}

#[test]
pub fn null_references_are_left_alone() {
    let mut heap = MockHeap::<Wide>::new(1);
    heap.alloc(0, 0, 100);
    let x = heap.alloc(0, 3, 1);
    VM::set_mark(x);

    let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let x = heap.find(1).unwrap();
    for i in 0..3 {
        assert_eq!(heap.get_ref(x, i), None);
    }
    assert_eq!(summary.stats.references_fixed, 0);
}

#[test]
pub fn references_outside_the_space_are_left_alone() {
    let mut heap = MockHeap::<Wide>::new(1);
    let outside = heap.alloc_outside(0, 50);
    heap.alloc(0, 0, 100);
    let x = heap.alloc(0, 1, 1);
    heap.set_ref(x, 0, Some(outside));
    VM::set_mark(x);

    mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let x = heap.find(1).unwrap();
    assert_eq!(heap.get_ref(x, 0), Some(outside));
}

#[test]
pub fn dead_referent_of_a_reference_object_is_cleared() {
    let mut heap = MockHeap::<Wide>::new(1);
    let dead = heap.alloc(0, 0, 100);
    let live = heap.alloc(0, 0, 2);
    // The referent is dead, the other field points to a live object.
    let reference = heap.alloc_reference(0, 2, 1);
    heap.set_ref(reference, 0, Some(dead));
    heap.set_ref(reference, 1, Some(live));
    VM::set_mark(live);
    VM::set_mark(reference);

    let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let reference = heap.find(1).unwrap();
    let live = heap.find(2).unwrap();
    assert!(VM::is_reference(reference));
    assert_eq!(heap.get_ref(reference, 0), None);
    assert_eq!(heap.get_ref(reference, 1), Some(live));
    assert_eq!(summary.stats.references_cleared, 1);
    assert_eq!(summary.stats.references_fixed, 1);
}

#[test]
pub fn live_referent_of_a_reference_object_is_fixed() {
    let mut heap = MockHeap::<Wide>::new(1);
    heap.alloc(0, 0, 100);
    let referent = heap.alloc(0, 0, 2);
    let reference = heap.alloc_reference(0, 1, 1);
    heap.set_ref(reference, 0, Some(referent));
    VM::set_mark(referent);
    VM::set_mark(reference);

    mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());

    let reference = heap.find(1).unwrap();
    let referent = heap.find(2).unwrap();
    assert_eq!(referent.to_raw_address(), heap.objects_start(0));
    assert_eq!(heap.get_ref(reference, 0), Some(referent));
}

#[test]
#[should_panic(expected = "refers to dead object")]
pub fn dead_referent_of_an_ordinary_object_is_fatal() {
    let mut heap = MockHeap::<Wide>::new(1);
    let dead = heap.alloc(0, 0, 100);
    let x = heap.alloc(0, 1, 1);
    heap.set_ref(x, 0, Some(dead));
    VM::set_mark(x);

    mock_compactor::<Wide>(1).collect(heap.first(), &mut no_roots());
}

#[test]
pub fn fixup_slot_with_holders() {
    let mut heap = MockHeap::<Wide>::new(1);
    let dead = heap.alloc(0, 0, 100);
    let live = heap.alloc(0, 0, 1);
    VM::set_mark(live);
    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());

    let fixup = fixup::ReferenceFixup::<VM>::new(compactor.stats());
    let holder = heap.alloc_outside(2, 50);
    heap.set_ref(holder, 0, Some(live));
    heap.set_ref(holder, 1, Some(dead));

    fixup.fixup_slot(VM::ref_slot(holder, 0), Holder::Object(holder));
    assert_eq!(
        heap.get_ref(holder, 0).unwrap().to_raw_address(),
        heap.objects_start(0)
    );
    // A slot without a holder object tolerates a dead referent.
    fixup.fixup_slot(VM::ref_slot(holder, 1), Holder::Absent);
    assert_eq!(heap.get_ref(holder, 1), None);
}

#[test]
pub fn fixup_a_run_of_slots() {
    let mut heap = MockHeap::<Wide>::new(1);
    heap.alloc(0, 0, 100);
    let live: Vec<ObjectReference> = (1..=4)
        .map(|tag| {
            let o = heap.alloc(0, 0, tag);
            VM::set_mark(o);
            o
        })
        .collect();
    let compactor = mock_compactor::<Wide>(1);
    compactor.plan(heap.first());

    // Every other word of the run is a slot.
    let mut words: Vec<usize> = vec![0; 8];
    for (i, o) in live.iter().enumerate() {
        words[i * 2] = o.to_raw_address().as_usize();
        words[i * 2 + 1] = 0xdead;
    }
    let fixup = fixup::ReferenceFixup::<VM>::new(compactor.stats());
    fixup.fixup_references(
        Address::from_mut_ptr(words.as_mut_ptr()),
        false,
        16,
        Holder::Absent,
        live.len(),
    );
    let object_size = VM::object_size(0);
    for i in 0..live.len() {
        assert_eq!(
            words[i * 2],
            (heap.objects_start(0) + i * object_size).as_usize()
        );
        assert_eq!(words[i * 2 + 1], 0xdead);
    }
}
