// The compressed flavor: 4-byte references relative to the heap start, and 8-byte relocation
// records holding scaled displacements. The compressed base is global, so these tests run
// serially.

use super::mock_test_prelude::*;

type VM = MockVM<Compressed>;
type Layout = CompressedLayout<LOG_MOCK_COMPRESSED_SHIFT>;

fn compress(object: ObjectReference) -> u32 {
    CompressedSlot::compress(object, VM::compressed_base(), LOG_MOCK_COMPRESSED_SHIFT)
}

#[test]
pub fn object_sizes() {
    assert_eq!(VM::object_size(0), 24);
    assert_eq!(VM::object_size(1), 32);
    assert_eq!(VM::object_size(2), 32);
    assert_eq!(VM::object_size(3), 40);
}

#[test]
pub fn records_of_two_sequences() {
    serial_test(|| {
        let mut heap = MockHeap::<Compressed>::new(1);
        let start = heap.objects_start(0);
        let a = heap.alloc_sized(0, 64, 1);
        heap.alloc_sized(0, 32, 2);
        let b = heap.alloc_sized(0, 128, 3);
        VM::set_mark(a);
        VM::set_mark(b);

        mock_compactor::<Compressed>(1).plan(heap.first());

        assert_eq!(Layout::record_address(start), start - 8usize);
        let first = LiveSequence::read::<Layout>(start);
        assert_eq!(first.destination, start);
        assert_eq!(first.size, 64);
        assert_eq!(first.next, Some(b.to_raw_address()));
        // The second sequence moves down by the size of the gap.
        let second = LiveSequence::read::<Layout>(b.to_raw_address());
        assert_eq!(second.destination, start + 64usize);
        assert_eq!(second.size, 128);
        assert_eq!(second.next, None);
        assert_eq!(
            new_address::<VM>(heap.first(), b.to_raw_address() + 40usize),
            Some(start + 104usize)
        );
    })
}

#[test]
pub fn compressed_references_are_fixed() {
    serial_test(|| {
        let mut heap = MockHeap::<Compressed>::new(2);
        let start = heap.objects_start(0);
        heap.alloc(0, 0, 100);
        let a = heap.alloc(0, 2, 1);
        heap.alloc_sized(0, 48, 101);
        let b = heap.alloc(0, 1, 2);
        heap.alloc_sized(1, 64, 102);
        let c = heap.alloc(1, 3, 3);
        heap.set_ref(a, 0, Some(c));
        heap.set_ref(a, 1, Some(b));
        heap.set_ref(b, 0, Some(a));
        heap.set_ref(c, 2, Some(b));
        for o in [a, b, c] {
            VM::set_mark(o);
        }

        let summary = mock_compactor::<Compressed>(2).collect(heap.first(), &mut no_roots());

        let a = heap.find(1).unwrap();
        let b = heap.find(2).unwrap();
        let c = heap.find(3).unwrap();
        assert_eq!(a.to_raw_address(), start);
        assert_eq!(b.to_raw_address(), start + 32usize);
        assert_eq!(c.to_raw_address(), start + 64usize);
        assert_eq!(heap.top(0), start + 104usize);
        assert_eq!(heap.get_ref(a, 0), Some(c));
        assert_eq!(heap.get_ref(a, 1), Some(b));
        assert_eq!(heap.get_ref(b, 0), Some(a));
        assert_eq!(heap.get_ref(c, 0), None);
        assert_eq!(heap.get_ref(c, 2), Some(b));
        // The raw field holds the scaled offset from the base.
        let raw = unsafe { (a.to_raw_address() + REFS_OFFSET).load::<u32>() };
        assert_eq!(raw, compress(c));
        assert_eq!(raw as usize, (c.to_raw_address() - heap.chunk(0).start()) >> 3);

        assert_eq!(summary.empty_chunks, vec![heap.chunk(1)]);
        assert_eq!(summary.stats.references_fixed, 4);
        heap.verify_first_object_table(0);
    })
}

#[test]
pub fn compressed_root_runs() {
    serial_test(|| {
        let mut heap = MockHeap::<Compressed>::new(1);
        let dead = heap.alloc(0, 0, 100);
        let a = heap.alloc(0, 0, 1);
        heap.alloc(0, 0, 101);
        let b = heap.alloc(0, 1, 2);
        VM::set_mark(a);
        VM::set_mark(b);

        let mut strong: Vec<u32> = vec![compress(b), 0, compress(a)];
        let mut weak: Vec<u32> = vec![compress(dead), compress(b)];
        let mut roots = RootSet {
            slots: vec![
                RootSlots::new(
                    Address::from_mut_ptr(strong.as_mut_ptr()),
                    strong.len(),
                    true,
                    RootStrength::Strong,
                ),
                RootSlots::new(
                    Address::from_mut_ptr(weak.as_mut_ptr()),
                    weak.len(),
                    true,
                    RootStrength::Weak,
                ),
            ],
            holders: vec![],
        };

        let summary = mock_compactor::<Compressed>(1).collect(heap.first(), &mut roots);

        let a = heap.find(1).unwrap();
        let b = heap.find(2).unwrap();
        assert_eq!(strong, vec![compress(b), 0, compress(a)]);
        assert_eq!(weak, vec![0, compress(b)]);
        assert_eq!(summary.stats.references_cleared, 1);
    })
}

#[test]
pub fn compressed_reference_objects() {
    serial_test(|| {
        let mut heap = MockHeap::<Compressed>::new(1);
        let dead = heap.alloc(0, 0, 100);
        let live = heap.alloc(0, 0, 2);
        let reference = heap.alloc_reference(0, 2, 1);
        heap.set_ref(reference, 0, Some(dead));
        heap.set_ref(reference, 1, Some(live));

        let compactor = mock_compactor::<Compressed>(1);
        let mut stack = compactor.new_mark_stack();
        heap.mark_from(&mut stack, &[reference]);
        assert!(VM::is_marked(live));
        assert!(!VM::is_marked(dead));

        compactor.collect(heap.first(), &mut no_roots());

        let reference = heap.find(1).unwrap();
        assert_eq!(heap.tags(), vec![2, 1]);
        assert_eq!(heap.get_ref(reference, 0), None);
        assert_eq!(heap.get_ref(reference, 1), heap.find(2));
        assert_eq!(VM::get_current_size(reference), 32);
    })
}
