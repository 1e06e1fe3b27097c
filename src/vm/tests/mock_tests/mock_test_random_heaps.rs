// Compact randomly generated object graphs and compare the result with what marking saw before
// the cycle.

use super::mock_test_prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

type VM = MockVM<Wide>;

const CHUNKS: usize = 4;
const SEEDS: u64 = 8;

/// What the heap must look like after a cycle, in terms of tags.
struct Expected {
    /// Tags of the surviving objects, in address order.
    tags: Vec<usize>,
    /// The tags each surviving object refers to, field by field.
    refs: HashMap<usize, Vec<Option<usize>>>,
    /// Tags of the objects in swept chunks, with their offsets from the heap start.
    pinned: Vec<(usize, usize)>,
    /// Tags of the roots.
    roots: Vec<usize>,
    live_bytes: usize,
    cleared: usize,
}

fn offset_in(heap: &MockHeap, object: ObjectReference) -> usize {
    object.to_raw_address() - heap.first().start()
}

/// Fill every chunk with random objects, link them at random and mark from a few roots.
fn random_heap(seed: u64, sweep: bool) -> (MockHeap, Vec<usize>, Expected) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut heap = MockHeap::<Wide>::new(CHUNKS);
    let mut objects = vec![];
    let mut tag = 1;
    for i in 0..CHUNKS {
        while heap.top(i) + 4096usize <= heap.chunk(i).end::<VM>() {
            let object = match rng.random_range(0..10) {
                0 => heap.alloc_reference(i, rng.random_range(1..4), tag),
                1 => heap.alloc_sized(i, rng.random_range(3..400) * 8, tag),
                _ => heap.alloc(i, rng.random_range(0..6), tag),
            };
            objects.push(object);
            tag += 1;
        }
        if sweep && rng.random_bool(0.3) {
            heap.set_sweep(i, true);
        }
    }
    for object in objects.iter() {
        for field in 0..VM::nrefs(*object) {
            if rng.random_bool(0.5) {
                let target = objects[rng.random_range(0..objects.len())];
                heap.set_ref(*object, field, Some(target));
            }
        }
    }
    let roots: Vec<ObjectReference> = objects
        .iter()
        .copied()
        .filter(|_| rng.random_bool(0.05))
        .collect();

    let compactor = mock_compactor::<Wide>(1);
    let mut stack = compactor.new_mark_stack();
    heap.mark_from(&mut stack, &roots);

    let live: Vec<ObjectReference> = objects
        .iter()
        .copied()
        .filter(|o| VM::is_marked(*o))
        .collect();
    let mut cleared = 0;
    let refs = live
        .iter()
        .map(|o| {
            let targets = (0..VM::nrefs(*o))
                .map(|field| {
                    let target = heap.get_ref(*o, field)?;
                    if VM::is_marked(target) {
                        Some(VM::tag(target))
                    } else {
                        assert!(VM::is_reference(*o) && field == 0);
                        cleared += 1;
                        None
                    }
                })
                .collect();
            (VM::tag(*o), targets)
        })
        .collect();
    let pinned = live
        .iter()
        .filter(|o| VM::should_sweep(Chunk::align_down::<VM>(o.to_raw_address())))
        .map(|o| (VM::tag(*o), offset_in(&heap, *o)))
        .collect();
    let expected = Expected {
        tags: live.iter().map(|o| VM::tag(*o)).collect(),
        refs,
        pinned,
        roots: roots.iter().map(|o| VM::tag(*o)).collect(),
        live_bytes: live.iter().map(|o| VM::get_current_size(*o)).sum(),
        cleared,
    };
    let root_words = roots
        .iter()
        .map(|o| o.to_raw_address().as_usize())
        .collect();
    (heap, root_words, expected)
}

fn root_set(words: &mut [usize]) -> RootSet {
    RootSet {
        slots: vec![RootSlots::new(
            Address::from_mut_ptr(words.as_mut_ptr()),
            words.len(),
            false,
            RootStrength::Strong,
        )],
        holders: vec![],
    }
}

/// Every surviving object by tag.
fn objects_by_tag(heap: &MockHeap) -> HashMap<usize, ObjectReference> {
    (0..CHUNKS)
        .flat_map(|i| heap.objects_in(i))
        .filter(|o| !VM::kind(*o).is_filler())
        .map(|o| (VM::tag(o), o))
        .collect()
}

fn check(heap: &MockHeap, roots: &[usize], expected: &Expected, summary: &CompactionSummary) {
    assert_eq!(heap.tags(), expected.tags);
    let by_tag = objects_by_tag(heap);
    for (tag, targets) in expected.refs.iter() {
        let object = by_tag[tag];
        assert!(!VM::is_marked(object), "{} is still marked", object);
        let actual: Vec<Option<usize>> = (0..VM::nrefs(object))
            .map(|field| heap.get_ref(object, field).map(VM::tag))
            .collect();
        assert_eq!(&actual, targets, "fields of {}", object);
    }
    for (tag, offset) in expected.pinned.iter() {
        assert_eq!(offset_in(heap, by_tag[tag]), *offset, "object {} moved", tag);
    }
    let root_tags: Vec<usize> = roots
        .iter()
        .map(|word| {
            let object = ObjectReference::from_raw_address(unsafe { Address::from_usize(*word) });
            VM::tag(object.unwrap())
        })
        .collect();
    assert_eq!(root_tags, expected.roots);
    for (root, tag) in roots.iter().zip(expected.roots.iter()) {
        assert_eq!(*root, by_tag[tag].to_raw_address().as_usize());
    }
    for i in 0..CHUNKS {
        heap.verify_first_object_table(i);
    }
    assert_eq!(summary.stats.live_bytes, expected.live_bytes);
    assert_eq!(summary.stats.references_cleared, expected.cleared);
    for chunk in summary.empty_chunks.iter() {
        assert!(!VM::should_sweep(*chunk));
        assert_eq!(VM::top(*chunk), VM::objects_start(*chunk));
    }
}

#[test]
pub fn compacted_heaps_keep_their_graph() {
    for seed in 0..SEEDS {
        let (heap, mut roots, expected) = random_heap(seed, false);
        let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut root_set(&mut roots));
        check(&heap, &roots, &expected, &summary);
        assert_eq!(summary.stats.chunks_swept, 0);
    }
}

#[test]
pub fn partly_swept_heaps_keep_their_graph() {
    for seed in 0..SEEDS {
        let (heap, mut roots, expected) = random_heap(seed, true);
        let summary = mock_compactor::<Wide>(1).collect(heap.first(), &mut root_set(&mut roots));
        check(&heap, &roots, &expected, &summary);
    }
}

#[test]
pub fn parallel_and_sequential_cycles_agree() {
    for seed in 0..SEEDS {
        let layouts: Vec<Vec<(usize, usize)>> = [1, 4]
            .iter()
            .map(|threads| {
                let (heap, mut roots, expected) = random_heap(seed, true);
                let summary = mock_compactor::<Wide>(*threads)
                    .collect(heap.first(), &mut root_set(&mut roots));
                check(&heap, &roots, &expected, &summary);
                (0..CHUNKS)
                    .flat_map(|i| heap.objects_in(i))
                    .map(|o| {
                        let tag = if VM::kind(o).is_filler() { 0 } else { VM::tag(o) };
                        (tag, offset_in(&heap, o))
                    })
                    .collect()
            })
            .collect();
        assert_eq!(layouts[0], layouts[1], "seed {}", seed);
    }
}
