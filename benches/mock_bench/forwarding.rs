use criterion::Criterion;
use rand::Rng;

use chunk_compactor::policy::compact::forwarding::new_address;
use chunk_compactor::util::test_util::fixtures::*;
use chunk_compactor::util::test_util::mock_vm::{MockVM, Wide};
use chunk_compactor::util::Address;
use chunk_compactor::vm::ChunkModel;

const LOOKUPS: usize = 1024;

pub fn bench(c: &mut Criterion) {
    for live_percent in [10, 90] {
        let heap = super::marked_heap(1, live_percent);
        mock_compactor::<Wide>(1).plan(heap.first());

        // Pointers anywhere below the top, live or not.
        let mut rng = super::get_rng();
        let start = MockVM::<Wide>::objects_start(heap.first());
        let top = MockVM::<Wide>::top(heap.first());
        let pointers: Vec<Address> = (0..LOOKUPS)
            .map(|_| start + (rng.random_range(0..(top - start) / 8) * 8))
            .collect();

        c.bench_function(
            &format!("new_address - {}% live, {} lookups", live_percent, LOOKUPS),
            |b| {
                b.iter(|| {
                    for ptr in pointers.iter() {
                        criterion::black_box(new_address::<MockVM<Wide>>(heap.first(), *ptr));
                    }
                })
            },
        );
    }
}
