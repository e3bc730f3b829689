#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use hyperloglogplus::{HyperLogLog as HyperLogLogTrait, HyperLogLogPlus};
use pacsketch::{HyperLogLog, MinHash};
use std::hash::BuildHasherDefault;
use tabled::{
    settings::{Settings, Style},
    Table, Tabled,
};
use wyhash::WyHash;

const PREFIX_BITS: u8 = 12;
const K: usize = 256;

#[derive(Tabled)]
struct Record {
    cardinality: usize,
    hyperloglog: String,
    minhash: String,
    hyperloglogplus: String,
    probabilistic_collections: String,
}

struct Usage {
    size_of: usize,
    total_bytes: u64,
    total_blocks: u64,
    max_bytes: usize,
    curr_bytes: usize,
}

impl Usage {
    fn summary(&self) -> String {
        format!(
            "{} / {} / {}",
            self.size_of, self.total_bytes, self.total_blocks
        )
    }
}

fn measure_memory_usage<T>(
    cardinality: usize,
    create: impl Fn() -> T,
    insert: impl Fn(&mut T, &usize),
) -> Usage
where
    T: Sized,
{
    let _profiler = dhat::Profiler::builder().testing().build();
    let mut sketch = create();
    for i in 0..cardinality {
        insert(&mut sketch, &i);
    }
    let stats = dhat::HeapStats::get();
    Usage {
        size_of: std::mem::size_of::<T>(),
        total_bytes: stats.total_bytes,
        total_blocks: stats.total_blocks,
        max_bytes: stats.max_bytes,
        curr_bytes: stats.curr_bytes,
    }
}

#[test]
fn test_allocations() {
    let register_bytes = (1usize << PREFIX_BITS) * 6 / 8;

    let results: Vec<Record> = std::iter::once(0)
        .chain((0..).map(|c| 1 << c))
        .take_while(|&c| c <= 1 << 16)
        .map(|cardinality| {
            let hyperloglog = measure_memory_usage(
                cardinality,
                || HyperLogLog::new(PREFIX_BITS).unwrap(),
                |hll, i| hll.insert(i),
            );
            // registers are allocated once up front and never grow
            assert_eq!(hyperloglog.max_bytes, register_bytes);
            assert_eq!(hyperloglog.total_blocks, 1);

            let minhash = measure_memory_usage(
                cardinality,
                || MinHash::new(K).unwrap(),
                |mh, i| mh.insert(i),
            );
            // retained values are bounded by k whatever the stream length
            assert!(
                minhash.curr_bytes <= 64 * K,
                "cardinality = {cardinality}, bytes = {}",
                minhash.curr_bytes
            );

            Record {
                cardinality,
                hyperloglog: hyperloglog.summary(),
                minhash: minhash.summary(),
                hyperloglogplus: measure_memory_usage(
                    cardinality,
                    || {
                        HyperLogLogPlus::<usize, _>::new(
                            PREFIX_BITS,
                            BuildHasherDefault::<WyHash>::default(),
                        )
                        .unwrap()
                    },
                    |est, i| est.insert(i),
                )
                .summary(),
                probabilistic_collections: measure_memory_usage(
                    cardinality,
                    || probabilistic_collections::hyperloglog::HyperLogLog::<usize>::new(0.004),
                    |est, i| est.insert(i),
                )
                .summary(),
            }
        })
        .collect();

    let table_config = Settings::default().with(Style::markdown());
    let markdown = Table::new(results).with(table_config).to_string();
    println!("{}", markdown);
}
