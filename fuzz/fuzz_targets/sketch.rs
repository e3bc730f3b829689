#![no_main]

use libfuzzer_sys::fuzz_target;
use pacsketch::{SketchConfig, SketchTrait};
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let config = match data[0] % 2 {
        0 => SketchConfig::HyperLogLog {
            prefix_bits: 2 + data[1] % 15,
        },
        _ => SketchConfig::MinHash {
            k: 1 + usize::from(data[1]),
        },
    };
    let data = &data[2..];
    let split_index = wyhash(data, 0) as usize % data.len().max(1);
    let (first_half, second_half) = data.split_at(split_index);

    let mut sketch1 = config.build().unwrap();
    for chunk in first_half.chunks(4) {
        sketch1.insert(chunk);
        assert!(sketch1.estimate() > 0);
        assert!(sketch1.size_of() > 0);
    }

    let mut sketch2 = config.build().unwrap();
    for chunk in second_half.chunks(4) {
        sketch2.insert(chunk);
        assert!(sketch2.estimate() > 0);
    }

    let merged = sketch1.merge(&sketch2).unwrap();
    assert_eq!(merged.is_empty(), data.is_empty());
    assert_eq!(merged, sketch2.merge(&sketch1).unwrap());

    let jaccard = sketch1.jaccard(&sketch2).unwrap();
    assert!((0.0..=1.0).contains(&jaccard));
    assert_eq!(sketch1.jaccard(&sketch1).unwrap(), 1.0);
});
