#![no_main]

use libfuzzer_sys::fuzz_target;
use pacsketch::registers::RegisterStore;

fuzz_target!(|data: &[u8]| {
    let mut store = RegisterStore::<6>::new(data.len());
    let mut expected = vec![0u8; data.len()];
    for (idx, &byte) in data.iter().enumerate() {
        let value = byte & RegisterStore::<6>::MAX_VALUE;
        store.replace(idx, value);
        expected[idx] = value;
    }
    for (idx, &byte) in data.iter().enumerate().rev() {
        if byte & 0x80 != 0 {
            store.clear(idx);
            expected[idx] = 0;
        }
    }
    assert!(store.iter().eq(expected.iter().copied()));
    assert_eq!(store.as_bytes().len(), RegisterStore::<6>::bytes_for(data.len()));
});
