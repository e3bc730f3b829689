use pacsketch::corpus::{LabeledDataset, ReferenceCorpus};
use pacsketch::simulation::{Approach, WindowMetrics, WindowType};
use pacsketch::{Simulation, SimulationConfig, SimulationError, SketchConfig, SketchError};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn corpus(label: &str, len: usize) -> ReferenceCorpus {
    ReferenceCorpus::new(
        label,
        (0..len)
            .map(|i| format!("{i},tcp,{label},SF,{}", i * 7 % 1031))
            .collect(),
    )
}

fn scenario() -> SimulationConfig {
    SimulationConfig {
        num_windows: 5,
        num_records: 1000,
        attack_ratio: Some(0.3),
        sketch: SketchConfig::MinHash { k: 200 },
        ..SimulationConfig::default()
    }
}

fn sum_jaccard(rows: &[WindowMetrics], window_type: WindowType) -> f64 {
    rows.iter()
        .filter(|row| row.window_type == window_type)
        .map(|row| row.jaccard)
        .sum()
}

#[test]
fn test_mixed_window_scenario() {
    let normal = corpus("normal", 10_000);
    let attack = corpus("attack", 10_000);
    let mut simulation = Simulation::with_rng(scenario(), StdRng::seed_from_u64(2021)).unwrap();
    let rows = simulation.run(&normal, &attack).unwrap();
    assert_eq!(rows.len(), 15);

    // disjoint corpora never share a retained hash
    assert_eq!(sum_jaccard(&rows, WindowType::NormalVsAttack), 0.0);

    let jaccard_normal = sum_jaccard(&rows, WindowType::NormalVsMixed);
    let jaccard_attack = sum_jaccard(&rows, WindowType::AttackVsMixed);
    assert!(
        jaccard_normal > jaccard_attack,
        "normal = {jaccard_normal}, attack = {jaccard_attack}"
    );

    let estimate = pacsketch::simulation::estimate_attack_ratio(jaccard_normal, jaccard_attack);
    assert!((0.15..=0.45).contains(&estimate), "estimate = {estimate}");
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let normal = corpus("normal", 3_000);
    let attack = corpus("attack", 3_000);
    let config = SimulationConfig {
        seed: Some(99),
        ..scenario()
    };

    let first = Simulation::new(config.clone()).unwrap().run(&normal, &attack).unwrap();
    let second = Simulation::new(config.clone()).unwrap().run(&normal, &attack).unwrap();
    assert_eq!(first, second);

    let other = Simulation::with_rng(config.clone(), StdRng::seed_from_u64(100))
        .unwrap()
        .run(&normal, &attack)
        .unwrap();
    assert_ne!(first, other);

    let first = Simulation::new(config.clone()).unwrap().run_test(&normal, &attack).unwrap();
    let second = Simulation::new(config).unwrap().run_test(&normal, &attack).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_classification_against_references() {
    let normal = corpus("normal", 10_000);
    let attack = corpus("attack", 10_000);
    let config = SimulationConfig {
        num_windows: 20,
        attack_ratio: None,
        ..scenario()
    };
    let report = Simulation::with_rng(config, StdRng::seed_from_u64(7))
        .unwrap()
        .run_test(&normal, &attack)
        .unwrap();

    assert_eq!(report.rows.len(), 40);
    for approach in [Approach::MinHash, Approach::Sampling] {
        assert_eq!(report.confusion(approach).total(), 20);
    }
    assert!(report
        .rows
        .iter()
        .all(|row| (0.0..=1.0).contains(&row.est_attack_ratio)
            && (0.0..1.0).contains(&row.true_attack_ratio)));
    let accuracy = report.confusion(Approach::MinHash).accuracy();
    assert!(accuracy >= 0.5, "accuracy = {accuracy}");
}

#[test]
fn test_labeled_dataset_pipeline() {
    let lines: Vec<String> = (0..4_000)
        .map(|i| {
            let label = match i % 4 {
                0 => "neptune",
                1 => "smurf.",
                _ => "normal",
            };
            format!("{i},tcp,private,SF,{},{label},20", i % 17)
        })
        .collect();
    let dataset = LabeledDataset::partition(&lines, 5);
    assert_eq!(dataset.normal.len(), 2_000);
    assert_eq!(dataset.attack.len(), 2_000);
    assert_eq!(dataset.class_counts().get("smurf"), Some(&1_000));
    assert!(dataset.normal.records().iter().all(|r| !r.contains("normal")));

    let (normal, attack) = dataset.into_corpora();
    let config = SimulationConfig {
        num_windows: 3,
        num_records: 500,
        seed: Some(1),
        ..scenario()
    };
    let rows = Simulation::new(config).unwrap().run(&normal, &attack).unwrap();
    assert_eq!(rows.len(), 9);
}

#[test]
fn test_hyperloglog_simulation_fails_before_any_trial() {
    let config = SimulationConfig {
        sketch: SketchConfig::HyperLogLog { prefix_bits: 12 },
        ..scenario()
    };
    let normal = corpus("normal", 100);
    let result = Simulation::new(config).unwrap().run(&normal, &normal);
    assert!(matches!(
        result,
        Err(SimulationError::Sketch(SketchError::Unimplemented(_)))
    ));
}
