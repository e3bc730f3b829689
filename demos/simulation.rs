use pacsketch::corpus::LabeledDataset;
use pacsketch::simulation::{TestMetrics, WindowMetrics};
use pacsketch::{compare, Simulation, SimulationConfig, SketchConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // KDD-style records: 41 features followed by the label
    let lines: Vec<String> = (0..20_000)
        .map(|i| {
            let (service, label) = match i % 10 {
                0..=2 => ("private", "neptune"),
                3 => ("ecr_i", "smurf"),
                _ => ("http", "normal"),
            };
            let features: Vec<String> = (0..37).map(|f| ((i * (f + 3)) % 97).to_string()).collect();
            format!("{},tcp,{service},SF,{},{label},21", i % 500, features.join(","))
        })
        .collect();
    let dataset = LabeledDataset::partition(&lines, 41);
    for (label, count) in dataset.class_counts() {
        println!("{label:>10}: {count}");
    }
    let (normal, attack) = dataset.into_corpora();

    let sketch = SketchConfig::MinHash { k: 200 };
    let comparison = compare(
        &sketch.build_from_records(normal.records())?,
        &sketch.build_from_records(attack.records())?,
    )?;
    println!("{comparison}\n");

    let config = SimulationConfig {
        num_windows: 5,
        attack_ratio: Some(0.3),
        sketch,
        seed: Some(2021),
        ..SimulationConfig::default()
    };
    let mut simulation = Simulation::new(config)?;

    println!("{}", WindowMetrics::CSV_HEADER);
    for row in simulation.run(&normal, &attack)? {
        println!("{row}");
    }

    let report = simulation.run_test(&normal, &attack)?;
    println!("\n{}", TestMetrics::CSV_HEADER);
    for row in &report.rows {
        println!("{row}");
    }
    println!("\nminhash\n{}\n\nsampling\n{}", report.minhash, report.sampling);
    Ok(())
}
