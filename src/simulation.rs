//! ## Windowed-sampling simulation
//! Repeated trials drawing random windows from a `normal` and an `attack`
//! [`ReferenceCorpus`], sketching each window and scoring it by Jaccard
//! similarity.
//!
//! - [`Simulation::run`] compares pure windows with each other and, when an
//!   attack ratio is configured, with a mixed window of that ratio.
//! - [`Simulation::run_test`] builds one reference sketch per full corpus, draws
//!   a random true attack ratio per trial and estimates it twice: from the
//!   Jaccard scores against the references (MinHash) and from a 1-in-N
//!   uniform sample with known labels (Sampling). Each estimate is classified
//!   against the decision threshold into a per-approach [`ConfusionMatrix`].
//!
//! Windows are drawn without replacement by partially shuffling the corpus
//! index range with the injected [`Rng`], so a seeded generator makes every
//! trial reproducible.

use std::fmt::{Display, Formatter};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, trace};

use crate::corpus::ReferenceCorpus;
use crate::error::{SimulationError, SketchError};
use crate::sketch::{Sketch, SketchConfig, SketchKind};

/// Simulation parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "with_serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SimulationConfig {
    /// Number of trials per run
    pub num_windows: usize,
    /// Number of records per window
    pub num_records: usize,
    /// Share of attack records in the mixed window of [`Simulation::run`]
    pub attack_ratio: Option<f64>,
    /// Sketch kind and size used for every window and reference
    pub sketch: SketchConfig,
    /// Keep one record in `sample_rate` for the sampling estimate
    pub sample_rate: u32,
    /// Estimated attack ratios strictly above this are classified as attack
    pub decision_threshold: f64,
    /// Seed for [`Simulation::new`], drawn from entropy when `None`
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_windows: 10,
            num_records: 1000,
            attack_ratio: None,
            sketch: SketchConfig::default(),
            sample_rate: 256,
            decision_threshold: 0.5,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Check parameters, including that the configured sketch can be built
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.num_windows == 0 {
            return Err(invalid("num_windows must be positive"));
        }
        if self.num_records == 0 {
            return Err(invalid("num_records must be positive"));
        }
        if let Some(ratio) = self.attack_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(format!("attack_ratio {ratio} outside [0, 1]")));
            }
        }
        if self.sample_rate == 0 {
            return Err(invalid("sample_rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.decision_threshold) {
            return Err(invalid(format!(
                "decision_threshold {} outside [0, 1]",
                self.decision_threshold
            )));
        }
        self.sketch.build()?;
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> SimulationError {
    SimulationError::InvalidConfig(reason.into())
}

/// Pair of windows compared in a [`WindowMetrics`] row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WindowType {
    NormalVsAttack,
    NormalVsMixed,
    AttackVsMixed,
}

impl Display for WindowType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WindowType::NormalVsAttack => "normal_vs_attack",
            WindowType::NormalVsMixed => "normal_vs_mixed",
            WindowType::AttackVsMixed => "attack_vs_mixed",
        })
    }
}

/// One comparison of [`Simulation::run`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowMetrics {
    pub trial: usize,
    pub window_type: WindowType,
    pub attack_ratio: Option<f64>,
    pub jaccard: f64,
}

impl WindowMetrics {
    pub const CSV_HEADER: &'static str = "trial,window_type,attack_ratio,jaccard";
}

impl Display for WindowMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},", self.trial, self.window_type)?;
        if let Some(ratio) = self.attack_ratio {
            write!(f, "{ratio:.4}")?;
        }
        write!(f, ",{:.6}", self.jaccard)
    }
}

/// Attack ratio estimation method of test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Approach {
    MinHash,
    Sampling,
}

impl Display for Approach {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Approach::MinHash => "minhash",
            Approach::Sampling => "sampling",
        })
    }
}

/// One estimate of [`Simulation::run_test`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestMetrics {
    pub trial: usize,
    pub approach: Approach,
    pub true_attack_ratio: f64,
    /// Jaccard against the normal reference, `None` for sampling
    pub jaccard_normal: Option<f64>,
    /// Jaccard against the attack reference, `None` for sampling
    pub jaccard_attack: Option<f64>,
    pub est_attack_ratio: f64,
}

impl TestMetrics {
    pub const CSV_HEADER: &'static str =
        "trial,approach,true_attack_ratio,jaccard_normal,jaccard_attack,est_attack_ratio";
}

impl Display for TestMetrics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{:.4},",
            self.trial, self.approach, self.true_attack_ratio
        )?;
        if let Some(j) = self.jaccard_normal {
            write!(f, "{j:.6}")?;
        }
        f.write_str(",")?;
        if let Some(j) = self.jaccard_attack {
            write!(f, "{j:.6}")?;
        }
        write!(f, ",{:.4}", self.est_attack_ratio)
    }
}

/// 2x2 tally of true versus predicted class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfusionMatrix {
    pub normal_correct: usize,
    pub normal_incorrect: usize,
    pub attack_correct: usize,
    pub attack_incorrect: usize,
}

impl ConfusionMatrix {
    /// Tally one classification
    pub fn record(&mut self, is_attack: bool, predicted_attack: bool) {
        match (is_attack, is_attack == predicted_attack) {
            (false, true) => self.normal_correct += 1,
            (false, false) => self.normal_incorrect += 1,
            (true, true) => self.attack_correct += 1,
            (true, false) => self.attack_incorrect += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.normal_correct + self.normal_incorrect + self.attack_correct + self.attack_incorrect
    }

    /// Share of correct classifications, `0.0` when empty
    pub fn accuracy(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => (self.normal_correct + self.attack_correct) as f64 / total as f64,
        }
    }
}

impl Display for ConfusionMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{:>8}{:>10}{:>12}", "", "correct", "incorrect")?;
        writeln!(
            f,
            "{:>8}{:>10}{:>12}",
            "normal", self.normal_correct, self.normal_incorrect
        )?;
        write!(
            f,
            "{:>8}{:>10}{:>12}",
            "attack", self.attack_correct, self.attack_incorrect
        )
    }
}

/// Rows and confusion matrices of a test-mode run
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "with_serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TestReport {
    pub rows: Vec<TestMetrics>,
    pub minhash: ConfusionMatrix,
    pub sampling: ConfusionMatrix,
}

impl TestReport {
    /// Return confusion matrix of `approach`
    pub fn confusion(&self, approach: Approach) -> &ConfusionMatrix {
        match approach {
            Approach::MinHash => &self.minhash,
            Approach::Sampling => &self.sampling,
        }
    }

    fn confusion_mut(&mut self, approach: Approach) -> &mut ConfusionMatrix {
        match approach {
            Approach::MinHash => &mut self.minhash,
            Approach::Sampling => &mut self.sampling,
        }
    }
}

/// Estimate share of attack records in a window from its Jaccard similarity
/// to the normal and attack references: `J_attack / (J_normal + J_attack)`.
///
/// Returns `0.0` when both similarities are zero.
pub fn estimate_attack_ratio(jaccard_normal: f64, jaccard_attack: f64) -> f64 {
    let denominator = jaccard_normal + jaccard_attack;
    if denominator > 0.0 {
        jaccard_attack / denominator
    } else {
        trace!("zero jaccard denominator, estimating attack ratio as 0");
        0.0
    }
}

/// Simulation harness driving repeated window trials with an injected generator
#[derive(Debug)]
pub struct Simulation<R: Rng = StdRng> {
    config: SimulationConfig,
    rng: R,
}

impl Simulation<StdRng> {
    /// Create new simulation seeded from `config.seed`, or from entropy when unset
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> Simulation<R> {
    /// Create new simulation drawing all randomness from `rng`
    pub fn with_rng(config: SimulationConfig, rng: R) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Compare pure normal, pure attack and (optionally) mixed windows
    pub fn run(
        &mut self,
        normal: &ReferenceCorpus,
        attack: &ReferenceCorpus,
    ) -> Result<Vec<WindowMetrics>, SimulationError> {
        self.ensure_implemented()?;
        let num_windows = self.config.num_windows;
        let num_records = self.config.num_records;
        let attack_ratio = self.config.attack_ratio;
        info!(
            num_windows,
            num_records,
            ?attack_ratio,
            sketch = %self.config.sketch,
            normal = normal.len(),
            attack = attack.len(),
            "starting simulation"
        );

        let mut rows = Vec::with_capacity(num_windows * 3);
        for trial in 0..num_windows {
            let pure_normal = self.pure_window(normal)?;
            let pure_attack = self.pure_window(attack)?;
            let jaccard = pure_normal.jaccard(&pure_attack)?;
            debug!(trial, jaccard, "normal vs attack");
            rows.push(WindowMetrics {
                trial,
                window_type: WindowType::NormalVsAttack,
                attack_ratio: None,
                jaccard,
            });

            let Some(ratio) = attack_ratio else {
                continue;
            };
            let window = self.mixed_window(normal, attack, ratio);
            let mixed = self
                .config
                .sketch
                .build_from_records(window.iter().map(|(record, _)| record))?;
            let jaccard_normal = pure_normal.jaccard(&mixed)?;
            let jaccard_attack = pure_attack.jaccard(&mixed)?;
            debug!(
                trial,
                ratio,
                window = window.len(),
                jaccard_normal,
                jaccard_attack,
                estimate = estimate_attack_ratio(jaccard_normal, jaccard_attack),
                "mixed window"
            );
            rows.push(WindowMetrics {
                trial,
                window_type: WindowType::NormalVsMixed,
                attack_ratio: Some(ratio),
                jaccard: jaccard_normal,
            });
            rows.push(WindowMetrics {
                trial,
                window_type: WindowType::AttackVsMixed,
                attack_ratio: Some(ratio),
                jaccard: jaccard_attack,
            });
        }

        info!(rows = rows.len(), "simulation finished");
        Ok(rows)
    }

    /// Classify mixed windows of random attack ratio against full-corpus references
    pub fn run_test(
        &mut self,
        normal: &ReferenceCorpus,
        attack: &ReferenceCorpus,
    ) -> Result<TestReport, SimulationError> {
        self.ensure_implemented()?;
        let threshold = self.config.decision_threshold;
        let sample_rate = self.config.sample_rate;
        info!(
            num_windows = self.config.num_windows,
            num_records = self.config.num_records,
            sample_rate,
            threshold,
            sketch = %self.config.sketch,
            "starting test simulation"
        );

        let normal_ref = self.config.sketch.build_from_records(normal.records())?;
        let attack_ref = self.config.sketch.build_from_records(attack.records())?;

        let mut report = TestReport {
            rows: Vec::with_capacity(self.config.num_windows * 2),
            ..TestReport::default()
        };
        for trial in 0..self.config.num_windows {
            let true_ratio: f64 = self.rng.gen();
            let is_attack = true_ratio > threshold;
            let window = self.mixed_window(normal, attack, true_ratio);

            let mixed = self
                .config
                .sketch
                .build_from_records(window.iter().map(|(record, _)| record))?;
            let jaccard_normal = mixed.jaccard(&normal_ref)?;
            let jaccard_attack = mixed.jaccard(&attack_ref)?;
            let minhash_ratio = estimate_attack_ratio(jaccard_normal, jaccard_attack);

            let mut kept = 0usize;
            let mut attacks = 0usize;
            for (_, label) in &window {
                if self.rng.gen_ratio(1, sample_rate) {
                    kept += 1;
                    attacks += usize::from(*label);
                }
            }
            let sampling_ratio = match kept {
                0 => 0.0,
                kept => attacks as f64 / kept as f64,
            };
            debug!(
                trial,
                true_ratio,
                jaccard_normal,
                jaccard_attack,
                minhash_ratio,
                kept,
                sampling_ratio,
                "test window"
            );

            for (approach, estimate, jaccard_normal, jaccard_attack) in [
                (
                    Approach::MinHash,
                    minhash_ratio,
                    Some(jaccard_normal),
                    Some(jaccard_attack),
                ),
                (Approach::Sampling, sampling_ratio, None, None),
            ] {
                report
                    .confusion_mut(approach)
                    .record(is_attack, estimate > threshold);
                report.rows.push(TestMetrics {
                    trial,
                    approach,
                    true_attack_ratio: true_ratio,
                    jaccard_normal,
                    jaccard_attack,
                    est_attack_ratio: estimate,
                });
            }
        }

        for approach in [Approach::MinHash, Approach::Sampling] {
            let confusion = report.confusion(approach);
            info!(
                %approach,
                accuracy = confusion.accuracy(),
                "confusion matrix\n{confusion}"
            );
        }
        Ok(report)
    }

    fn ensure_implemented(&self) -> Result<(), SketchError> {
        match self.config.sketch.kind() {
            SketchKind::MinHash => Ok(()),
            SketchKind::HyperLogLog => {
                error!(sketch = %self.config.sketch, "simulation is only implemented for MinHash");
                Err(SketchError::Unimplemented("HyperLogLog-backed simulation"))
            }
        }
    }

    /// Draw `count` distinct indices of `0..len` uniformly, clamped to `len`
    fn draw(&mut self, len: usize, count: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len).collect();
        let (chosen, _) = indices.partial_shuffle(&mut self.rng, count.min(len));
        chosen.to_vec()
    }

    fn pure_window(&mut self, corpus: &ReferenceCorpus) -> Result<Sketch, SketchError> {
        let indices = self.draw(corpus.len(), self.config.num_records);
        let records = corpus.records();
        self.config
            .sketch
            .build_from_records(indices.into_iter().map(|idx| &records[idx]))
    }

    /// Draw `round(n * (1 - ratio))` normal records followed by
    /// `round(n * ratio)` attack records, each paired with its attack label
    fn mixed_window<'c>(
        &mut self,
        normal: &'c ReferenceCorpus,
        attack: &'c ReferenceCorpus,
        ratio: f64,
    ) -> Vec<(&'c str, bool)> {
        let n = self.config.num_records as f64;
        let num_normal = (n * (1.0 - ratio)).round() as usize;
        let num_attack = (n * ratio).round() as usize;

        let mut window = Vec::with_capacity(num_normal + num_attack);
        for idx in self.draw(normal.len(), num_normal) {
            window.push((normal.records()[idx].as_str(), false));
        }
        for idx in self.draw(attack.len(), num_attack) {
            window.push((attack.records()[idx].as_str(), true));
        }
        window
    }
}
