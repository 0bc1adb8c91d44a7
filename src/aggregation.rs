//! Grouping of measurement series into per-parameter and per-pair
//! statistics, plus the ground-truth comparisons used when evaluating an
//! experiment.
//!
//! Everything here expects series that have already been through the
//! outlier filter.

use crate::config::EvaluationConfig;
use crate::error::RangingError;
use crate::measurement_set::{CollectedRun, Measurement, MeasurementSet, NodeId, TdoaKey, TwrKey};
use crate::outlier::filter_measurement_set;
use crate::statistics::{summarize, Summary};
use crate::units::Unit;
use log::info;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Groups distances by their configuration parameter. Groups come out in
/// ascending parameter order; distances keep their original order.
pub fn group_by_parameter(measurements: &[Measurement]) -> BTreeMap<u32, Vec<f64>> {
    let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for m in measurements {
        groups.entry(m.parameter).or_default().push(m.distance);
    }
    groups
}

/// Per-parameter statistics as flat sequences aligned to `parameters`, ready
/// to be handed to a plotting tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterReport {
    /// Group labels, ascending.
    pub parameters: Vec<u32>,
    /// Number of measurements per group.
    pub counts: Vec<usize>,
    /// Mean per group.
    pub means: Vec<f64>,
    /// Sample standard deviation per group.
    pub std_devs: Vec<f64>,
    /// Lower confidence bound per group.
    pub ci_lows: Vec<f64>,
    /// Upper confidence bound per group.
    pub ci_highs: Vec<f64>,
    /// Absolute error of the mean against the ground truth, if one was given.
    pub errors: Option<Vec<f64>>,
}

impl ParameterReport {
    /// Summarises each parameter group of `measurements` at the given
    /// confidence level.
    pub fn build(measurements: &[Measurement], confidence: f64) -> Result<Self, RangingError> {
        let mut report = ParameterReport::default();
        for (parameter, distances) in group_by_parameter(measurements) {
            let summary = summarize(&distances, confidence)?;
            report.push(parameter, &summary);
        }
        Ok(report)
    }

    /// Fills in [`ParameterReport::errors`] against a fixed ground truth.
    pub fn with_ground_truth(mut self, ground_truth: f64) -> Self {
        self.errors = Some(
            self.means
                .iter()
                .map(|m| absolute_error(*m, ground_truth))
                .collect(),
        );
        self
    }

    fn push(&mut self, parameter: u32, summary: &Summary) {
        self.parameters.push(parameter);
        self.counts.push(summary.count);
        self.means.push(summary.mean);
        self.std_devs.push(summary.std_dev);
        self.ci_lows.push(summary.ci_low);
        self.ci_highs.push(summary.ci_high);
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// `true` if there are no groups.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Statistics over the whole series of one device pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSummary<K> {
    /// The pair.
    pub key: K,
    /// Summary over all its distances, regardless of parameter.
    pub summary: Summary,
    /// Breakdown per configuration parameter.
    pub by_parameter: ParameterReport,
}

/// Summarises every pair of a set. Pairs with an empty series are skipped.
pub fn summarize_set<K>(
    set: &MeasurementSet<K>,
    confidence: f64,
) -> Result<Vec<PairSummary<K>>, RangingError>
where
    K: Ord + Clone,
{
    let mut out = Vec::with_capacity(set.len());
    for (key, series) in set.iter() {
        if series.is_empty() {
            continue;
        }
        let distances: Vec<f64> = series.iter().map(|m| m.distance).collect();
        out.push(PairSummary {
            key: key.clone(),
            summary: summarize(&distances, confidence)?,
            by_parameter: ParameterReport::build(series, confidence)?,
        });
    }
    Ok(out)
}

/// Drops every pair with fewer than `min_count` measurements. Returns the
/// number of pairs dropped.
pub fn prune_sparse_groups<K: Ord + Clone>(set: &mut MeasurementSet<K>, min_count: usize) -> usize {
    let before = set.len();
    set.retain(|_, series| series.len() >= min_count);
    before - set.len()
}

/// A surveyed node position, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// x
    pub x: f64,
    /// y
    pub y: f64,
    /// z
    pub z: f64,
}

impl Position {
    /// Euclidean distance to `other`, in meters.
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// True distance between two surveyed nodes, in meters.
pub fn ground_truth_distance(a: &Position, b: &Position) -> f64 {
    a.distance_to(b)
}

/// True TDoA distance difference for a listener and an anchor pair:
/// `|L − A1| − |L − A2|`, in meters.
pub fn ground_truth_tdoa(listener: &Position, anchor1: &Position, anchor2: &Position) -> f64 {
    listener.distance_to(anchor1) - listener.distance_to(anchor2)
}

/// `|mean − ground_truth|`
pub fn absolute_error(mean: f64, ground_truth: f64) -> f64 {
    (mean - ground_truth).abs()
}

/// Derives TDoA values from two-way ranging: for each node and every ordered
/// pair of distinct neighbours `(a, b)`, the difference of the node's mean
/// range to `a` and to `b`.
///
/// `mean_ranges` maps a node to its mean range per neighbour.
pub fn tdoa_from_twr_means(
    mean_ranges: &BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
) -> BTreeMap<TdoaKey, f64> {
    let mut out = BTreeMap::new();
    for (&node, ranges) in mean_ranges {
        for (&a, &mean_a) in ranges {
            for (&b, &mean_b) in ranges {
                if a == b {
                    continue;
                }
                out.insert((node, a, b), mean_a - mean_b);
            }
        }
    }
    out
}

/// Mean range per `(node, neighbour)` of a two-way ranging set, in the
/// shape [`tdoa_from_twr_means`] expects. Empty series are skipped.
pub fn mean_ranges(
    set: &MeasurementSet<(NodeId, NodeId)>,
) -> BTreeMap<NodeId, BTreeMap<NodeId, f64>> {
    let mut out: BTreeMap<NodeId, BTreeMap<NodeId, f64>> = BTreeMap::new();
    for (&(node, other), series) in set.iter() {
        let distances: Vec<f64> = series.iter().map(|m| m.distance).collect();
        if let Ok(m) = crate::statistics::mean(&distances) {
            out.entry(node).or_default().insert(other, m);
        }
    }
    out
}

/// How long a run lasted and how busy each node was.
///
/// The extent is taken over the parameters of the two-way ranging and TDoA
/// series, which carry the ASN in scheduling experiments. Raw exchanges
/// carry no parameter and are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunActivity {
    /// Smallest parameter seen.
    pub first: u32,
    /// Largest parameter seen.
    pub last: u32,
    /// Measurements per node, over every series the node reported.
    pub counts: BTreeMap<NodeId, usize>,
    /// Length of the run in seconds, if the length of one parameter step
    /// is known.
    pub duration: Option<f64>,
    /// Measurements per second per node. Only present when `duration` is
    /// known and non-zero.
    pub rates: Option<BTreeMap<NodeId, f64>>,
}

impl RunActivity {
    /// `last − first`, in parameter steps.
    pub fn span(&self) -> u32 {
        self.last - self.first
    }
}

/// Extent and per-node measurement counts of a run, or `None` if it holds
/// no two-way ranging or TDoA measurements. `step` is the length of one
/// parameter step in seconds.
pub fn run_activity(run: &CollectedRun, step: Option<f64>) -> Option<RunActivity> {
    let mut counts: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut extent: Option<(u32, u32)> = None;

    let mut visit = |node: NodeId, series: &[Measurement]| {
        *counts.entry(node).or_default() += series.len();
        for m in series {
            extent = Some(match extent {
                None => (m.parameter, m.parameter),
                Some((lo, hi)) => (lo.min(m.parameter), hi.max(m.parameter)),
            });
        }
    };
    for (&(node, _), series) in run.twr.iter() {
        visit(node, series);
    }
    for (&(listener, _, _), series) in run.tdoa.iter() {
        visit(listener, series);
    }

    let (first, last) = extent?;
    let duration = step.map(|s| f64::from(last - first) * s);
    let rates = duration.filter(|d| *d > 0.0).map(|d| {
        counts
            .iter()
            .map(|(&node, &n)| (node, n as f64 / d))
            .collect()
    });
    Some(RunActivity {
        first,
        last,
        counts,
        duration,
        rates,
    })
}

/// One pair of an [EvaluationReport], with its error against ground truth
/// when the truth is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEvaluation<K> {
    /// Statistics of the filtered series.
    pub pair: PairSummary<K>,
    /// True distance (or distance difference) for this pair.
    pub ground_truth: Option<f64>,
    /// `|mean − ground_truth|`
    pub error: Option<f64>,
}

/// The outcome of evaluating a whole run. Every value is in `unit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Unit of every distance in the report.
    pub unit: Unit,
    /// Ranges the nodes computed themselves.
    pub twr: Vec<PairEvaluation<TwrKey>>,
    /// Ranges computed here from raw timestamp dumps.
    pub exchanges: Vec<PairEvaluation<TwrKey>>,
    /// TDoA values reported by passive listeners.
    pub tdoa: Vec<PairEvaluation<TdoaKey>>,
    /// TDoA values derived from the filtered two-way ranges.
    pub derived_tdoa: BTreeMap<TdoaKey, f64>,
    /// Measurements dropped as outliers.
    pub outliers: usize,
    /// Pairs dropped for having too few measurements.
    pub pruned: usize,
    /// Extent of the run and per-node measurement rates, before filtering.
    pub activity: Option<RunActivity>,
}

fn evaluate_set<K, G>(
    set: &MeasurementSet<K>,
    config: &EvaluationConfig,
    truth: G,
    outliers: &mut usize,
    pruned: &mut usize,
) -> Result<(MeasurementSet<K>, Vec<PairEvaluation<K>>), RangingError>
where
    K: Ord + Clone,
    G: Fn(&K) -> Option<f64>,
{
    let set = set.converted_to(config.range_unit);
    let (mut filtered, removed) = filter_measurement_set(&set, config.threshold);
    *outliers += removed;
    *pruned += prune_sparse_groups(&mut filtered, config.min_count.max(1));

    let evaluations = summarize_set(&filtered, config.confidence)?
        .into_iter()
        .map(|mut pair| {
            let ground_truth = truth(&pair.key);
            let error = ground_truth.map(|gt| absolute_error(pair.summary.mean, gt));
            if let Some(gt) = ground_truth {
                pair.by_parameter = pair.by_parameter.with_ground_truth(gt);
            }
            PairEvaluation {
                pair,
                ground_truth,
                error,
            }
        })
        .collect();
    Ok((filtered, evaluations))
}

/// Filters, prunes and summarises every measurement set of a run, then
/// compares the result against whatever ground truth `config` knows.
pub fn evaluate_run(
    run: &CollectedRun,
    config: &EvaluationConfig,
) -> Result<EvaluationReport, RangingError> {
    let mut outliers = 0;
    let mut pruned = 0;
    let pair_truth = |&(a, b): &TwrKey| config.ground_truth_for(a, b);
    let to_unit = Unit::Meters.factor_to(config.range_unit);
    let tdoa_truth = |&(l, a1, a2): &TdoaKey| {
        let p = &config.positions;
        Some(ground_truth_tdoa(p.get(&l)?, p.get(&a1)?, p.get(&a2)?) * to_unit)
    };

    let (twr_filtered, twr) =
        evaluate_set(&run.twr, config, pair_truth, &mut outliers, &mut pruned)?;
    let (_, exchanges) =
        evaluate_set(&run.exchanges, config, pair_truth, &mut outliers, &mut pruned)?;
    let (_, tdoa) = evaluate_set(&run.tdoa, config, tdoa_truth, &mut outliers, &mut pruned)?;

    info!("Evaluated run: {outliers} outliers removed, {pruned} sparse pairs dropped");

    Ok(EvaluationReport {
        unit: config.range_unit,
        twr,
        exchanges,
        tdoa,
        derived_tdoa: tdoa_from_twr_means(&mean_ranges(&twr_filtered)),
        outliers,
        pruned,
        activity: run_activity(run, config.parameter_step),
    })
}

fn write_section<K: fmt::Debug>(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    unit: Unit,
    rows: &[PairEvaluation<K>],
) -> fmt::Result {
    if rows.is_empty() {
        return Ok(());
    }
    writeln!(f, "{title} [{unit}]")?;
    writeln!(
        f,
        "{:<18} {:>6} {:>10} {:>9} {:>10} {:>10} {:>9}",
        "pair", "n", "mean", "std", "ci_low", "ci_high", "error"
    )?;
    for row in rows {
        let s = &row.pair.summary;
        let error = row
            .error
            .map(|e| format!("{e:.2}"))
            .unwrap_or_else(|| "-".to_owned());
        writeln!(
            f,
            "{:<18} {:>6} {:>10.2} {:>9.2} {:>10.2} {:>10.2} {:>9}",
            format!("{:?}", row.pair.key),
            s.count,
            s.mean,
            s.std_dev,
            s.ci_low,
            s.ci_high,
            error
        )?;
    }
    writeln!(f)
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "Two-way ranging", self.unit, &self.twr)?;
        write_section(f, "Raw exchanges", self.unit, &self.exchanges)?;
        write_section(f, "TDoA", self.unit, &self.tdoa)?;
        if let Some(activity) = &self.activity {
            write!(
                f,
                "Parameters {}..={} ({} steps",
                activity.first,
                activity.last,
                activity.span()
            )?;
            if let Some(duration) = activity.duration {
                write!(f, ", {duration:.2} s")?;
            }
            writeln!(f, ")")?;
            for (node, count) in &activity.counts {
                write!(f, "  node {node}: {count} measurements")?;
                if let Some(rate) = activity.rates.as_ref().and_then(|r| r.get(node)) {
                    write!(f, ", {rate:.2}/s")?;
                }
                writeln!(f)?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "{} outliers removed, {} sparse pairs dropped",
            self.outliers, self.pruned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> Vec<Measurement> {
        vec![
            Measurement::new(3, 10.0),
            Measurement::new(1, 1.0),
            Measurement::new(3, 12.0),
            Measurement::new(1, 3.0),
            Measurement::new(2, 5.0),
        ]
    }

    #[test]
    fn groups_sorted_by_parameter() {
        let groups = group_by_parameter(&series());
        let keys: Vec<u32> = groups.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(groups[&1], vec![1.0, 3.0]);
        assert_eq!(groups[&3], vec![10.0, 12.0]);
    }

    #[test]
    fn report_is_label_aligned() {
        let report = ParameterReport::build(&series(), 0.95).unwrap();
        assert_eq!(report.parameters, vec![1, 2, 3]);
        assert_eq!(report.counts, vec![2, 1, 2]);
        assert_eq!(report.means, vec![2.0, 5.0, 11.0]);
        assert_eq!(report.std_devs[1], 0.0);
        assert_eq!(report.len(), 3);
        for i in 0..report.len() {
            assert!(report.ci_lows[i] <= report.means[i]);
            assert!(report.ci_highs[i] >= report.means[i]);
        }
    }

    #[test]
    fn report_errors_against_ground_truth() {
        let report = ParameterReport::build(&series(), 0.95)
            .unwrap()
            .with_ground_truth(4.0);
        assert_eq!(report.errors, Some(vec![2.0, 1.0, 7.0]));
    }

    #[test]
    fn summarize_every_pair() {
        let mut set = MeasurementSet::new(Unit::Centimeters);
        for m in series() {
            set.push((1, 2), m);
        }
        set.push((2, 1), Measurement::new(0, 4.0));
        let summaries = summarize_set(&set, 0.95).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key, (1, 2));
        assert_eq!(summaries[0].summary.count, 5);
        assert_eq!(summaries[0].by_parameter.parameters, vec![1, 2, 3]);
        assert_eq!(summaries[1].summary.mean, 4.0);
    }

    #[test]
    fn pruning_sparse_pairs() {
        let mut set = MeasurementSet::new(Unit::Centimeters);
        for m in series() {
            set.push((1, 2), m);
        }
        set.push((2, 1), Measurement::new(0, 4.0));
        assert_eq!(prune_sparse_groups(&mut set, 2), 1);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn positions_and_ground_truth() {
        let a = Position {
            x: 23.31,
            y: 0.26,
            z: 7.55,
        };
        let b = Position {
            x: 24.51,
            y: 0.26,
            z: 8.96,
        };
        let d = ground_truth_distance(&a, &b);
        assert!((d - (1.2f64.powi(2) + 1.41f64.powi(2)).sqrt()).abs() < 1e-12);
        assert!(ground_truth_tdoa(&a, &a, &b) + d < 1e-12);
    }

    #[test]
    fn tdoa_from_mean_ranges() {
        let mut set = MeasurementSet::new(Unit::Centimeters);
        set.push((1, 2), Measurement::new(0, 100.0));
        set.push((1, 2), Measurement::new(0, 110.0));
        set.push((1, 3), Measurement::new(0, 40.0));
        set.push((1, 1), Measurement::new(0, 0.0));
        let means = mean_ranges(&set);
        assert_eq!(means[&1][&2], 105.0);

        let tdoa = tdoa_from_twr_means(&means);
        assert_eq!(tdoa[&(1, 2, 3)], 65.0);
        assert_eq!(tdoa[&(1, 3, 2)], -65.0);
        // three neighbours, six ordered pairs
        assert_eq!(tdoa.len(), 6);
        assert!(!tdoa.contains_key(&(1, 2, 2)));
    }

    #[test]
    fn evaluating_a_run() {
        let mut run = CollectedRun::default();
        run.twr = MeasurementSet::new(Unit::Centimeters);
        for d in [499.0, 501.0, 500.0, 502.0, 498.0, 2000.0] {
            run.twr.push((1, 2), Measurement::new(0, d));
        }
        run.twr.push((1, 3), Measurement::new(0, 300.0));
        run.twr.push((1, 3), Measurement::new(0, 302.0));
        run.twr.push((2, 3), Measurement::new(0, 10.0));

        let mut config = EvaluationConfig {
            min_count: 2,
            ..Default::default()
        };
        config.positions.insert(1, Position { x: 0.0, y: 0.0, z: 0.0 });
        config.positions.insert(2, Position { x: 3.0, y: 4.0, z: 0.0 });

        let report = evaluate_run(&run, &config).unwrap();
        assert_eq!(report.unit, Unit::Centimeters);
        assert_eq!(report.outliers, 1);
        assert_eq!(report.pruned, 1);
        assert_eq!(report.twr.len(), 2);

        let first = &report.twr[0];
        assert_eq!(first.pair.key, (1, 2));
        assert_eq!(first.pair.summary.count, 5);
        assert!((first.pair.summary.mean - 500.0).abs() < 1e-9);
        assert!(first.error.unwrap() < 1e-9);
        assert!(first.pair.by_parameter.errors.is_some());
        // no surveyed position for node 3
        assert_eq!(report.twr[1].ground_truth, None);

        assert!((report.derived_tdoa[&(1, 2, 3)] - 199.0).abs() < 1e-9);

        let table = report.to_string();
        assert!(table.contains("Two-way ranging [cm]"));
        assert!(table.contains("(1, 2)"));
        assert!(!table.contains("TDoA ["));
    }

    #[test]
    fn tdoa_against_surveyed_positions() {
        let mut run = CollectedRun::default();
        run.tdoa = MeasurementSet::new(Unit::Centimeters);
        for d in [-499.0, -501.0, -500.0] {
            run.tdoa.push((1, 2, 3), Measurement::new(0, d));
        }

        let mut config = EvaluationConfig::default();
        config.positions.insert(1, Position { x: 0.0, y: 0.0, z: 0.0 });
        config.positions.insert(2, Position { x: 3.0, y: 4.0, z: 0.0 });
        config.positions.insert(3, Position { x: 6.0, y: 8.0, z: 0.0 });

        let report = evaluate_run(&run, &config).unwrap();
        assert_eq!(report.tdoa.len(), 1);
        let tdoa = &report.tdoa[0];
        assert_eq!(tdoa.pair.key, (1, 2, 3));
        // 5 m to the first anchor, 10 m to the second
        assert!((tdoa.ground_truth.unwrap() + 500.0).abs() < 1e-9);
        assert!(tdoa.error.unwrap() < 1e-9);
        assert!(report.to_string().contains("TDoA [cm]"));

        config.positions.remove(&3);
        let report = evaluate_run(&run, &config).unwrap();
        assert_eq!(report.tdoa[0].ground_truth, None);
    }

    #[test]
    fn activity_spans_twr_and_tdoa() {
        let mut run = CollectedRun::default();
        run.twr.push((1, 2), Measurement::new(100, 50.0));
        run.twr.push((1, 2), Measurement::new(105, 50.0));
        run.twr.push((2, 1), Measurement::new(110, 50.0));
        run.tdoa.push((3, 1, 2), Measurement::new(102, 5.0));
        run.tdoa.push((3, 1, 2), Measurement::new(300, 5.0));
        run.exchanges.push((1, 2), Measurement::new(0, 10_000.0));

        let activity = run_activity(&run, Some(0.01)).unwrap();
        assert_eq!((activity.first, activity.last, activity.span()), (100, 300, 200));
        assert_eq!(activity.counts, BTreeMap::from([(1, 2), (2, 1), (3, 2)]));
        assert!((activity.duration.unwrap() - 2.0).abs() < 1e-12);
        let rates = activity.rates.unwrap();
        assert!((rates[&1] - 1.0).abs() < 1e-12);
        assert!((rates[&2] - 0.5).abs() < 1e-12);

        let unknown_step = run_activity(&run, None).unwrap();
        assert_eq!(unknown_step.duration, None);
        assert_eq!(unknown_step.rates, None);
    }

    #[test]
    fn activity_of_degenerate_runs() {
        let mut run = CollectedRun::default();
        assert_eq!(run_activity(&run, Some(0.01)), None);

        run.twr.push((1, 2), Measurement::new(7, 50.0));
        let activity = run_activity(&run, Some(0.01)).unwrap();
        assert_eq!(activity.span(), 0);
        assert_eq!(activity.duration, Some(0.0));
        assert_eq!(activity.rates, None);
    }

    #[test]
    fn evaluated_report_carries_activity() {
        let mut run = CollectedRun::default();
        run.twr = MeasurementSet::new(Unit::Centimeters);
        run.twr.push((1, 2), Measurement::new(0, 100.0));
        run.twr.push((1, 2), Measurement::new(50, 100.0));
        let config = EvaluationConfig {
            parameter_step: Some(0.02),
            ..Default::default()
        };
        let report = evaluate_run(&run, &config).unwrap();
        let activity = report.activity.as_ref().unwrap();
        assert_eq!(activity.rates.as_ref().unwrap()[&1], 2.0);
        assert!(report.to_string().contains("node 1: 2 measurements, 2.00/s"));
    }

    #[test]
    fn exchanges_are_reported_in_the_configured_unit() {
        let mut run = CollectedRun::default();
        run.exchanges.push((1, 2), Measurement::new(0, 1000.0));
        run.exchanges.push((1, 2), Measurement::new(0, 1000.0));

        let config = EvaluationConfig {
            range_unit: Unit::Meters,
            threshold: 1.0,
            ..Default::default()
        };
        let report = evaluate_run(&run, &config).unwrap();
        let mean = report.exchanges[0].pair.summary.mean;
        assert!((mean - 1000.0 * crate::units::METERS_PER_TICK).abs() < 1e-9);
    }
}
