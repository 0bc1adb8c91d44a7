//! The [MeasurementCollector] consumes telemetry lines from any number of
//! node streams and sorts them into the measurement sets of a
//! [CollectedRun].
//!
//! One collector is owned by whoever drives a run and is handed around by
//! `&mut`. When the run is over, [MeasurementCollector::finish] gives the
//! collected data back by value.

use crate::measurement_set::{
    CollectedRun, Measurement, MeasurementSet, NodeId, StreamInfo, TwrKey,
};
use crate::ranging::{DsTwrExchange, Estimator};
use crate::statistics::moving_average;
use crate::telemetry::{TelemetryError, TelemetryLine};
use crate::units::Unit;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How to interpret the ranges nodes report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// The unit `TW` and `TD` ranges are printed in, after scaling.
    pub range_unit: Unit,
    /// Reported ranges are divided by this before being stored. Some
    /// firmware prints fixed point values, e.g. `range * 10000`.
    pub range_scale: f64,
    /// Used for raw `tstx1` exchanges.
    pub estimator: Estimator,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            range_unit: Unit::Centimeters,
            range_scale: 1.0,
            estimator: Estimator::default(),
        }
    }
}

/// Routes decoded telemetry into measurement sets.
#[derive(Debug, Clone)]
pub struct MeasurementCollector {
    settings: CollectorSettings,
    run: CollectedRun,
    finished: BTreeSet<String>,
    recorded: usize,
    skipped: usize,
}

impl MeasurementCollector {
    /// A collector with empty measurement sets.
    pub fn new(settings: CollectorSettings) -> Self {
        let run = CollectedRun {
            twr: MeasurementSet::new(settings.range_unit),
            tdoa: MeasurementSet::new(settings.range_unit),
            exchanges: MeasurementSet::new(Unit::Ticks),
            streams: BTreeMap::new(),
        };

        MeasurementCollector {
            settings,
            run,
            finished: BTreeSet::new(),
            recorded: 0,
            skipped: 0,
        }
    }

    /// Decodes one line from `stream` and records it. Lines that cannot be
    /// decoded are logged and skipped; the error is handed back so callers
    /// can count or report them.
    pub fn consume(&mut self, stream: &str, line: &str) -> Result<(), TelemetryError> {
        match line.parse::<TelemetryLine>() {
            Ok(decoded) => {
                self.record(stream, decoded);
                Ok(())
            }
            Err(e) => {
                match &e {
                    TelemetryError::Unrecognized(_) => debug!("[{stream}] {e}"),
                    TelemetryError::Malformed { .. } => warn!("[{stream}] {e}"),
                }
                self.skipped += 1;
                Err(e)
            }
        }
    }

    /// Consumes every `(stream, line)` pair the iterator yields. Returns how
    /// many of them were decoded.
    pub fn consume_all<I>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        lines
            .into_iter()
            .filter(|(stream, line)| self.consume(stream, line).is_ok())
            .count()
    }

    /// Records an already decoded line from `stream`.
    pub fn record(&mut self, stream: &str, line: TelemetryLine) {
        let node = self.run.streams.get(stream).and_then(|info| info.address);

        match line {
            TelemetryLine::Address { high, low } => {
                let info = self.run.streams.entry(stream.to_owned()).or_default();
                if info.address.is_some_and(|a| a != low) {
                    warn!("[{stream}] node address changed to {low}");
                }
                info!("[{stream}] is node {low}");
                info.address = Some(low);
                info.link_address = Some((high, low));
            }
            TelemetryLine::TwoWayRange {
                other,
                parameter,
                range,
                freq_offset,
            } => {
                let Some(node) = self.require_address(stream, node) else {
                    return;
                };
                if let Some(offset) = freq_offset {
                    debug!("[{stream}] {node}->{other} carrier offset {offset}");
                }
                let distance = range / self.settings.range_scale;
                self.run
                    .twr
                    .push((node, other), Measurement::new(parameter, distance));
            }
            TelemetryLine::Tdoa {
                anchor1,
                anchor2,
                parameter,
                range,
            } => {
                let Some(node) = self.require_address(stream, node) else {
                    return;
                };
                let distance = range / self.settings.range_scale;
                self.run
                    .tdoa
                    .push((node, anchor1, anchor2), Measurement::new(parameter, distance));
            }
            TelemetryLine::RawExchange { neighbor, exchange } => {
                let Some(node) = self.require_address(stream, node) else {
                    return;
                };
                if !self.record_exchange((node, neighbor), &exchange) {
                    return;
                }
            }
            TelemetryLine::Timeslot(slot) => {
                self.stream_info(stream).timeslot = Some(slot);
            }
            TelemetryLine::Associated(associated) => {
                self.stream_info(stream).associated = Some(associated);
            }
            TelemetryLine::NeighborList(neighbors) => {
                self.stream_info(stream).neighbors = neighbors;
            }
            TelemetryLine::ConfigItem { name, value } => {
                self.stream_info(stream).config.insert(name, value);
            }
            TelemetryLine::Finished => {
                info!("[{stream}] finished");
                self.finished.insert(stream.to_owned());
            }
        }
        self.recorded += 1;
    }

    fn stream_info(&mut self, stream: &str) -> &mut StreamInfo {
        self.run.streams.entry(stream.to_owned()).or_default()
    }

    fn require_address(&mut self, stream: &str, node: Option<NodeId>) -> Option<NodeId> {
        if node.is_none() {
            debug!("[{stream}] measurement before address announcement, dropped");
            self.skipped += 1;
        }
        node
    }

    /// Returns `false` if the exchange was degenerate and counted as skipped.
    fn record_exchange(&mut self, key: TwrKey, exchange: &DsTwrExchange) -> bool {
        match exchange.time_of_flight(self.settings.estimator) {
            Ok(tof) => {
                self.run.exchanges.push(key, Measurement::new(0, tof));
                true
            }
            Err(e) => {
                warn!("{}->{}: {e} ({exchange})", key.0, key.1);
                self.skipped += 1;
                false
            }
        }
    }

    /// The data collected so far.
    pub fn run(&self) -> &CollectedRun {
        &self.run
    }

    /// Whether `stream` has reported the end of its experiment.
    pub fn is_finished(&self, stream: &str) -> bool {
        self.finished.contains(stream)
    }

    /// `true` once every known stream has reported the end of its
    /// experiment.
    pub fn all_finished(&self) -> bool {
        !self.run.streams.is_empty()
            && self
                .run
                .streams
                .keys()
                .all(|stream| self.finished.contains(stream))
    }

    /// Number of lines recorded so far.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Number of lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Mean of the latest `window` two-way ranges of every pair, for a live
    /// view of a running experiment.
    pub fn latest_averages(&self, window: usize) -> BTreeMap<TwrKey, f64> {
        self.run
            .twr
            .iter()
            .filter_map(|(key, series)| {
                let distances: Vec<f64> = series.iter().map(|m| m.distance).collect();
                moving_average(&distances, window)
                    .last()
                    .map(|avg| (*key, *avg))
            })
            .collect()
    }

    /// Ends the run and hands back everything collected.
    pub fn finish(self) -> CollectedRun {
        info!(
            "Collected {} lines ({} skipped) from {} streams",
            self.recorded,
            self.skipped,
            self.run.streams.len()
        );
        self.run
    }
}

impl Default for MeasurementCollector {
    fn default() -> Self {
        MeasurementCollector::new(CollectorSettings::default())
    }
}
