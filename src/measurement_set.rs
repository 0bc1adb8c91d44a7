//! Measurement sets: every distance estimate collected during a run, keyed
//! by the devices involved and tagged with the unit they are expressed in.
//!
//! A [CollectedRun] is what gets written to disk at the end of a collection
//! run. It is encoded with [serde] and [ron], so the nested mapping
//! structure (and full `f64` precision) survives a round trip, and the files
//! stay readable by hand:
//!
//! ```text
//! (twr:(unit:Centimeters,series:{(215,206):[(parameter:3,distance:171.2)]}),...)
//! ```

use crate::units::Unit;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    borrow::Cow,
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

/// Short address of a node in the testbed.
pub type NodeId = u32;

/// `(node, other)`: a two-way ranging series as measured by `node`.
pub type TwrKey = (NodeId, NodeId);

/// `(listener, anchor1, anchor2)`: a TDoA series as observed by `listener`.
pub type TdoaKey = (NodeId, NodeId, NodeId);

/// One distance estimate and the experiment setting it was taken under.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Experiment-controlled setting, e.g. slot spacing or ASN.
    pub parameter: u32,
    /// The estimate, in the unit of the owning [MeasurementSet].
    pub distance: f64,
}

impl Measurement {
    /// Pairs a distance with its configuration parameter.
    pub fn new(parameter: u32, distance: f64) -> Self {
        Measurement {
            parameter,
            distance,
        }
    }
}

/// Ordered measurement series per device pair, all in one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSet<K: Ord> {
    unit: Unit,
    series: BTreeMap<K, Vec<Measurement>>,
}

impl<K: Ord> Default for MeasurementSet<K> {
    fn default() -> Self {
        MeasurementSet {
            unit: Unit::default(),
            series: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> MeasurementSet<K> {
    /// An empty set whose distances are expressed in `unit`.
    pub fn new(unit: Unit) -> Self {
        MeasurementSet {
            unit,
            series: BTreeMap::new(),
        }
    }

    /// The unit every distance in this set is expressed in.
    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Appends a measurement to the series for `key`, creating it if needed.
    pub fn push(&mut self, key: K, measurement: Measurement) {
        self.series.entry(key).or_default().push(measurement);
    }

    /// The series for `key`, in insertion order.
    pub fn series(&self, key: &K) -> Option<&[Measurement]> {
        self.series.get(key).map(Vec::as_slice)
    }

    /// Only the distances of the series for `key`.
    pub fn distances(&self, key: &K) -> Vec<f64> {
        self.series(key)
            .map(|s| s.iter().map(|m| m.distance).collect())
            .unwrap_or_default()
    }

    /// Iterates over all pairs and their series, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Measurement])> {
        self.series.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// All keys, ordered.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.series.keys()
    }

    /// Number of device pairs.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// `true` if no pair has been recorded.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of measurements across all pairs.
    pub fn total_measurements(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Builds a new set by transforming every series with `f`. The unit is
    /// kept.
    pub fn map_series<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&[Measurement]) -> Vec<Measurement>,
    {
        MeasurementSet {
            unit: self.unit,
            series: self
                .series
                .iter()
                .map(|(k, v)| (k.clone(), f(v)))
                .collect(),
        }
    }

    /// Drops every pair for which `keep` returns `false`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &[Measurement]) -> bool,
    {
        self.series.retain(|k, v| keep(k, v));
    }

    /// A copy of this set with every distance converted to `target`.
    pub fn converted_to(&self, target: Unit) -> Self {
        let factor = self.unit.factor_to(target);
        let mut converted = self.map_series(|s| {
            s.iter()
                .map(|m| Measurement::new(m.parameter, m.distance * factor))
                .collect()
        });
        converted.unit = target;
        converted
    }
}

/// Metadata a node announced about itself on its serial stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Short address from the `TA` line.
    pub address: Option<NodeId>,
    /// Full link address bytes from the `TA` line.
    pub link_address: Option<(u32, u32)>,
    /// Most recently announced ranging timeslot.
    pub timeslot: Option<u32>,
    /// Whether the node reported being associated with the TSCH network.
    pub associated: Option<bool>,
    /// Most recently announced neighbour list.
    pub neighbors: Vec<NodeId>,
    /// Configuration items the firmware printed at boot.
    pub config: BTreeMap<String, String>,
}

/// Everything captured during one collection run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedRun {
    /// Two-way ranging distances reported by the nodes themselves.
    pub twr: MeasurementSet<TwrKey>,
    /// TDoA distance differences reported by passive listeners.
    pub tdoa: MeasurementSet<TdoaKey>,
    /// Distances computed on the host from raw timestamp dumps, in ticks.
    pub exchanges: MeasurementSet<TwrKey>,
    /// Per-stream metadata, keyed by stream identifier.
    pub streams: BTreeMap<String, StreamInfo>,
}

impl CollectedRun {
    /// Write the run out to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        write_ron_path(self, path)
    }

    /// Read a run from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        read_ron_path(path)
    }
}

impl<K> MeasurementSet<K>
where
    K: Ord + Serialize + DeserializeOwned,
{
    /// Write the set out to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        write_ron_path(self, path)
    }

    /// Write the set to the [Write]able object provided.
    pub fn to_writer(&self, writer: &mut impl Write) -> Result<(), PersistError> {
        write_ron(self, writer)
    }

    /// Read a set from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        read_ron_path(path)
    }

    /// Read a set from the [Read]able object provided.
    pub fn from_reader(reader: &mut impl Read) -> Result<Self, PersistError> {
        read_ron(reader)
    }
}

/// Returned when a measurement file cannot be written or read back.
#[derive(Debug)]
pub enum PersistError {
    /// Returned when io fails when reading or writing files.
    IoError(std::io::Error),

    /// Returned when serialization fails.
    RonError(ron::Error),

    /// Returned when deserialization fails.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PersistError as PE;
        let msg = match self {
            PE::IoError(error) => Cow::from(format!("io error: {}", error)),
            PE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            PE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for PersistError {}

impl From<std::io::Error> for PersistError {
    fn from(value: std::io::Error) -> Self {
        Self::IoError(value)
    }
}

/// Serializes any value as pretty RON into `writer`.
pub fn write_ron<T: Serialize>(value: &T, writer: &mut impl Write) -> Result<(), PersistError> {
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
        .map_err(PersistError::RonError)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Deserializes a RON value from `reader`.
pub fn read_ron<T: DeserializeOwned>(reader: &mut impl Read) -> Result<T, PersistError> {
    let mut raw_text = Vec::new();
    reader.read_to_end(&mut raw_text)?;
    ron::de::from_bytes(&raw_text).map_err(PersistError::RonSpannedError)
}

/// Serializes any value as pretty RON into a new file at `path`.
pub fn write_ron_path<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let mut handle = BufWriter::new(File::create(path)?);
    write_ron(value, &mut handle)
}

/// Deserializes a RON value from the file at `path`.
pub fn read_ron_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PersistError> {
    let mut handle = BufReader::new(File::open(path)?);
    read_ron(&mut handle)
}
