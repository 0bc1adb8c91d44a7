//! A simulated testbed. Nodes are scattered at random in a room and range
//! with each other continuously, printing the same telemetry real nodes
//! print. Useful for trying out the pipeline without hardware.

use crate::error::RangingError;
use crate::line_source::{LineSource, SourceError, StreamLine};
use crate::ranging::{DsTwrExchange, Estimator};
use crate::timestamp::TIMESTAMP_MAX;
use crate::units::{Unit, METERS_PER_TICK};
use log::{debug, warn};
use rand::{distributions::Uniform, prelude::*};
use std::{
    collections::VecDeque,
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

/// Short address of the first simulated node, the rest count up from here.
pub const FIRST_NODE_ID: u32 = 200;

const ROOM_SIZE_M: f64 = 10.0;
const REPLY_DELAY_TICKS: f64 = 4.0e7;
const MAX_DRIFT_PPM: f64 = 20.0;
const MAX_NODES: usize = 64;

/// What the generator thread simulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSettings {
    /// Number of simulated nodes.
    pub num_nodes: usize,
    /// Receive timestamp jitter, uniformly distributed in `±noise` ticks.
    pub noise: f64,
    /// Probability that a reported range is wildly off.
    pub outlier_rate: f64,
    /// The configuration parameter stamped on every `TW` line.
    pub parameter: u32,
    /// Time between two ranging rounds.
    pub period: Duration,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        SyntheticSettings {
            num_nodes: 4,
            noise: 2.0,
            outlier_rate: 0.01,
            parameter: 0,
            period: Duration::from_millis(100),
        }
    }
}

enum Signal {
    NumNodes(usize),
    Noise(f64),
    Parameter(u32),
    Stop,
}

/// A [LineSource] backed by a generator thread.
pub struct SyntheticSource {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    msgs: Arc<Mutex<VecDeque<StreamLine>>>,
    positions: Vec<Point>,
}

/// A node position in the simulated room, in meters.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Point {
    /// x
    pub x: f64,
    /// y
    pub y: f64,
}

impl Point {
    /// Straight-line distance to `other`.
    pub fn abs_dist(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl SyntheticSource {
    /// Places the nodes and starts the generator thread.
    pub fn spawn(settings: SyntheticSettings) -> Self {
        let (tx, rx) = mpsc::channel::<Signal>();
        let msgs = Arc::new(Mutex::new(VecDeque::new()));
        let th_msgs = Arc::clone(&msgs);

        let mut rng = thread_rng();
        // placed up front so the node count can grow while running
        let positions = generate_positions(&mut rng, settings.num_nodes.max(MAX_NODES));
        let th_positions = positions.clone();

        let handle = thread::spawn(move || {
            let mut rng = thread_rng();
            let mut settings = settings;
            let mut announced = 0;
            let mut running = true;
            while running {
                while let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::NumNodes(n) => settings.num_nodes = n.min(th_positions.len()),
                        Signal::Noise(noise) => settings.noise = noise,
                        Signal::Parameter(p) => settings.parameter = p,
                        Signal::Stop => running = false,
                    }
                }

                let mut lines = Vec::new();
                let nodes = &th_positions[..settings.num_nodes.min(th_positions.len())];
                while announced < nodes.len() {
                    lines.extend(announcement(announced));
                    announced += 1;
                }
                lines.extend(ranging_round(&mut rng, nodes, &settings));

                match th_msgs.lock() {
                    Ok(mut queue) => queue.extend(lines),
                    Err(_) => break,
                }
                spin_sleep::sleep(settings.period);
            }
            debug!("Synthetic testbed stopped");
        });

        SyntheticSource {
            handle: Some(handle),
            tx,
            msgs,
            positions,
        }
    }

    /// The true position of the node with short address `id`.
    pub fn position(&self, id: u32) -> Option<Point> {
        let index = id.checked_sub(FIRST_NODE_ID)? as usize;
        self.positions.get(index).copied()
    }

    /// Changes the number of ranging nodes.
    pub fn set_num_nodes(&self, num_nodes: usize) -> Result<(), SourceError> {
        self.send(Signal::NumNodes(num_nodes))
    }

    /// Changes the timestamp jitter, in ticks.
    pub fn set_noise(&self, noise: f64) -> Result<(), SourceError> {
        self.send(Signal::Noise(noise))
    }

    /// Changes the configuration parameter reported from now on.
    pub fn set_parameter(&self, parameter: u32) -> Result<(), SourceError> {
        self.send(Signal::Parameter(parameter))
    }

    /// Stops the generator and waits for it to exit. Lines generated so far
    /// stay buffered.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                warn!("The synthetic testbed thread panicked");
            }
        }
    }

    fn send(&self, signal: Signal) -> Result<(), SourceError> {
        self.tx.send(signal).map_err(|_| SourceError::Stopped)
    }
}

impl Iterator for SyntheticSource {
    type Item = StreamLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.msgs.lock().ok()?.pop_front()
    }
}

impl LineSource for SyntheticSource {
    fn clear(&mut self) {
        if let Ok(mut queue) = self.msgs.lock() {
            queue.clear();
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stream_name(index: usize) -> String {
    format!("synthetic{index}")
}

fn node_id(index: usize) -> u32 {
    FIRST_NODE_ID + index as u32
}

fn generate_positions(rng: &mut impl Rng, num_nodes: usize) -> Vec<Point> {
    let side = Uniform::new(0.0, ROOM_SIZE_M);
    (0..num_nodes)
        .map(|_| Point {
            x: rng.sample(side),
            y: rng.sample(side),
        })
        .collect()
}

/// What a node prints once it boots and joins the network.
fn announcement(index: usize) -> Vec<StreamLine> {
    let stream = stream_name(index);
    [
        ";; SCHEDULE_USED = SYNTHETIC".to_owned(),
        format!("TA, 0, {}", node_id(index)),
        "tschass, 1".to_owned(),
        format!("ts, {index}"),
    ]
    .into_iter()
    .map(|line| (stream.clone(), line))
    .collect()
}

/// One exchange of every node with every other node.
fn ranging_round(
    rng: &mut impl Rng,
    nodes: &[Point],
    settings: &SyntheticSettings,
) -> Vec<StreamLine> {
    let mut lines = Vec::new();
    for (i, a) in nodes.iter().enumerate() {
        let stream = stream_name(i);
        for (j, b) in nodes.iter().enumerate().filter(|(j, _)| i != *j) {
            let tof = a.abs_dist(b) / METERS_PER_TICK;
            let Ok(exchange) = simulate_exchange(rng, tof, settings.noise) else {
                continue;
            };
            let Ok(estimate) = exchange.distance(Estimator::DriftCompensated) else {
                continue;
            };
            let mut range = estimate.value_in(Unit::Centimeters);
            if rng.gen_bool(settings.outlier_rate.clamp(0.0, 1.0)) {
                range += rng.gen_range(-1.0..1.0) * ROOM_SIZE_M * 100.0;
            }

            let other = node_id(j);
            lines.push((
                stream.clone(),
                format!("TW, {other}, {}, {range:.2}", settings.parameter),
            ));
            lines.push((stream.clone(), raw_exchange_line(other, &exchange)));
        }
    }
    lines
}

/// Simulates one DS-TWR handshake with `tof` ticks of flight time. The
/// replier's clock has a random offset and drift; every receive timestamp
/// jitters by up to `noise` ticks.
fn simulate_exchange(
    rng: &mut impl Rng,
    tof: f64,
    noise: f64,
) -> Result<DsTwrExchange, RangingError> {
    let modulus = (TIMESTAMP_MAX + 1) as f64;
    let offset_a = rng.gen_range(0.0..modulus);
    let offset_b = rng.gen_range(0.0..modulus);
    let drift_b = rng.gen_range(-MAX_DRIFT_PPM..MAX_DRIFT_PPM) * 1e-6;
    let mut jitter = || {
        if noise > 0.0 {
            rng.gen_range(-noise..noise)
        } else {
            0.0
        }
    };

    let t_a1 = 0.0;
    let r_b1 = t_a1 + tof + jitter();
    let t_b1 = r_b1 + REPLY_DELAY_TICKS;
    let r_a1 = t_b1 + tof + jitter();
    let t_a2 = r_a1 + REPLY_DELAY_TICKS;
    let r_b2 = t_a2 + tof + jitter();

    let clock_a = |t: f64| ((offset_a + t).round() as u64) & TIMESTAMP_MAX;
    let clock_b = |t: f64| ((offset_b + t * (1.0 + drift_b)).round() as u64) & TIMESTAMP_MAX;

    let raw = [
        clock_a(t_a1),
        clock_b(r_b1),
        clock_b(t_b1),
        clock_a(r_a1),
        clock_a(t_a2),
        clock_b(r_b2),
    ];
    DsTwrExchange::from_raw(raw)
}

/// Formats an exchange the way the firmware dumps it.
fn raw_exchange_line(neighbor: u32, exchange: &DsTwrExchange) -> String {
    let stamps: Vec<String> = exchange
        .to_raw()
        .iter()
        .map(|ts| format!("{}:{}", ts >> 32, ts & 0xffff_ffff))
        .collect();
    format!("tstx1, {neighbor}, {}", stamps.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::MeasurementCollector;
    use crate::telemetry::TelemetryLine;

    fn square() -> Vec<Point> {
        vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 3.0, y: 0.0 },
            Point { x: 3.0, y: 4.0 },
        ]
    }

    #[test]
    fn noiseless_exchanges_recover_the_distance() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let tof = 5.0 / METERS_PER_TICK;
            let exchange = simulate_exchange(&mut rng, tof, 0.0).unwrap();
            let est = exchange.time_of_flight(Estimator::Asymmetric).unwrap();
            // rounding to whole ticks and 20 ppm of drift over the reply delay
            assert!((est - tof).abs() < 2.0, "estimated {est}, expected {tof}");
        }
    }

    #[test]
    fn generated_lines_decode() {
        let mut rng = thread_rng();
        let settings = SyntheticSettings {
            outlier_rate: 0.0,
            ..Default::default()
        };
        let nodes = square();
        let lines: Vec<StreamLine> = (0..nodes.len())
            .flat_map(announcement)
            .chain(ranging_round(&mut rng, &nodes, &settings))
            .collect();

        for (_, line) in &lines {
            assert!(line.parse::<TelemetryLine>().is_ok(), "{line}");
        }

        let mut collector = MeasurementCollector::default();
        assert_eq!(collector.consume_all(lines.clone()), lines.len());

        let run = collector.finish();
        // three nodes, six ordered pairs, one range and one exchange each
        assert_eq!(run.twr.len(), 6);
        assert_eq!(run.exchanges.len(), 6);
        let d = run.twr.distances(&(node_id(0), node_id(2)))[0];
        assert!((d - 500.0).abs() < 5.0, "{d}");
    }

    #[test]
    fn source_produces_lines_until_stopped() {
        let mut source = SyntheticSource::spawn(SyntheticSettings {
            num_nodes: 2,
            period: Duration::from_millis(5),
            ..Default::default()
        });
        assert!(source.position(FIRST_NODE_ID).is_some());
        assert!(source.position(FIRST_NODE_ID - 1).is_none());

        thread::sleep(Duration::from_millis(50));
        source.stop();
        assert!(source.set_noise(1.0).is_err());

        let lines = source.drain_available();
        assert!(lines
            .iter()
            .any(|(stream, line)| stream == "synthetic0" && line == "TA, 0, 200"));
        assert!(lines.iter().any(|(_, line)| line.starts_with("TW, 201")));

        source.clear();
        assert!(source.next().is_none());
    }

    #[test]
    fn node_count_and_parameter_change_while_running() {
        let mut source = SyntheticSource::spawn(SyntheticSettings {
            num_nodes: 2,
            period: Duration::from_millis(5),
            ..Default::default()
        });
        thread::sleep(Duration::from_millis(50));
        source.set_num_nodes(3).unwrap();
        source.set_parameter(7).unwrap();
        thread::sleep(Duration::from_millis(50));
        source.stop();

        let lines = source.drain_available();
        assert!(lines
            .iter()
            .any(|(stream, line)| stream == "synthetic2" && line == "TA, 0, 202"));

        let parameters: Vec<&str> = lines
            .iter()
            .filter(|(_, line)| line.starts_with("TW"))
            .filter_map(|(_, line)| line.split(", ").nth(2))
            .collect();
        assert!(parameters.contains(&"0"));
        assert!(parameters.contains(&"7"));
        // the parameter never goes back once changed
        let first_new = parameters.iter().position(|p| *p == "7").unwrap();
        assert!(parameters[first_new..].iter().all(|p| *p == "7"));
    }
}
