//! Time-of-flight estimation from double-sided two-way ranging (DS-TWR)
//! exchanges, and passive time-difference-of-arrival from a listener that
//! overhears such an exchange.
//!
//! Node A (the initiator) and node B (the replier) exchange three messages.
//! Each radio stamps its own transmissions and receptions with its local,
//! free-running clock:
//!
//! ```text
//!   A            B
//!  t_a1 ──────▶ r_b1
//!  r_a1 ◀────── t_b1
//!  t_a2 ──────▶ r_b2
//! ```
//!
//! Because the two clocks are never synchronised, only intervals measured on
//! the same clock are meaningful. The asymmetric estimator combines them so
//! that first-order clock drift between A and B cancels.

use crate::error::RangingError;
use crate::timestamp::Timestamp;
use crate::units::Length;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The six timestamps of one DS-TWR handshake.
///
/// An exchange is a plain value: once captured it is never modified, and
/// each one is turned into exactly one distance estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsTwrExchange {
    t_a1: Timestamp,
    r_b1: Timestamp,
    t_b1: Timestamp,
    r_a1: Timestamp,
    t_a2: Timestamp,
    r_b2: Timestamp,
}

/// The four same-clock intervals an exchange reduces to, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    /// `r_a1 - t_a1`, measured by the initiator.
    pub round_trip_initiator: u64,
    /// `t_a2 - r_a1`, measured by the initiator.
    pub reply_initiator: u64,
    /// `r_b2 - t_b1`, measured by the replier.
    pub round_trip_replier: u64,
    /// `t_b1 - r_b1`, measured by the replier.
    pub reply_replier: u64,
}

/// Which formula turns an exchange into a time of flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Estimator {
    /// `(Ra·Rb − Da·Db) / (Ra + Da + Rb + Db)`, the standard asymmetric
    /// DS-TWR estimator.
    #[default]
    Asymmetric,
    /// Single-sided round trip corrected by the relative clock drift that
    /// the second message reveals. This is what the node firmware reports.
    DriftCompensated,
}

impl FromStr for Estimator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asymmetric" | "ds-twr" => Ok(Estimator::Asymmetric),
            "drift" | "drift-compensated" => Ok(Estimator::DriftCompensated),
            other => Err(format!("unknown estimator '{other}'")),
        }
    }
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimator::Asymmetric => write!(f, "asymmetric"),
            Estimator::DriftCompensated => write!(f, "drift-compensated"),
        }
    }
}

impl DsTwrExchange {
    /// Builds an exchange from validated timestamps, in protocol order.
    pub fn new(
        t_a1: Timestamp,
        r_b1: Timestamp,
        t_b1: Timestamp,
        r_a1: Timestamp,
        t_a2: Timestamp,
        r_b2: Timestamp,
    ) -> Self {
        DsTwrExchange {
            t_a1,
            r_b1,
            t_b1,
            r_a1,
            t_a2,
            r_b2,
        }
    }

    /// Builds an exchange from raw counter values in the order
    /// `[t_a1, r_b1, t_b1, r_a1, t_a2, r_b2]`, rejecting any value wider
    /// than 40 bits.
    pub fn from_raw(raw: [u64; 6]) -> Result<Self, RangingError> {
        let [t_a1, r_b1, t_b1, r_a1, t_a2, r_b2] = raw;
        Ok(DsTwrExchange::new(
            Timestamp::new(t_a1)?,
            Timestamp::new(r_b1)?,
            Timestamp::new(t_b1)?,
            Timestamp::new(r_a1)?,
            Timestamp::new(t_a2)?,
            Timestamp::new(r_b2)?,
        ))
    }

    /// The timestamps in protocol order.
    pub fn to_raw(self) -> [u64; 6] {
        [
            self.t_a1.ticks(),
            self.r_b1.ticks(),
            self.t_b1.ticks(),
            self.r_a1.ticks(),
            self.t_a2.ticks(),
            self.r_b2.ticks(),
        ]
    }

    /// Reduces the exchange to its overflow-corrected intervals.
    pub fn intervals(&self) -> Intervals {
        Intervals {
            round_trip_initiator: self.r_a1.elapsed_since(self.t_a1),
            reply_initiator: self.t_a2.elapsed_since(self.r_a1),
            round_trip_replier: self.r_b2.elapsed_since(self.t_b1),
            reply_replier: self.t_b1.elapsed_since(self.r_b1),
        }
    }

    /// Estimates the one-way time of flight in ticks.
    pub fn time_of_flight(&self, estimator: Estimator) -> Result<f64, RangingError> {
        match estimator {
            Estimator::Asymmetric => asymmetric_tof(&self.intervals()),
            Estimator::DriftCompensated => self.drift_compensated_tof(),
        }
    }

    /// The time of flight wrapped as a tick-tagged [`Length`].
    pub fn distance(&self, estimator: Estimator) -> Result<Length, RangingError> {
        self.time_of_flight(estimator).map(Length::ticks)
    }

    fn drift_compensated_tof(&self) -> Result<f64, RangingError> {
        let own_duration = self.t_a2.elapsed_since(self.t_a1) as f64;
        let other_duration = self.r_b2.elapsed_since(self.r_b1) as f64;
        if other_duration == 0.0 {
            return Err(RangingError::DegenerateExchange);
        }

        // positive when B's clock runs slow relative to A's
        let relative_drift = (own_duration - other_duration) / other_duration;

        let round_trip = self.r_a1.elapsed_since(self.t_a1) as f64;
        let reply = self.t_b1.elapsed_since(self.r_b1) as f64;

        Ok(0.5 * (round_trip - reply - relative_drift * reply))
    }
}

impl fmt::Display for DsTwrExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "t_a1={} r_b1={} t_b1={} r_a1={} t_a2={} r_b2={}",
            self.t_a1, self.r_b1, self.t_b1, self.r_a1, self.t_a2, self.r_b2
        )
    }
}

/// The asymmetric DS-TWR estimator over already-corrected intervals.
pub fn asymmetric_tof(iv: &Intervals) -> Result<f64, RangingError> {
    let ra = iv.round_trip_initiator as f64;
    let da = iv.reply_initiator as f64;
    let rb = iv.round_trip_replier as f64;
    let db = iv.reply_replier as f64;

    let denominator = ra + da + rb + db;
    if denominator == 0.0 {
        return Err(RangingError::DegenerateExchange);
    }

    Ok((ra * rb - da * db) / denominator)
}

/// A DS-TWR exchange between anchors A and B, overheard by a passive
/// listener L that stamped the arrival of all three messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassiveTdoaExchange {
    /// The handshake between the two anchors.
    pub exchange: DsTwrExchange,
    /// Arrival of A's first message at the listener.
    pub r_l1: Timestamp,
    /// Arrival of B's reply at the listener.
    pub r_l2: Timestamp,
    /// Arrival of A's second message at the listener.
    pub r_l3: Timestamp,
}

impl PassiveTdoaExchange {
    /// Time difference of arrival at the listener, in ticks: the listener's
    /// flight time from A minus its flight time from B.
    pub fn time_difference(&self) -> Result<f64, RangingError> {
        let m_a = self.r_l2.elapsed_since(self.r_l1) as f64;
        let m_b = self.r_l3.elapsed_since(self.r_l2) as f64;

        let iv = self.exchange.intervals();
        let ra = iv.round_trip_initiator as f64;
        let da = iv.reply_initiator as f64;
        if ra + da == 0.0 {
            return Err(RangingError::DegenerateExchange);
        }

        // scales A's clock into the listener's clock
        let drift = (m_a + m_b) / (ra + da);
        let tof_ab = self.exchange.time_of_flight(Estimator::DriftCompensated)?;

        Ok(drift * (ra - tof_ab) - m_a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    /// Simulates a noise-free handshake. A's clock is the reference; B's
    /// clock runs `1 + drift_b` times as fast and starts at `offset_b`.
    fn simulate(tof: f64, reply_b: f64, reply_a: f64, offset_b: f64, drift_b: f64) -> [u64; 6] {
        let b_clock = |true_time: f64| (offset_b + true_time * (1.0 + drift_b)).round() as u64;
        let t_a1 = 1_000.0;
        let r_b1 = t_a1 + tof;
        let t_b1 = r_b1 + reply_b;
        let r_a1 = t_b1 + tof;
        let t_a2 = r_a1 + reply_a;
        let r_b2 = t_a2 + tof;
        [
            t_a1 as u64,
            b_clock(r_b1),
            b_clock(t_b1),
            r_a1 as u64,
            t_a2 as u64,
            b_clock(r_b2),
        ]
    }

    #[test]
    fn end_to_end_hand_computed() {
        let ex = DsTwrExchange::from_raw([100, 150, 160, 210, 300, 360]).unwrap();
        let iv = ex.intervals();
        assert_eq!(
            iv,
            Intervals {
                round_trip_initiator: 110,
                reply_initiator: 90,
                round_trip_replier: 200,
                reply_replier: 10,
            }
        );
        let tof = ex.time_of_flight(Estimator::Asymmetric).unwrap();
        assert!((tof - 21_100.0 / 410.0).abs() < EPS);
        // deterministic
        assert_eq!(tof, ex.time_of_flight(Estimator::Asymmetric).unwrap());
    }

    #[test]
    fn exact_on_symmetric_synthetic_exchange() {
        let raw = simulate(200.0, 50_000.0, 50_000.0, 0.0, 0.0);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        assert!((ex.time_of_flight(Estimator::Asymmetric).unwrap() - 200.0).abs() < EPS);
        assert!((ex.time_of_flight(Estimator::DriftCompensated).unwrap() - 200.0).abs() < EPS);
    }

    #[test]
    fn exact_on_asymmetric_reply_delays() {
        let raw = simulate(321.0, 80_000.0, 20_000.0, 5_000.0, 0.0);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        assert!((ex.time_of_flight(Estimator::Asymmetric).unwrap() - 321.0).abs() < EPS);
    }

    #[test]
    fn drift_mostly_cancels() {
        // 20 ppm drift with very unequal reply times
        let raw = simulate(300.0, 4_000_000.0, 1_000_000.0, 12_345.0, 20e-6);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        let asym = ex.time_of_flight(Estimator::Asymmetric).unwrap();
        let drift = ex.time_of_flight(Estimator::DriftCompensated).unwrap();
        assert!((asym - 300.0).abs() < 1.0, "asymmetric estimate {asym}");
        assert!((drift - 300.0).abs() < 1.0, "drift compensated estimate {drift}");

        // a plain single-sided estimate would be off by roughly drift * reply / 2
        let iv = ex.intervals();
        let sstwr = 0.5 * (iv.round_trip_initiator as f64 - iv.reply_replier as f64);
        assert!((sstwr - 300.0).abs() > 10.0);
    }

    #[test]
    fn swapping_roles_keeps_magnitude() {
        let ex = DsTwrExchange::from_raw([100, 150, 160, 210, 300, 360]).unwrap();
        let iv = ex.intervals();
        let swapped = Intervals {
            round_trip_initiator: iv.round_trip_replier,
            reply_initiator: iv.reply_replier,
            round_trip_replier: iv.round_trip_initiator,
            reply_replier: iv.reply_initiator,
        };
        let a = asymmetric_tof(&iv).unwrap();
        let b = asymmetric_tof(&swapped).unwrap();
        assert!((a.abs() - b.abs()).abs() < EPS);
    }

    #[test]
    fn exact_across_clock_wrap() {
        let base = crate::timestamp::TIMESTAMP_MAX - 60_000;
        let raw = simulate(250.0, 50_000.0, 50_000.0, 0.0, 0.0)
            .map(|t| (t + base) & crate::timestamp::TIMESTAMP_MAX);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        assert!((ex.time_of_flight(Estimator::Asymmetric).unwrap() - 250.0).abs() < EPS);
    }

    #[test]
    fn all_equal_timestamps_are_degenerate() {
        let ex = DsTwrExchange::from_raw([7; 6]).unwrap();
        assert_eq!(
            ex.time_of_flight(Estimator::Asymmetric),
            Err(RangingError::DegenerateExchange)
        );
        assert_eq!(
            ex.time_of_flight(Estimator::DriftCompensated),
            Err(RangingError::DegenerateExchange)
        );
    }

    #[test]
    fn wide_raw_timestamp_is_rejected() {
        assert_eq!(
            DsTwrExchange::from_raw([0, 0, 0, 1 << 40, 0, 0]),
            Err(RangingError::InvalidTimestamp(1 << 40))
        );
    }

    #[test]
    fn passive_tdoa_of_midpoint_listener_is_zero() {
        // listener equidistant (tof 100) from A and B which are 300 apart
        let tof_ab = 300.0;
        let tof_al = 100.0;
        let tof_bl = 100.0;
        let raw = simulate(tof_ab, 50_000.0, 50_000.0, 0.0, 0.0);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        let t_a1 = raw[0] as f64;
        let t_b1_true = t_a1 + tof_ab + 50_000.0;
        let t_a2 = raw[4] as f64;
        let l = |t: f64| Timestamp::new((t + 9_000.0) as u64).unwrap();
        let tdoa = PassiveTdoaExchange {
            exchange: ex,
            r_l1: l(t_a1 + tof_al),
            r_l2: l(t_b1_true + tof_bl),
            r_l3: l(t_a2 + tof_al),
        };
        let td = tdoa.time_difference().unwrap();
        assert!(td.abs() < 1e-6, "td = {td}");
    }

    #[test]
    fn passive_tdoa_sign_follows_geometry() {
        let tof_ab = 300.0;
        let tof_al = 50.0;
        let tof_bl = 250.0;
        let raw = simulate(tof_ab, 50_000.0, 50_000.0, 0.0, 0.0);
        let ex = DsTwrExchange::from_raw(raw).unwrap();
        let t_a1 = raw[0] as f64;
        let t_b1_true = t_a1 + tof_ab + 50_000.0;
        let t_a2 = raw[4] as f64;
        let l = |t: f64| Timestamp::new(t as u64).unwrap();
        let tdoa = PassiveTdoaExchange {
            exchange: ex,
            r_l1: l(t_a1 + tof_al),
            r_l2: l(t_b1_true + tof_bl),
            r_l3: l(t_a2 + tof_al),
        };
        let td = tdoa.time_difference().unwrap();
        assert!((td - (tof_al - tof_bl)).abs() < 1e-6, "td = {td}");
    }

    #[test]
    fn estimator_names_parse() {
        assert_eq!("asymmetric".parse(), Ok(Estimator::Asymmetric));
        assert_eq!("drift".parse(), Ok(Estimator::DriftCompensated));
        assert!("magic".parse::<Estimator>().is_err());
    }
}
