//! Decoder for the line-oriented telemetry the testbed nodes print on their
//! serial consoles.
//!
//! Every line starts with a fixed prefix that selects its format, followed by
//! comma separated fields:
//!
//! ```text
//! TA, 0, 215                          link address (high byte, low byte)
//! TW, 206, 3, 171.25                  two-way range to 206, parameter 3
//! TW, 206, 3, 1712500, -12            ... with carrier frequency offset
//! TW, 206, 171.25                     ... without parameter
//! TD, 69, 70, 1234, -35.5             TDoA between anchors 69 and 70
//! ts, 4                               ranging timeslot
//! tschass, 1                          associated with the TSCH network
//! dpnl 205 10 83                      neighbour list
//! tstx1, 206, 0:1234, 0:2345, ...     six raw DS-TWR timestamps (hi:lo)
//! ;; TSCH_CONF_EB_PERIOD = 400        firmware configuration item
//! CSFDFF                              experiment finished
//! ```
//!
//! Lines with an unknown prefix are reported as
//! [TelemetryError::Unrecognized]; a known prefix with broken fields is
//! [TelemetryError::Malformed]. Callers decide whether to skip either.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, i64, one_of, space0, space1, u32},
    combinator::{all_consuming, map, map_res, opt, rest, value},
    multi::{count, many1},
    number::complete::double,
    sequence::{delimited, preceded, separated_pair, tuple},
    Finish, IResult,
};

use crate::measurement_set::NodeId;
use crate::ranging::DsTwrExchange;
use std::{error::Error, fmt, str::FromStr};

/// One decoded telemetry line.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryLine {
    /// `TA`: the node's link address. The low byte is its short address.
    Address {
        /// High byte
        high: u32,
        /// Low byte, used as the node id everywhere else
        low: u32,
    },
    /// `TW`: a two-way ranging result computed on the node.
    TwoWayRange {
        /// The node ranged with.
        other: NodeId,
        /// Configuration parameter (slot spacing or ASN), `0` if absent.
        parameter: u32,
        /// The reported range, in whatever unit the firmware prints.
        range: f64,
        /// Carrier integrator reading, when the firmware reports it.
        freq_offset: Option<i64>,
    },
    /// `TD`: a passive TDoA result.
    Tdoa {
        /// First anchor of the pair.
        anchor1: NodeId,
        /// Second anchor of the pair.
        anchor2: NodeId,
        /// Configuration parameter, `0` if absent.
        parameter: u32,
        /// Reported distance difference.
        range: f64,
    },
    /// `ts`: the node's ranging timeslot.
    Timeslot(u32),
    /// `tschass`: TSCH association state.
    Associated(bool),
    /// `dpnl`: neighbours the node currently hears.
    NeighborList(Vec<NodeId>),
    /// `tstx1`: raw timestamps of a completed DS-TWR exchange.
    RawExchange {
        /// The replier.
        neighbor: NodeId,
        /// The six timestamps.
        exchange: DsTwrExchange,
    },
    /// `;;`: a configuration value printed at boot.
    ConfigItem {
        /// Configuration macro name
        name: String,
        /// Value, verbatim
        value: String,
    },
    /// `CSFDFF`: the node finished its experiment schedule.
    Finished,
}

/// Why a line could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryError {
    /// The line does not start with any known prefix.
    Unrecognized(String),
    /// The prefix is known but the fields do not match its format.
    Malformed {
        /// The offending line
        line: String,
        /// What the parser tripped over
        reason: String,
    },
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::Unrecognized(line) => write!(f, "unrecognized line: {line:?}"),
            TelemetryError::Malformed { line, reason } => {
                write!(f, "malformed line {line:?}: {reason}")
            }
        }
    }
}

impl Error for TelemetryError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Address,
    TwoWayRange,
    Tdoa,
    Timeslot,
    Associated,
    NeighborList,
    RawExchange,
    ConfigItem,
    Finished,
}

fn line_kind(s: &str) -> IResult<&str, LineKind> {
    alt((
        value(LineKind::Address, tag("TA,")),
        value(LineKind::TwoWayRange, tag("TW,")),
        value(LineKind::Tdoa, tag("TD,")),
        value(LineKind::RawExchange, tag("tstx1,")),
        value(LineKind::Associated, tag("tschass,")),
        value(LineKind::Timeslot, tag("ts,")),
        value(LineKind::NeighborList, tag("dpnl")),
        value(LineKind::ConfigItem, tag(";;")),
        value(LineKind::Finished, tag("CSFDFF")),
    ))(s)
}

fn sep(s: &str) -> IResult<&str, ()> {
    value((), delimited(space0, char(','), space0))(s)
}

fn first_u32(s: &str) -> IResult<&str, u32> {
    preceded(space0, u32)(s)
}

fn next_u32(s: &str) -> IResult<&str, u32> {
    preceded(sep, u32)(s)
}

fn next_f64(s: &str) -> IResult<&str, f64> {
    preceded(sep, double)(s)
}

fn parse_address(s: &str) -> IResult<&str, TelemetryLine> {
    map(tuple((first_u32, next_u32)), |(high, low)| {
        TelemetryLine::Address { high, low }
    })(s)
}

fn parse_two_way_range(s: &str) -> IResult<&str, TelemetryLine> {
    alt((
        map(
            tuple((first_u32, next_u32, next_f64, opt(preceded(sep, i64)))),
            |(other, parameter, range, freq_offset)| TelemetryLine::TwoWayRange {
                other,
                parameter,
                range,
                freq_offset,
            },
        ),
        map(tuple((first_u32, next_f64)), |(other, range)| {
            TelemetryLine::TwoWayRange {
                other,
                parameter: 0,
                range,
                freq_offset: None,
            }
        }),
    ))(s)
}

fn parse_tdoa(s: &str) -> IResult<&str, TelemetryLine> {
    alt((
        map(
            tuple((first_u32, next_u32, next_u32, next_f64)),
            |(anchor1, anchor2, parameter, range)| TelemetryLine::Tdoa {
                anchor1,
                anchor2,
                parameter,
                range,
            },
        ),
        map(
            tuple((first_u32, next_u32, next_f64)),
            |(anchor1, anchor2, range)| TelemetryLine::Tdoa {
                anchor1,
                anchor2,
                parameter: 0,
                range,
            },
        ),
    ))(s)
}

fn parse_timeslot(s: &str) -> IResult<&str, TelemetryLine> {
    map(first_u32, TelemetryLine::Timeslot)(s)
}

fn parse_associated(s: &str) -> IResult<&str, TelemetryLine> {
    map(preceded(space0, one_of("01")), |c| {
        TelemetryLine::Associated(c == '1')
    })(s)
}

fn parse_neighbor_list(s: &str) -> IResult<&str, TelemetryLine> {
    map(
        many1(preceded(alt((sep, value((), space1))), u32)),
        TelemetryLine::NeighborList,
    )(s)
}

/// A 64-bit timestamp printed as `<high 32 bits>:<low 32 bits>`.
fn split_timestamp(s: &str) -> IResult<&str, u64> {
    map(separated_pair(u32, char(':'), u32), |(hi, lo)| {
        ((hi as u64) << 32) | lo as u64
    })(s)
}

fn parse_raw_exchange(s: &str) -> IResult<&str, TelemetryLine> {
    map_res(
        tuple((first_u32, count(preceded(sep, split_timestamp), 6))),
        |(neighbor, raw)| {
            let raw: [u64; 6] = raw.try_into().map_err(|_| "expected six timestamps")?;
            DsTwrExchange::from_raw(raw)
                .map(|exchange| TelemetryLine::RawExchange { neighbor, exchange })
                .map_err(|_| "timestamp wider than 40 bits")
        },
    )(s)
}

fn parse_config_item(s: &str) -> IResult<&str, TelemetryLine> {
    map(
        tuple((
            preceded(
                space0,
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            ),
            preceded(delimited(space0, char('='), space0), rest),
        )),
        |(name, value): (&str, &str)| TelemetryLine::ConfigItem {
            name: name.to_owned(),
            value: value.trim().to_owned(),
        },
    )(s)
}

fn parse_finished(s: &str) -> IResult<&str, TelemetryLine> {
    value(TelemetryLine::Finished, space0)(s)
}

fn body_parser(kind: LineKind) -> fn(&str) -> IResult<&str, TelemetryLine> {
    match kind {
        LineKind::Address => parse_address,
        LineKind::TwoWayRange => parse_two_way_range,
        LineKind::Tdoa => parse_tdoa,
        LineKind::Timeslot => parse_timeslot,
        LineKind::Associated => parse_associated,
        LineKind::NeighborList => parse_neighbor_list,
        LineKind::RawExchange => parse_raw_exchange,
        LineKind::ConfigItem => parse_config_item,
        LineKind::Finished => parse_finished,
    }
}

impl FromStr for TelemetryLine {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let (body, kind) = line_kind(line)
            .finish()
            .map_err(|_| TelemetryError::Unrecognized(line.to_owned()))?;

        match all_consuming(body_parser(kind))(body).finish() {
            Ok((_remaining, parsed)) => Ok(parsed),
            Err(error) => Err(TelemetryError::Malformed {
                line: line.to_owned(),
                reason: format!("{:?} at {:?}", error.code, error.input),
            }),
        }
    }
}
