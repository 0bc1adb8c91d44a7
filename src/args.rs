// Commandline argument parser using clap for the UWB testbed

use crate::ranging::Estimator;
use crate::units::Unit;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct TestbedArgs {
    #[command(subcommand, long_about)]
    /// Which task to perform
    pub command: CommandTask,

    /// RON file with evaluation settings; flags given here override it
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Record telemetry from testbed nodes until a key is pressed
    #[command(about)]
    Collect(CollectCommand),

    /// Filter and summarise a recorded run
    #[command(about)]
    Evaluate(EvaluateCommand),

    /// Estimate the distance of a single DS-TWR exchange
    #[command(about)]
    Range(RangeCommand),
}

#[derive(Debug, Args, Clone)]
pub struct CollectCommand {
    /// Serial ports the nodes are attached to. Shows a device selector if
    /// neither this nor --synthetic is given
    #[arg(short = 'p', long = "port")]
    #[clap(num_args = 1..)]
    pub ports: Vec<PathBuf>,

    /// Baud rate of the serial ports
    #[arg(short = 'b', long = "baud", default_value_t = crate::serial_source::DEFAULT_BAUD)]
    pub baud: u32,

    /// Simulate this many nodes instead of reading from hardware
    #[arg(short = 's', long = "synthetic", conflicts_with = "ports")]
    pub synthetic: Option<usize>,

    /// Filename for the collected run to be written to
    #[arg(short = 'o', long = "out")]
    pub outfile: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateCommand {
    /// A run written by `collect`
    #[arg(short = 'i', long = "in")]
    pub infile: PathBuf,

    /// Outlier threshold, distance from the series median
    #[arg(short = 't', long = "threshold")]
    pub threshold: Option<f64>,

    /// Confidence level of the reported intervals, e.g. 0.95
    #[arg(long = "confidence")]
    pub confidence: Option<f64>,

    /// Leave out pairs with fewer measurements than this
    #[arg(short = 'm', long = "min-count")]
    pub min_count: Option<usize>,

    /// True distance between the nodes, in the range unit
    #[arg(short = 'g', long = "ground-truth")]
    pub ground_truth: Option<f64>,

    /// Filename for the report to be written to, as RON
    #[arg(short = 'o', long = "out")]
    pub outfile: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RangeCommand {
    /// The six timestamps t_a1 r_b1 t_b1 r_a1 t_a2 r_b2, in radio ticks
    #[arg(num_args = 6, required = true)]
    pub timestamps: Vec<u64>,

    /// Estimator to use: asymmetric or drift-compensated
    #[arg(short = 'e', long = "estimator", default_value_t = Estimator::Asymmetric)]
    pub estimator: Estimator,

    /// Unit to print the distance in: tu, cm or m
    #[arg(short = 'u', long = "unit", default_value_t = Unit::Meters)]
    pub unit: Unit,
}
