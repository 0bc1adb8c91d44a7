//! Collects telemetry from a UWB testbed, evaluates recorded runs, and
//! computes single DS-TWR exchanges by hand.

use clap::Parser;
use log::{error, info};
use uwbtestbed::{
    aggregation::evaluate_run,
    args::{
        CollectCommand, CommandTask::{Collect, Evaluate, Range}, EvaluateCommand, RangeCommand,
        TestbedArgs,
    },
    collector::MeasurementCollector,
    config::EvaluationConfig,
    gui::{device_selector, fold_until_stop},
    line_source::LineSource,
    measurement_set::{write_ron_path, CollectedRun},
    ranging::DsTwrExchange,
    serial_source::{available_ports, SerialSource},
    synthetic_source::{SyntheticSettings, SyntheticSource},
};

use std::{error::Error, path::Path, process::ExitCode, time::Duration};

/// How often buffered lines are handed to the collector.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// Example:
// cargo run --bin uwbtestbed -- collect --synthetic 4 --out run.ron
// cargo run --bin uwbtestbed -- evaluate --in run.ron --threshold 30 --min-count 10
// cargo run --bin uwbtestbed -- range 100 150 160 210 300 360 --unit tu

fn main() -> ExitCode {
    env_logger::init();
    let args = TestbedArgs::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let res = match args.command {
        Collect(cmd) => collect(cmd, &config),
        Evaluate(cmd) => evaluate(cmd, config),
        Range(cmd) => range(cmd),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EvaluationConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            Ok(EvaluationConfig::from_path(path)?)
        }
        None => Ok(EvaluationConfig::default()),
    }
}

fn collect(cmd: CollectCommand, config: &EvaluationConfig) -> Result<(), Box<dyn Error>> {
    let collector = MeasurementCollector::new(config.collector_settings());

    let run = if let Some(num_nodes) = cmd.synthetic {
        info!("Simulating {num_nodes} nodes");
        let source = SyntheticSource::spawn(SyntheticSettings {
            num_nodes,
            ..Default::default()
        });
        run_until_stopped(source, collector, config.window)?
    } else {
        let ports = if cmd.ports.is_empty() {
            device_selector(available_ports()?)?
        } else {
            cmd.ports
        };
        if ports.is_empty() {
            info!("No device selected, nothing to do");
            return Ok(());
        }
        let source = SerialSource::open(&ports, cmd.baud)?;
        run_until_stopped(source, collector, config.window)?
    };

    info!(
        "Writing {} ranges, {} exchanges and {} TDoA values to {}",
        run.twr.total_measurements(),
        run.exchanges.total_measurements(),
        run.tdoa.total_measurements(),
        cmd.outfile.display()
    );
    run.to_path(&cmd.outfile)?;
    Ok(())
}

/// Feeds `source` into `collector` until the user presses a key, showing the
/// latest averages while it runs.
fn run_until_stopped<S>(
    source: S,
    collector: MeasurementCollector,
    window: usize,
) -> Result<CollectedRun, Box<dyn Error>>
where
    S: LineSource + Send + 'static,
{
    let (mut source, mut collector) = fold_until_stop(
        "Collecting Telemetry...",
        (source, collector),
        |(mut source, mut collector)| {
            collector.consume_all(source.drain_available());
            spin_sleep::sleep(POLL_INTERVAL);
            (source, collector)
        },
        move |(_, collector)| describe(collector, window),
    )?;

    // whatever arrived between the last step and the key press
    collector.consume_all(source.drain_available());
    drop(source);
    Ok(collector.finish())
}

fn describe(collector: &MeasurementCollector, window: usize) -> Vec<String> {
    let unit = collector.run().twr.unit();
    let mut lines = vec![format!(
        " {} lines recorded, {} skipped, {} streams",
        collector.recorded(),
        collector.skipped(),
        collector.run().streams.len()
    )];
    lines.extend(
        collector
            .latest_averages(window)
            .into_iter()
            .map(|((node, other), avg)| format!(" {node:>5} -> {other:<5} {avg:>10.2} {unit}")),
    );
    if collector.all_finished() {
        lines.push(" All nodes finished their schedule".to_owned());
    }
    lines
}

fn evaluate(cmd: EvaluateCommand, mut config: EvaluationConfig) -> Result<(), Box<dyn Error>> {
    if let Some(threshold) = cmd.threshold {
        config.threshold = threshold;
    }
    if let Some(confidence) = cmd.confidence {
        config.confidence = confidence;
    }
    if let Some(min_count) = cmd.min_count {
        config.min_count = min_count;
    }
    if cmd.ground_truth.is_some() {
        config.ground_truth = cmd.ground_truth;
    }
    config.validate()?;

    let run = CollectedRun::from_path(&cmd.infile)?;
    let report = evaluate_run(&run, &config)?;
    println!("{report}");

    if let Some(outfile) = cmd.outfile {
        write_ron_path(&report, &outfile)?;
        info!("Report written to {}", outfile.display());
    }
    Ok(())
}

fn range(cmd: RangeCommand) -> Result<(), Box<dyn Error>> {
    let raw: [u64; 6] = cmd
        .timestamps
        .try_into()
        .map_err(|_| "exactly six timestamps are needed")?;
    let exchange = DsTwrExchange::from_raw(raw)?;
    let distance = exchange.distance(cmd.estimator)?.to(cmd.unit);

    info!("{exchange}");
    println!("{distance}");
    Ok(())
}
