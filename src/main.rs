use anyhow::Context;
use log::{error, info};
use minitrace::collector::{Config, ConsoleReporter};

use spinbench::{BenchConfig, CsvSink, Harness};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = BenchConfig::from_env().context("loading configuration")?;
    if config.trace {
        minitrace::set_reporter(ConsoleReporter, Config::default());
    }

    let result = run(config);
    minitrace::flush();
    if let Err(e) = &result {
        error!("Benchmark aborted: {:#}", e);
    }
    result
}

fn run(config: BenchConfig) -> anyhow::Result<()> {
    // Opened before any benchmarking so an unwritable path fails fast.
    let mut sink = CsvSink::create(&config.output)?;
    let output = config.output.clone();

    let mut harness = Harness::new(config)?;
    let summary = harness.run(&mut sink)?;

    info!("Wrote {} rows to {}", summary.rows.len(), output.display());
    Ok(())
}
