use std::{
    io,
    num::{NonZeroU64, NonZeroUsize},
    time::{Duration, Instant},
};

use clap::Parser;
use log::info;
use serde::Serialize;
use truth_table::{GeneratorConfig, TableJob, TableSummary};

#[derive(Debug, Parser)]
#[command(name = "benchmarks")]
#[command(about = "Time whole-table generation across worker counts")]
struct Args {
    #[arg(allow_hyphen_values = true)]
    expression: String,

    #[arg(long, value_delimiter = ',', default_value = "1,2,4,8")]
    workers: Vec<NonZeroUsize>,

    #[arg(long, default_value = "4096")]
    segment_size: NonZeroU64,

    /// Runs per worker count; the fastest one is reported.
    #[arg(long, default_value_t = 3)]
    runs: u32,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Measurement {
    workers: usize,
    segment_size: u64,
    #[serde(with = "millis")]
    elapsed: Duration,
    summary: TableSummary,
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
    }
}

fn bench(job: &TableJob, config: &GeneratorConfig, runs: u32) -> color_eyre::Result<Measurement> {
    let mut best: Option<(Duration, TableSummary)> = None;

    for _ in 0..runs.max(1) {
        let instant = Instant::now();
        let summary = job.generate(config, &mut io::sink())?;
        let elapsed = instant.elapsed();

        if best.is_none_or(|(fastest, _)| elapsed < fastest) {
            best = Some((elapsed, summary));
        }
    }

    let (elapsed, summary) = best.ok_or_else(|| color_eyre::eyre::eyre!("no runs"))?;

    Ok(Measurement {
        workers: config.workers().get(),
        segment_size: config.segment_size().get(),
        elapsed,
        summary,
    })
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let args = Args::parse();
    let job = TableJob::new(args.expression.as_str());
    info!("benchmarking {:?} ({} notation)", job.expression, job.notation);

    let mut measurements = Vec::new();
    for &workers in &args.workers {
        let config = GeneratorConfig::new()
            .with_workers(workers)
            .with_segment_size(args.segment_size);
        let measurement = bench(&job, &config, args.runs)?;

        if !args.json {
            println!(
                "workers: {:>2}  rows: {:>10}  elapsed: {:?}",
                measurement.workers, measurement.summary.rows_written, measurement.elapsed
            );
        }
        measurements.push(measurement);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&measurements)?);
    }

    Ok(())
}
