use colored::Colorize;
use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

use crate::config::{load_config, Config};
use crate::local::synthetic::synthetic_trace;
use crate::processing::predictor::SpikePredictor;
use crate::utils::log::log_csv;

const CONFIG_PATH: &str = "./config.yaml";
const DATA_PATH: &str = "./data/voltage.csv";
const OUTPUT_PATH: &str = "./output.csv";
const SYNTHETIC_SAMPLES: usize = 200_000;
const PROGRESS_EVERY: usize = 100_000;

const OUTPUT_HEADERS: [&str; 10] = [
    "index",
    "filtered",
    "voltage_threshold",
    "slope_threshold",
    "sum_threshold",
    "slope",
    "sum",
    "sum_crossed",
    "voltage_crossed",
    "slope_crossed",
];

fn load_or_default_config() -> Result<Config, Box<dyn Error>> {
    if Path::new(CONFIG_PATH).exists() {
        load_config(CONFIG_PATH).map_err(|e| e.into())
    } else {
        println!(
            "{}",
            format!("No config at {}, using defaults", CONFIG_PATH).yellow()
        );
        Ok(Config::default())
    }
}

/// Reads the voltage trace from CSV. The first column is the raw sample;
/// an optional second column is the reset-reference channel.
fn read_trace(path: &str) -> Result<Vec<(f64, f64)>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(File::open(path)?);

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        let v: f64 = record
            .get(0)
            .and_then(|field| field.trim().parse().ok())
            .unwrap_or(0.0);
        let reset: f64 = record
            .get(1)
            .and_then(|field| field.trim().parse().ok())
            .unwrap_or(0.0);
        samples.push((v, reset));
    }
    Ok(samples)
}

/// Streams a recorded trace through the predictor.
pub fn run() -> Result<(), Box<dyn Error>> {
    if !Path::new(DATA_PATH).exists() {
        eprintln!(
            "{}",
            format!("Error: data file not found at {}", DATA_PATH).red()
        );
        return Err(format!("Data file not found at {}", DATA_PATH).into());
    }
    let samples = read_trace(DATA_PATH)?;
    process(samples, load_or_default_config()?)
}

/// Streams a synthetic trace through the predictor; useful when no
/// recording is at hand.
pub fn run_synthetic() -> Result<(), Box<dyn Error>> {
    let config = load_or_default_config()?;
    let trace = synthetic_trace(SYNTHETIC_SAMPLES, config.processor.period_ms);
    let samples = trace.into_iter().map(|v| (v, 0.0)).collect();
    process(samples, config)
}

fn process(samples: Vec<(f64, f64)>, config: Config) -> Result<(), Box<dyn Error>> {
    let period_ms = config.processor.period_ms;
    let mut predictor = SpikePredictor::new(config)?;

    let mut writer = csv::Writer::from_path(OUTPUT_PATH)?;
    writer.write_record(OUTPUT_HEADERS)?;

    let total = samples.len();
    let start_time = Instant::now();
    let mut spikes_seen = 0;

    for (index, &(v, reset)) in samples.iter().enumerate() {
        let output = predictor.step(v, reset);

        let mut record = Vec::with_capacity(10);
        record.push(index.to_string());
        record.extend(output.as_array().iter().map(|value| value.to_string()));
        writer.write_record(&record)?;

        if predictor.n_spikes() > spikes_seen {
            spikes_seen = predictor.n_spikes();
            println!(
                "{}",
                format!(
                    "Spike {} at sample {} ({:.1} ms) - th: {:.4}, sum_th: {:.4}, slope_th: {:.4}",
                    spikes_seen,
                    index,
                    index as f64 * period_ms,
                    output.voltage_threshold,
                    output.sum_threshold,
                    output.slope_threshold
                )
                .red()
            );
            log_csv(
                "spikes.csv",
                &[
                    "spike",
                    "sample",
                    "voltage_threshold",
                    "sum_threshold",
                    "slope_threshold",
                ],
                &[
                    spikes_seen.to_string(),
                    index.to_string(),
                    output.voltage_threshold.to_string(),
                    output.sum_threshold.to_string(),
                    output.slope_threshold.to_string(),
                ],
            )?;
        }

        if (index + 1) % PROGRESS_EVERY == 0 {
            println!(
                "Processed {} / {} samples in {:?}",
                index + 1,
                total,
                start_time.elapsed()
            );
        }
    }
    writer.flush()?;

    let snapshot = predictor.snapshot();
    println!(
        "{}",
        format!(
            "Done: {} samples, {} spikes, sum: {:.4}, sum_min: {:.4} -> {}",
            total, spikes_seen, snapshot.sum, snapshot.sum_min, OUTPUT_PATH
        )
        .green()
    );
    Ok(())
}
