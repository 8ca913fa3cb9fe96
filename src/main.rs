//! Standalone sweep executable, invoked on the compute site by the remote
//! launcher with positional arguments:
//! `param1 param2 values1_json values2_json metrics output_file n_threads`.
use std::env;
use std::error::Error;
use std::fs;
use std::process;

use pse_engine::backend::Simulator;
use pse_engine::exec::PROGRESS_BAR_STATUS_FILE;
use pse_engine::grid::ParamValue;
use pse_engine::launch::launch_local;

/// Parse one JSON axis argument: numbers become scalars, arrays of numbers
/// become vectors.
fn parse_values(raw: &str) -> Result<Vec<ParamValue>, Box<dyn Error>> {
    let parsed: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    parsed
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Number(x) => x
                .as_f64()
                .map(ParamValue::Scalar)
                .ok_or_else(|| format!("Not a finite number: {}", x).into()),
            serde_json::Value::Array(entries) => entries
                .into_iter()
                .map(|entry| {
                    entry
                        .as_f64()
                        .ok_or_else(|| format!("Not a number: {}", entry))
                })
                .collect::<Result<Vec<f64>, _>>()
                .map(ParamValue::Vector)
                .map_err(Into::into),
            other => Err(format!("Unsupported axis value: {}", other).into()),
        })
        .collect()
}

/// Parse the bracketed, comma-separated metric list, e.g.
/// `[GlobalVariance, KuramotoIndex]`.
fn parse_metrics(raw: &str) -> Vec<String> {
    raw.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(", ")
        .map(|name| name.to_string())
        .collect()
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 8 {
        return Err(format!(
            "Usage: {} <param1> <param2> <values1_json> <values2_json> <metrics> <output_file> <n_threads>",
            args.first().map(String::as_str).unwrap_or("pse_engine")
        )
        .into());
    }

    let param1 = &args[1];
    let param2 = &args[2];
    let param1_values = parse_values(&args[3])?;
    let param2_values = parse_values(&args[4])?;
    let metrics = parse_metrics(&args[5]);
    let file_name = &args[6];
    let n_threads: usize = args[7].parse()?;

    log::info!(
        "We are now starting PSE for '{}' x '{}' on {} threads\n\
         Expect the result in '{}'\n\
         Metrics {:?}",
        param1,
        param2,
        n_threads,
        file_name,
        metrics
    );

    let simulator = Simulator::default().configure()?;

    fs::write(PROGRESS_BAR_STATUS_FILE, "0")?;

    launch_local(
        simulator,
        param1,
        param2,
        param1_values,
        param2_values,
        &metrics,
        file_name,
        None,
        None,
        n_threads,
    )?;
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("PSE launch failed: {}", e);
        process::exit(1);
    }
}
