// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

use ssh_sampler::{
    cli::{Cli, Commands},
    config::Config,
    sampler::{CommandSampler, SampleResult, Sampler, SftpSampler},
    utils::init_logging,
};

/// Format a Duration into a human-readable string
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();
    if total_seconds < 1.0 {
        format!("{:.1} ms", total_seconds * 1000.0)
    } else {
        format!("{total_seconds:.2} s")
    }
}

fn print_result(result: &SampleResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(result)?);
        return Ok(());
    }

    let status = if result.successful { "OK" } else { "FAILED" };
    println!(
        "[{}] {} {} code={} message={} elapsed={}",
        status,
        result.label,
        result.sampler_data,
        result.response_code,
        result.response_message,
        format_duration(Duration::from_millis(result.elapsed_ms)),
    );
    let data = result.response_data_as_string();
    if !data.is_empty() {
        print!("{data}");
        if !data.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}

fn build_sampler(cli: &Cli, config: &Config) -> Result<Box<dyn Sampler>> {
    if config.connection.host.is_empty() {
        bail!("No host given. Use -H/--host or set connection.host in the config file");
    }

    let params = config.connection.to_params();
    let sampler: Box<dyn Sampler> = match &cli.command {
        Commands::Exec { .. } => {
            let sampler = CommandSampler::new(params, config.command.to_request());
            match &config.name {
                Some(name) => Box::new(sampler.with_name(name.clone())),
                None => Box::new(sampler),
            }
        }
        Commands::Sftp { .. } => {
            let sampler = SftpSampler::new(params, config.sftp.to_request());
            match &config.name {
                Some(name) => Box::new(sampler.with_name(name.clone())),
                None => Box::new(sampler),
            }
        }
    };
    Ok(sampler)
}

async fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    cli.apply_to(&mut config);
    tracing::debug!("Effective configuration: {:?}", config);

    let sampler = build_sampler(&cli, &config)?;

    let mut failures = 0u32;
    let mut total_elapsed_ms = 0u64;
    for iteration in 1..=cli.iterations {
        tracing::info!("{}: sample {}/{}", sampler.name(), iteration, cli.iterations);
        let result = sampler.sample().await;
        if !result.successful {
            failures += 1;
        }
        total_elapsed_ms = total_elapsed_ms.saturating_add(result.elapsed_ms);
        print_result(&result, cli.json)?;
    }

    if !cli.json {
        let mean = Duration::from_millis(total_elapsed_ms / u64::from(cli.iterations));
        println!(
            "samples={} failures={} mean_elapsed={}",
            cli.iterations,
            failures,
            format_duration(mean)
        );
    }
    Ok(failures == 0)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
