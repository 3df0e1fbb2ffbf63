use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ad_allocation_core_rs::allocation::balance::DEFAULT_SLABS;
use ad_allocation_core_rs::engine::DEFAULT_BETA;
use ad_allocation_core_rs::{AdvertiserConfig, AlgorithmConfig, EngineConfig, WorkloadConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmCli {
    Partial,
    PerturbedGreedy,
    Balance,
    All,
}

#[derive(Debug, Parser)]
#[clap(name = "ad-allocation", version)]
pub struct Cli {
    /// Algorithm to run against the workload
    #[clap(long, value_enum)]
    pub algorithm: Option<AlgorithmCli>,

    /// Number of synthetic advertisers (ignored with --config)
    #[clap(long, default_value_t = 5)]
    pub advertisers: u32,

    /// Number of arrivals to process
    #[clap(long, default_value_t = 10)]
    pub arrivals: usize,

    /// Perturbation coefficient (ignored with --config)
    #[clap(long, default_value_t = DEFAULT_BETA)]
    pub beta: f64,

    /// Number of budget slabs for balance
    #[clap(long, default_value_t = DEFAULT_SLABS)]
    pub slabs: usize,

    /// Seed for the workload and perturbation draws; clock-derived if absent
    #[clap(long)]
    pub seed: Option<u64>,

    /// Engine config JSON; supplies advertisers, beta, seed and algorithm
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Print reports as JSON
    #[clap(long)]
    pub json: bool,

    /// Emit logs as JSON
    #[clap(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        })
    }

    pub fn workload_config(&self) -> WorkloadConfig {
        WorkloadConfig {
            num_advertisers: self.advertisers,
            num_arrivals: self.arrivals,
            ..WorkloadConfig::default()
        }
    }

    /// Configs to run, in report order. `base` carries advertisers, beta and seed.
    pub fn engine_configs(&self, base: &EngineConfig) -> Vec<EngineConfig> {
        let algorithms = match self.algorithm {
            Some(AlgorithmCli::Partial) => vec![AlgorithmConfig::PartialAllocation],
            Some(AlgorithmCli::PerturbedGreedy) => vec![AlgorithmConfig::perturbed_greedy()],
            Some(AlgorithmCli::Balance) => vec![AlgorithmConfig::balance(self.slabs)],
            Some(AlgorithmCli::All) => all_algorithms(self.slabs),
            None if self.config.is_some() => vec![base.algorithm.clone()],
            None => all_algorithms(self.slabs),
        };

        algorithms
            .into_iter()
            .map(|algorithm| EngineConfig {
                algorithm,
                ..base.clone()
            })
            .collect()
    }
}

fn all_algorithms(slabs: usize) -> Vec<AlgorithmConfig> {
    vec![
        AlgorithmConfig::PartialAllocation,
        AlgorithmConfig::perturbed_greedy(),
        AlgorithmConfig::balance(slabs),
    ]
}

/// Read an engine config from disk
pub fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EngineConfig::from_json(&raw)
        .with_context(|| format!("parsing config {}", path.display()))?;
    if config.advertisers.is_empty() {
        bail!("config {} lists no advertisers", path.display());
    }
    Ok(config)
}

/// Config built from flags and a generated advertiser set
pub fn config_from_flags(cli: &Cli, advertisers: Vec<AdvertiserConfig>, seed: u64) -> EngineConfig {
    EngineConfig {
        beta: cli.beta,
        rng_seed: seed,
        ..EngineConfig::new(advertisers, AlgorithmConfig::PartialAllocation)
    }
}
