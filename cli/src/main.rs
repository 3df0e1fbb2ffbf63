mod cli;
mod logger;
mod report;

use clap::Parser;
use tracing::info;

use ad_allocation_core_rs::{RngManager, WorkloadGenerator};
use cli::{config_from_flags, load_config, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init_tracing(cli.log_json);

    let seed = cli.seed();
    let mut rng = RngManager::new(seed);
    let generator = WorkloadGenerator::new(cli.workload_config());

    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let advertisers = generator.advertisers(&mut rng);
            config_from_flags(&cli, advertisers, seed)
        }
    };

    // Every algorithm sees the same arrival sequence
    let ids: Vec<_> = base.advertisers.iter().map(|a| a.id).collect();
    let arrivals = generator.arrivals_for(&ids, &mut rng);
    info!(
        seed,
        advertisers = ids.len(),
        arrivals = arrivals.len(),
        "workload generated"
    );

    let mut json_reports = Vec::new();
    for config in cli.engine_configs(&base) {
        let run = report::run(config, &arrivals)?;
        if cli.json {
            json_reports.push(run.to_json()?);
        } else {
            run.print();
        }
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&json_reports)?);
    }

    Ok(())
}
