use ad_allocation_core_rs::{
    AdvertiserId, AdvertiserSnapshot, AllocationEngine, AllocationOutcome, BidMap, EngineConfig,
    EngineSnapshot,
};
use serde_json::{json, Value};

/// What happened on one arrival, plus the budgets right after it
pub struct ArrivalReport {
    pub arrival: u64,
    pub bids: Vec<(AdvertiserId, f64)>,
    pub outcome: AllocationOutcome,
    pub revenue: f64,
    pub advertisers: Vec<AdvertiserSnapshot>,
}

pub struct RunReport {
    pub arrivals: Vec<ArrivalReport>,
    pub summary: EngineSnapshot,
}

/// Feed `arrivals` through a fresh engine built from `config`
pub fn run(config: EngineConfig, arrivals: &[BidMap]) -> anyhow::Result<RunReport> {
    let mut engine = AllocationEngine::new(config)?;
    let mut reports = Vec::with_capacity(arrivals.len());

    for bids in arrivals {
        let outcome = engine.process_arrival(bids)?;
        let mut sorted: Vec<_> = bids.iter().map(|(&id, &bid)| (id, bid)).collect();
        sorted.sort_by_key(|&(id, _)| id);

        reports.push(ArrivalReport {
            arrival: engine.arrivals_processed(),
            revenue: outcome.revenue(bids),
            bids: sorted,
            outcome,
            advertisers: engine.snapshot().advertisers,
        });
    }

    Ok(RunReport {
        arrivals: reports,
        summary: engine.snapshot(),
    })
}

fn title(algorithm: &str) -> &'static str {
    match algorithm {
        "partial_allocation" => "Partial Allocation",
        "perturbed_greedy" => "Generalized Perturbed-Greedy",
        "balance" => "Balance",
        _ => "Unknown",
    }
}

fn format_bids(bids: &[(AdvertiserId, f64)]) -> String {
    let entries: Vec<String> = bids
        .iter()
        .map(|(id, bid)| format!("{}: {:.2}", id, bid))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

impl RunReport {
    pub fn print(&self) {
        let name = title(&self.summary.algorithm);
        println!("\n=== {} ===", name);

        for report in &self.arrivals {
            println!("\nArrival {}:", report.arrival);
            println!("Bids: {}", format_bids(&report.bids));

            match &report.outcome {
                AllocationOutcome::Fractional(fractions) => {
                    let entries: Vec<(AdvertiserId, f64)> =
                        fractions.iter().map(|(&id, &f)| (id, f)).collect();
                    println!("Allocations: {}", format_bids(&entries));
                }
                AllocationOutcome::Integral(Some(id)) => println!("Matched to advertiser {}", id),
                AllocationOutcome::Integral(None) => println!("No match"),
            }

            println!("Remaining budgets:");
            for advertiser in &report.advertisers {
                match (advertiser.slab, advertiser.psi) {
                    (Some(slab), Some(psi)) => println!(
                        "  Advertiser {}: budget={:.2} slab={} psi={:.3}",
                        advertiser.id, advertiser.budget, slab, psi
                    ),
                    _ => println!(
                        "  Advertiser {}: {:.2} (y={:.3}){}",
                        advertiser.id,
                        advertiser.budget,
                        advertiser.perturbation,
                        if advertiser.eligible { "" } else { " retired" }
                    ),
                }
            }
        }

        println!("\nTotal revenue for {}: {:.2}", name, self.summary.total_revenue);
    }

    pub fn to_json(&self) -> anyhow::Result<Value> {
        let arrivals = self
            .arrivals
            .iter()
            .map(|report| {
                Ok(json!({
                    "arrival": report.arrival,
                    "bids": report.bids,
                    "outcome": serde_json::to_value(&report.outcome)?,
                    "revenue": report.revenue,
                    "advertisers": serde_json::to_value(&report.advertisers)?,
                }))
            })
            .collect::<Result<Vec<Value>, serde_json::Error>>()?;

        Ok(json!({
            "summary": serde_json::to_value(&self.summary)?,
            "arrivals": arrivals,
        }))
    }
}
