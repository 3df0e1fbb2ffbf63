//! Partial allocation through the engine

use ad_allocation_core_rs::{
    AdvertiserConfig, AlgorithmConfig, AllocationEngine, BidMap, EngineConfig,
    FixedPerturbations,
};

fn engine(budgets: &[f64], ys: &[f64]) -> AllocationEngine {
    let advertisers = budgets
        .iter()
        .enumerate()
        .map(|(i, &initial_budget)| AdvertiserConfig {
            id: i as u32 + 1,
            initial_budget,
        })
        .collect();
    let config = EngineConfig::new(advertisers, AlgorithmConfig::PartialAllocation);
    let mut draws = FixedPerturbations::new(ys.to_vec());
    AllocationEngine::with_perturbation_source(config, &mut draws).unwrap()
}

fn bids(entries: &[(u32, f64)]) -> BidMap {
    entries.iter().copied().collect()
}

#[test]
fn test_best_scorer_takes_whole_arrival_when_affordable() {
    // t = 1: scores 40*(1-0.5)=20 vs 60*(1-0.9)=6
    let mut engine = engine(&[100.0, 100.0], &[0.5, 0.9]);

    let outcome = engine.process_arrival(&bids(&[(1, 40.0), (2, 60.0)])).unwrap();
    let fractions = outcome.fractions().unwrap();

    assert_eq!(fractions.len(), 1);
    assert_eq!(fractions[&1], 1.0);
    assert_eq!(engine.registry().budget(1), Some(60.0));
    assert_eq!(engine.registry().budget(2), Some(100.0));
}

#[test]
fn test_budget_cap_spills_over_to_next_advertiser() {
    let mut engine = engine(&[15.0, 100.0], &[0.1, 0.6]);

    let outcome = engine.process_arrival(&bids(&[(1, 30.0), (2, 20.0)])).unwrap();
    let fractions = outcome.fractions().unwrap();

    assert!((fractions[&1] - 0.5).abs() < 1e-12);
    assert!((fractions[&2] - 0.5).abs() < 1e-12);
    assert_eq!(engine.registry().budget(1), Some(0.0));
    assert!((engine.registry().budget(2).unwrap() - 90.0).abs() < 1e-9);
    assert!((outcome.revenue(&bids(&[(1, 30.0), (2, 20.0)])) - 25.0).abs() < 1e-9);
}

#[test]
fn test_debit_matches_bid_times_fraction() {
    let mut engine = engine(&[12.5, 7.25, 300.0], &[0.05, 0.15, 0.95]);
    let arrival = bids(&[(1, 50.0), (2, 29.0), (3, 41.0)]);

    let before: Vec<f64> = engine.registry().iter().map(|a| a.budget()).collect();
    let outcome = engine.process_arrival(&arrival).unwrap();

    for (id, fraction) in outcome.fractions().unwrap() {
        let idx = (*id - 1) as usize;
        let after = engine.registry().budget(*id).unwrap();
        assert!(
            (before[idx] - after - arrival[id] * fraction).abs() < 1e-9,
            "debit mismatch for advertiser {}",
            id
        );
    }
    let total: f64 = outcome.fractions().unwrap().values().sum();
    assert!(total <= 1.0 + 1e-12);
}

#[test]
fn test_exhausted_advertisers_receive_nothing() {
    let mut engine = engine(&[10.0], &[0.3]);

    engine.process_arrival(&bids(&[(1, 40.0)])).unwrap();
    assert_eq!(engine.registry().budget(1), Some(0.0));

    let outcome = engine.process_arrival(&bids(&[(1, 40.0)])).unwrap();
    assert!(outcome.is_empty());
    assert_eq!(engine.revenue().unmatched_arrivals, 1);
}

#[test]
fn test_later_arrivals_favour_low_perturbation() {
    // g_time(5) = e^2 ≈ 7.39: 50*(1-7.39*0.5) < 0 < 10*(1-7.39*0.01)
    let mut engine = engine(&[1000.0, 1000.0], &[0.5, 0.01]);
    for _ in 0..4 {
        engine.process_arrival(&BidMap::new()).unwrap();
    }

    let outcome = engine.process_arrival(&bids(&[(1, 50.0), (2, 10.0)])).unwrap();
    assert_eq!(outcome.fractions().unwrap().keys().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn test_fractional_tie_goes_to_lowest_id() {
    let mut engine = engine(&[100.0, 100.0, 100.0], &[0.5, 0.5, 0.5]);

    let outcome = engine
        .process_arrival(&bids(&[(3, 20.0), (2, 20.0), (1, 20.0)]))
        .unwrap();
    assert_eq!(outcome.fractions().unwrap()[&1], 1.0);
}

#[test]
fn test_allocated_events_recorded() {
    let mut engine = engine(&[15.0, 100.0], &[0.1, 0.6]);
    engine.process_arrival(&bids(&[(1, 30.0), (2, 20.0)])).unwrap();

    let allocated = engine.event_log().events_of_type("allocated");
    assert_eq!(allocated.len(), 2);
    assert_eq!(engine.event_log().events_of_type("advertiser_retired").len(), 1);
}
