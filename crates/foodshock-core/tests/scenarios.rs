//! End-to-end scenario runs against closed-form expectations.

use approx::assert_relative_eq;

use foodshock_core::inputs::{ScenarioInputs, SourceToggles};

/// A scenario with no demand on the crop/stored-food pools and no feed or
/// biofuel usage, so individual sources can be isolated.
fn quiet_scenario() -> ScenarioInputs {
    let mut s = ScenarioInputs::nuclear_winter();
    s.nmonths = 24;
    s.enable = SourceToggles::all_off();
    s.delay.feed_shutoff = 0;
    s.delay.biofuel_shutoff = 0;
    s.nutrition.include_fat = false;
    s.nutrition.include_protein = false;
    s.smoothing.kcal_smoothing = false;
    s.smoothing.stored_food_smoothing = false;
    s
}

#[test]
fn all_sources_off_feeds_nobody() {
    let inputs = quiet_scenario();
    let result = foodshock_core::run(&inputs).unwrap();
    assert!(result.objective.abs() < 1e-6);
    assert!(result
        .humans_fed_kcals
        .iter()
        .all(|fed| fed.abs() < 1e-6));
}

#[test]
fn stored_food_only_matches_even_rationing() {
    let mut inputs = quiet_scenario();
    inputs.nmonths = 12;
    inputs.enable.stored_food = true;
    inputs.stored_food_dry_caloric_tons = 500e6;
    inputs.waste.crops = 0.0;
    let result = foodshock_core::run(&inputs).unwrap();

    // 500M tons -> 2e6 billion kcals; spread over 12 months against a
    // monthly need of 7.8e9 * 2100 * 30 / 1e9 billion kcals
    let monthly_need = 7.8e9 * 2100.0 * 30.0 / 1e9;
    let expected = (500e6 * 4e6 / 1e9) / 12.0 / monthly_need * 100.0;
    assert_relative_eq!(result.objective, expected, max_relative = 1e-3);
    // even rationing is the unique optimum of the max-min objective
    for fed in &result.humans_fed_kcals {
        assert_relative_eq!(*fed, expected, max_relative = 1e-2);
    }
}

#[test]
fn stored_food_waste_reduces_the_ration() {
    let mut inputs = quiet_scenario();
    inputs.nmonths = 12;
    inputs.enable.stored_food = true;
    inputs.stored_food_dry_caloric_tons = 500e6;
    inputs.waste.crops = 20.0;
    let result = foodshock_core::run(&inputs).unwrap();
    let monthly_need = 7.8e9 * 2100.0 * 30.0 / 1e9;
    let expected = (500e6 * 4e6 / 1e9) * 0.8 / 12.0 / monthly_need * 100.0;
    assert_relative_eq!(result.objective, expected, max_relative = 1e-3);
}

#[test]
fn seaweed_only_respects_density_cap() {
    let mut inputs = quiet_scenario();
    inputs.enable.seaweed = true;
    inputs.delay.seaweed = 0;
    inputs.seaweed.new_area_per_day = 100.0;
    let result = foodshock_core::run(&inputs).unwrap();

    // the audit inside run() already checked the biomass recurrence; check
    // the density cap explicitly on the solved series
    // (re-derive to get the solved values via the percent series)
    assert!(result.objective >= 0.0);
    assert!(result
        .analysis
        .seaweed
        .iter()
        .all(|pct| *pct >= -1e-9 && *pct <= inputs.max_seaweed_as_percent_kcals + 1e-6));
}

#[test]
fn seaweed_human_cap_binds_the_contribution() {
    let mut inputs = quiet_scenario();
    inputs.enable.seaweed = true;
    inputs.enable.stored_food = true;
    inputs.delay.seaweed = 0;
    inputs.max_seaweed_as_percent_kcals = 5.0;
    let result = foodshock_core::run(&inputs).unwrap();
    assert!(result
        .analysis
        .seaweed
        .iter()
        .all(|pct| *pct <= 5.0 + 1e-6));
}

#[test]
fn objective_is_the_worst_month() {
    let inputs = ScenarioInputs::nuclear_winter();
    let result = foodshock_core::run(&inputs).unwrap();
    assert!(result.warnings.is_empty());
    assert!(result.objective > 0.0);
    let worst = result
        .humans_fed_kcals
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min);
    for fed in &result.humans_fed_kcals {
        assert!(result.objective <= fed + 1e-3);
    }
    assert_relative_eq!(result.objective, worst, max_relative = 1e-2);
}

#[test]
fn business_as_usual_feeds_everyone() {
    let inputs = ScenarioInputs::baseline();
    let result = foodshock_core::run(&inputs).unwrap();
    assert!(result.warnings.is_empty());
    assert!(
        result.objective >= 99.5,
        "business as usual fed only {:.1}% of needs",
        result.objective
    );
}

#[test]
fn feed_shutoff_frees_calories_for_humans() {
    let mut base = ScenarioInputs::nuclear_winter();
    base.nutrition.include_fat = false;
    base.nutrition.include_protein = false;

    let mut long_usage = base.clone();
    long_usage.delay.feed_shutoff = 24;
    long_usage.delay.biofuel_shutoff = 24;

    let fast = foodshock_core::run(&base).unwrap();
    let slow = foodshock_core::run(&long_usage).unwrap();
    // sustained feed usage can only hurt the worst month (more demand, more
    // secondary meat, but conversion losses dominate)
    assert!(fast.objective >= slow.objective - 1e-6);
}

#[test]
fn delayed_shutoff_rations_the_remainder() {
    // stored food only, with feed and biofuel running for three months:
    // the optimizer evenly rations whatever the animals left behind
    let mut inputs = quiet_scenario();
    inputs.nmonths = 12;
    inputs.enable.stored_food = true;
    inputs.stored_food_dry_caloric_tons = 1500e6;
    inputs.waste.crops = 0.0;
    inputs.delay.feed_shutoff = 3;
    inputs.delay.biofuel_shutoff = 3;
    let result = foodshock_core::run(&inputs).unwrap();

    let initial = 1500e6 * 4e6 / 1e9;
    let monthly_demand =
        inputs.feed_biofuels.feed_monthly_kcals + inputs.feed_biofuels.biofuel_monthly_kcals;
    let monthly_need = 7.8e9 * 2100.0 * 30.0 / 1e9;
    let expected = (initial - 3.0 * monthly_demand) / 12.0 / monthly_need * 100.0;
    assert_relative_eq!(result.objective, expected, max_relative = 1e-3);
}

#[test]
fn resilient_foods_beat_no_response() {
    let with = foodshock_core::run(&ScenarioInputs::nuclear_winter()).unwrap();
    let without =
        foodshock_core::run(&ScenarioInputs::nuclear_winter_no_resilient_foods()).unwrap();
    assert!(with.objective + 1e-6 >= without.objective);
    // the no-response run never touches the resilient sources
    assert!(without.analysis.seaweed.iter().all(|p| *p == 0.0));
    assert!(without.analysis.methane_scp.iter().all(|p| *p == 0.0));
    assert!(without.analysis.cellulosic_sugar.iter().all(|p| *p == 0.0));
    assert!(without.analysis.greenhouses.iter().all(|p| *p == 0.0));
}

#[test]
fn over_demand_scenario_still_solves_with_warning() {
    let mut inputs = ScenarioInputs::nuclear_winter();
    inputs.stored_food_dry_caloric_tons = 1e6;
    inputs.delay.feed_shutoff = inputs.nmonths;
    inputs.delay.biofuel_shutoff = inputs.nmonths;
    inputs.smoothing.kcal_smoothing = false;
    inputs.smoothing.stored_food_smoothing = false;
    let result = foodshock_core::run(&inputs).unwrap();
    assert_eq!(result.warnings.len(), 1);
    // stored food contributes nothing to humans
    assert!(result.analysis.stored_food.iter().all(|pct| *pct < 1e-9));
}

#[test]
fn nuclear_winter_with_all_nutrients_solves() {
    let mut inputs = ScenarioInputs::nuclear_winter();
    inputs.nutrition.include_fat = true;
    inputs.nutrition.include_protein = true;
    let result = foodshock_core::run(&inputs).unwrap();
    assert!(result.objective > 0.0);
    // with fat and protein included the objective is bounded by all three
    for m in 0..result.nmonths() {
        assert!(result.objective <= result.humans_fed_kcals[m] + 1e-3);
        assert!(result.objective <= result.humans_fed_fat[m] + 1e-3);
        assert!(result.objective <= result.humans_fed_protein[m] + 1e-3);
    }
}

#[test]
fn kcal_smoothing_bounds_month_over_month_change() {
    let mut inputs = ScenarioInputs::nuclear_winter();
    inputs.smoothing.kcal_smoothing = true;
    let result = foodshock_core::run(&inputs).unwrap();
    for w in result.humans_fed_kcals.windows(2) {
        if w[0] > 1e-6 && w[1] > 1e-6 {
            let ratio = w[1] / w[0];
            assert!(
                (1.0 / 1.05 - 1e-6..=1.05 + 1e-6).contains(&ratio),
                "humans fed jumped by a factor {ratio}"
            );
        }
    }
}

#[test]
fn scenario_json_round_trip() {
    let inputs = ScenarioInputs::nuclear_winter();
    let text = serde_json::to_string(&inputs).unwrap();
    let back: ScenarioInputs = serde_json::from_str(&text).unwrap();
    assert_eq!(back.nmonths, inputs.nmonths);
    assert_eq!(back.seasonality, inputs.seasonality);
    back.validate().unwrap();
}
