//! Post-solve analysis: substitute the solved variables back into each
//! source's nutrient contribution to get percent-of-need-fed per source, and
//! audit that the solution actually satisfies the model's constraints.

use serde::{Deserialize, Serialize};

use crate::conversions::Conversions;
use crate::error::ModelError;
use crate::optimizer::lp::LpSolution;
use crate::params::{MonthlyConstants, ScalarConstants};

/// Stock-balance closure tolerance, relative to the stock size.
const BALANCE_TOL: f64 = 1e-6;
/// Tolerance for the objective matching the worst month.
const OBJECTIVE_TOL: f64 = 1e-3;

/// Percent of caloric need fed, per source and per month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub objective: f64,

    pub percent_fed_kcals: Vec<f64>,
    pub percent_fed_fat: Vec<f64>,
    pub percent_fed_protein: Vec<f64>,

    pub stored_food: Vec<f64>,
    pub outdoor_crops: Vec<f64>,
    pub seaweed: Vec<f64>,
    pub cellulosic_sugar: Vec<f64>,
    pub methane_scp: Vec<f64>,
    pub greenhouses: Vec<f64>,
    pub fish: Vec<f64>,
    pub milk: Vec<f64>,
    pub meat: Vec<f64>,
    /// Calories diverted to feed and biofuel, as a negative percent
    pub nonhuman: Vec<f64>,
}

pub fn analyze(
    scalars: &ScalarConstants,
    monthly: &MonthlyConstants,
    solution: &LpSolution,
    ctx: &Conversions,
) -> Result<Analysis, ModelError> {
    if scalars.check_constraints {
        audit(scalars, monthly, solution)?;
    }

    let n = scalars.nmonths;
    let waste = 1.0 - scalars.crop_waste_percent / 100.0;
    let scale = 100.0 / scalars.billion_kcals_needed;
    let sol = &solution.monthly;

    let per_month = |f: &dyn Fn(usize) -> f64| -> Vec<f64> { (0..n).map(f).collect() };

    let stored_food = per_month(&|m| sol.stored_food_eaten[m] * waste * scale);
    let outdoor_crops = per_month(&|m| {
        (sol.crops_food_eaten_no_rotation[m]
            + sol.crops_food_eaten_with_rotation[m] * scalars.og_rotation_fraction_kcals)
            * waste
            * scale
    });
    let seaweed = per_month(&|m| sol.seaweed_food_produced[m] * scalars.seaweed_kcals * scale);
    let cellulosic_sugar = monthly
        .cs_for_humans
        .in_units_percent_fed(ctx)
        .kcals_series()
        .to_vec();
    let methane_scp = monthly
        .scp_for_humans
        .in_units_percent_fed(ctx)
        .kcals_series()
        .to_vec();
    let greenhouses = per_month(&|m| {
        monthly.greenhouse_area[m] * monthly.greenhouse_per_ha.kcals_series()[m] * scale
    });
    let fish = monthly.fish.in_units_percent_fed(ctx).kcals_series().to_vec();
    let milk = monthly
        .dairy_milk
        .in_units_percent_fed(ctx)
        .kcals_series()
        .to_vec();
    let meat = per_month(&|m| {
        (monthly.cattle_maintained.kcals_series()[m]
            + monthly.meat_eaten[m]
            + monthly.h_e_created.kcals_series()[m])
            * scale
    });
    let nonhuman =
        per_month(&|m| -monthly.nonhuman_consumption.kcals_series()[m] * waste * scale);

    Ok(Analysis {
        objective: solution.objective,
        percent_fed_kcals: sol.humans_fed_kcals.clone(),
        percent_fed_fat: sol.humans_fed_fat.clone(),
        percent_fed_protein: sol.humans_fed_protein.clone(),
        stored_food,
        outdoor_crops,
        seaweed,
        cellulosic_sugar,
        methane_scp,
        greenhouses,
        fish,
        milk,
        meat,
        nonhuman,
    })
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= BALANCE_TOL * a.abs().max(b.abs()).max(1.0)
}

/// Verify the solved values honor the stock dynamics and that the objective
/// is tight against the worst month.
fn audit(
    scalars: &ScalarConstants,
    monthly: &MonthlyConstants,
    solution: &LpSolution,
) -> Result<(), ModelError> {
    let n = scalars.nmonths;
    let sol = &solution.monthly;

    if scalars.add_stored_food {
        for m in 0..n {
            let start = if m == 0 {
                scalars.initial_sf_kcals
            } else {
                sol.stored_food_end[m - 1]
            };
            if !close(sol.stored_food_start[m], start) {
                return Err(ModelError::Audit(format!(
                    "stored food start does not chain from the previous month at {m}"
                )));
            }
            if !close(
                sol.stored_food_end[m],
                sol.stored_food_start[m] - sol.stored_food_eaten[m],
            ) {
                return Err(ModelError::Audit(format!(
                    "stored food balance does not close in month {m}"
                )));
            }
        }
    }

    if scalars.add_seaweed {
        let growth = 1.0 + scalars.seaweed_growth_percent_monthly / 100.0;
        let loss = scalars.minimum_density * scalars.harvest_loss_percent / 100.0;
        for m in 1..n {
            let expected = sol.seaweed_wet_on_farm[m - 1] * growth
                - sol.seaweed_food_produced[m]
                - (sol.used_area[m] - sol.used_area[m - 1]) * loss;
            if !close(sol.seaweed_wet_on_farm[m], expected) {
                return Err(ModelError::Audit(format!(
                    "seaweed biomass recurrence does not hold in month {m}"
                )));
            }
            if sol.seaweed_wet_on_farm[m]
                > scalars.maximum_density * sol.used_area[m] * (1.0 + BALANCE_TOL)
            {
                return Err(ModelError::Audit(format!(
                    "seaweed biomass exceeds the used-area density cap in month {m}"
                )));
            }
        }
    }

    if scalars.add_outdoor_growing {
        let last = n - 1;
        for (name, value) in [
            ("first-harvest", sol.crops_food_storage_no_rotation[last]),
            ("rotation", sol.crops_food_storage_rotation[last]),
        ] {
            if value.abs() > BALANCE_TOL * monthly.crops_food_produced[last].max(1.0) {
                return Err(ModelError::Audit(format!(
                    "{name} crop storage is not empty at the terminal month"
                )));
            }
        }
    }

    // reconstruct the kcals accounting from the solved variables; a mismatch
    // means the model builder and the solver disagree about the problem
    let waste = 1.0 - scalars.crop_waste_percent / 100.0;
    let kcal_scale = 100.0 / scalars.billion_kcals_needed;
    for m in 0..n {
        let from_pools = (sol.stored_food_eaten[m]
            + sol.crops_food_eaten_no_rotation[m]
            + sol.crops_food_eaten_with_rotation[m] * scalars.og_rotation_fraction_kcals
            - monthly.nonhuman_consumption.kcals_series()[m])
            * waste;
        let reconstructed = (from_pools
            + sol.seaweed_food_produced[m] * scalars.seaweed_kcals
            + monthly.dairy_milk.kcals_series()[m]
            + monthly.cattle_maintained.kcals_series()[m]
            + monthly.meat_eaten[m]
            + monthly.cs_for_humans.kcals_series()[m]
            + monthly.scp_for_humans.kcals_series()[m]
            + monthly.greenhouse_area[m] * monthly.greenhouse_per_ha.kcals_series()[m]
            + monthly.fish.kcals_series()[m]
            + monthly.h_e_created.kcals_series()[m])
            * kcal_scale;
        let tol = OBJECTIVE_TOL * sol.humans_fed_kcals[m].abs().max(1.0);
        if (sol.humans_fed_kcals[m] - reconstructed).abs() > tol {
            return Err(ModelError::Audit(format!(
                "humans fed in month {m} does not reconstruct from the solved variables: \
                 {} vs {reconstructed}",
                sol.humans_fed_kcals[m]
            )));
        }
    }

    // the objective must equal the worst humans-fed value across months and
    // included nutrients
    let mut worst = f64::INFINITY;
    for m in 0..n {
        worst = worst.min(sol.humans_fed_kcals[m]);
        if scalars.include_fat {
            worst = worst.min(sol.humans_fed_fat[m]);
        }
        if scalars.include_protein {
            worst = worst.min(sol.humans_fed_protein[m]);
        }
        if solution.objective > sol.humans_fed_kcals[m] * (1.0 + OBJECTIVE_TOL) + OBJECTIVE_TOL {
            return Err(ModelError::Audit(format!(
                "objective exceeds humans fed in month {m}"
            )));
        }
    }
    if (worst - solution.objective).abs() > OBJECTIVE_TOL * worst.abs().max(1.0) {
        return Err(ModelError::Audit(format!(
            "objective {} is not tight against the worst month {worst}",
            solution.objective
        )));
    }

    Ok(())
}
