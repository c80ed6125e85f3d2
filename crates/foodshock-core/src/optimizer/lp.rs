//! Builds and solves the allocation LP.
//!
//! One variable family per stock or flow, one entry per month. The
//! objective is a single scalar bounded above by every month's (and every
//! included nutrient's) humans-fed value, so maximizing it maximizes the
//! worst month: the max-min formulation.
//!
//! The solver backend is whatever `good_lp`'s `default_solver` resolves to
//! under the enabled feature (Clarabel by default, HiGHS via
//! `solver-highs`).

use good_lp::{
    constraint, default_solver, variable, variables, Expression, Solution, SolverModel, Variable,
};

use crate::error::ModelError;
use crate::params::{MonthlyConstants, ScalarConstants};

/// Solved values for every monthly variable family. Disabled sources report
/// zeros.
#[derive(Debug, Clone, Default)]
pub struct MonthlySolution {
    pub stored_food_start: Vec<f64>,
    pub stored_food_end: Vec<f64>,
    pub stored_food_eaten: Vec<f64>,

    pub seaweed_wet_on_farm: Vec<f64>,
    pub used_area: Vec<f64>,
    pub seaweed_food_produced: Vec<f64>,

    pub crops_food_storage_no_rotation: Vec<f64>,
    pub crops_food_storage_rotation: Vec<f64>,
    pub crops_food_eaten_no_rotation: Vec<f64>,
    pub crops_food_eaten_with_rotation: Vec<f64>,

    pub humans_fed_kcals: Vec<f64>,
    pub humans_fed_fat: Vec<f64>,
    pub humans_fed_protein: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LpSolution {
    /// The max-min percent of the population fed
    pub objective: f64,
    pub monthly: MonthlySolution,
}

struct StoredFoodVars {
    start: Vec<Variable>,
    end: Vec<Variable>,
    eaten: Vec<Variable>,
}

struct SeaweedVars {
    wet_on_farm: Vec<Variable>,
    used_area: Vec<Variable>,
    food_produced: Vec<Variable>,
}

struct CropVars {
    storage_no_rotation: Vec<Variable>,
    storage_rotation: Vec<Variable>,
    eaten_no_rotation: Vec<Variable>,
    eaten_with_rotation: Vec<Variable>,
}

pub fn optimize(
    scalars: &ScalarConstants,
    monthly: &MonthlyConstants,
) -> Result<LpSolution, ModelError> {
    let n = scalars.nmonths;
    let mut vars = variables!();

    let objective = vars.add(variable().min(0.0));

    let sf = scalars.add_stored_food.then(|| StoredFoodVars {
        start: (0..n)
            .map(|_| vars.add(variable().min(0.0).max(scalars.initial_sf_kcals)))
            .collect(),
        end: (0..n)
            .map(|_| vars.add(variable().min(0.0).max(scalars.initial_sf_kcals)))
            .collect(),
        eaten: (0..n)
            .map(|_| vars.add(variable().min(0.0).max(scalars.initial_sf_kcals)))
            .collect(),
    });

    let seaweed = scalars.add_seaweed.then(|| SeaweedVars {
        wet_on_farm: (0..n)
            .map(|m| {
                vars.add(
                    variable()
                        .min(scalars.initial_seaweed)
                        .max(scalars.maximum_density * monthly.built_area[m]),
                )
            })
            .collect(),
        used_area: (0..n)
            .map(|m| {
                vars.add(
                    variable()
                        .min(scalars.initial_area)
                        .max(monthly.built_area[m]),
                )
            })
            .collect(),
        food_produced: (0..n).map(|_| vars.add(variable().min(0.0))).collect(),
    });

    let crops = scalars.add_outdoor_growing.then(|| CropVars {
        storage_no_rotation: (0..n).map(|_| vars.add(variable().min(0.0))).collect(),
        storage_rotation: (0..n).map(|_| vars.add(variable().min(0.0))).collect(),
        eaten_no_rotation: (0..n).map(|_| vars.add(variable().min(0.0))).collect(),
        eaten_with_rotation: (0..n).map(|_| vars.add(variable().min(0.0))).collect(),
    });

    let humans_fed_kcals: Vec<Variable> = (0..n).map(|_| vars.add(variable().min(0.0))).collect();
    let humans_fed_fat: Vec<Variable> = if scalars.include_fat {
        (0..n).map(|_| vars.add(variable().min(0.0))).collect()
    } else {
        Vec::new()
    };
    let humans_fed_protein: Vec<Variable> = if scalars.include_protein {
        (0..n).map(|_| vars.add(variable().min(0.0))).collect()
    } else {
        Vec::new()
    };

    let mut model = vars.maximise(objective).using(default_solver);

    // ---- seaweed stock dynamics ----
    if let Some(sw) = &seaweed {
        for m in 0..n {
            if m == 0 {
                model = model
                    .with(constraint!(sw.wet_on_farm[0] == scalars.initial_seaweed))
                    .with(constraint!(sw.used_area[0] == scalars.initial_area))
                    .with(constraint!(sw.food_produced[0] == 0.0));
            } else {
                model = model.with(constraint!(
                    sw.wet_on_farm[m] <= scalars.maximum_density * sw.used_area[m]
                ));
                let growth = 1.0 + scalars.seaweed_growth_percent_monthly / 100.0;
                let expansion_loss =
                    scalars.minimum_density * scalars.harvest_loss_percent / 100.0;
                model = model.with(constraint!(
                    sw.wet_on_farm[m]
                        == growth * sw.wet_on_farm[m - 1] - sw.food_produced[m]
                            - expansion_loss * sw.used_area[m]
                            + expansion_loss * sw.used_area[m - 1]
                ));
            }
            // humans can only eat so much seaweed
            model = model.with(constraint!(
                scalars.seaweed_kcals * sw.food_produced[m]
                    <= scalars.max_seaweed_as_percent_kcals / 100.0
                        * (scalars.population * scalars.kcals_monthly / 1e9)
            ));
        }
    }

    // ---- stored food stock dynamics ----
    if let Some(sf) = &sf {
        for m in 0..n {
            if m == 0 {
                model = model.with(constraint!(sf.start[0] == scalars.initial_sf_kcals));
            } else {
                model = model.with(constraint!(sf.start[m] == sf.end[m - 1]));
                if scalars.stored_food_smoothing {
                    let limit = scalars.fluctuation_limit;
                    model = model
                        .with(constraint!(sf.eaten[m] <= limit * sf.eaten[m - 1]))
                        .with(constraint!(sf.eaten[m] >= (1.0 / limit) * sf.eaten[m - 1]));
                }
            }
            model = model.with(constraint!(sf.end[m] == sf.start[m] - sf.eaten[m]));
        }
    }

    // ---- outdoor crop pools: first-harvest and rotation ----
    if let Some(c) = &crops {
        let hd = scalars.initial_harvest_duration;
        for m in 0..n {
            let produced = monthly.crops_food_produced[m];
            if m == 0 {
                model = model
                    .with(constraint!(
                        c.storage_no_rotation[0] == produced - c.eaten_no_rotation[0]
                    ))
                    .with(constraint!(c.storage_rotation[0] == 0.0))
                    .with(constraint!(c.eaten_with_rotation[0] == 0.0));
            } else if m == n - 1 {
                // nothing may be left rotting in storage at the end
                model = model
                    .with(constraint!(c.storage_no_rotation[m] == 0.0))
                    .with(constraint!(c.storage_rotation[m] == 0.0))
                    .with(constraint!(
                        c.storage_rotation[m]
                            == produced - c.eaten_with_rotation[m] + c.storage_rotation[m - 1]
                    ))
                    .with(constraint!(
                        c.storage_no_rotation[m]
                            == c.storage_no_rotation[m - 1] - c.eaten_no_rotation[m]
                    ));
            } else if m < hd {
                model = model
                    .with(constraint!(c.storage_rotation[m] == 0.0))
                    .with(constraint!(c.eaten_with_rotation[m] == 0.0))
                    .with(constraint!(
                        c.storage_no_rotation[m]
                            == produced - c.eaten_no_rotation[m] + c.storage_no_rotation[m - 1]
                    ));
            } else {
                // new production fills the rotation pool; the first-harvest
                // pool only drains
                model = model
                    .with(constraint!(
                        c.storage_rotation[m]
                            == produced - c.eaten_with_rotation[m] + c.storage_rotation[m - 1]
                    ))
                    .with(constraint!(
                        c.storage_no_rotation[m]
                            == c.storage_no_rotation[m - 1] - c.eaten_no_rotation[m]
                    ));
            }
        }
    }

    // ---- nutrient accounting, consistency, and the max-min objective ----
    let waste = 1.0 - scalars.crop_waste_percent / 100.0;
    let kcal_scale = 100.0 / scalars.billion_kcals_needed;
    let fat_scale = 100.0 / scalars.thou_tons_fat_needed;
    let protein_scale = 100.0 / scalars.thou_tons_protein_needed;

    for m in 0..n {
        // kcals fed, as percent of need
        let mut expr = Expression::from(0.0);
        let mut constant = 0.0;
        if let Some(sf) = &sf {
            expr += (waste * kcal_scale) * sf.eaten[m];
        }
        if let Some(c) = &crops {
            expr += (waste * kcal_scale) * c.eaten_no_rotation[m];
            expr += (scalars.og_rotation_fraction_kcals * waste * kcal_scale)
                * c.eaten_with_rotation[m];
        }
        if let Some(sw) = &seaweed {
            expr += (scalars.seaweed_kcals * kcal_scale) * sw.food_produced[m];
        }
        constant -= monthly.nonhuman_consumption.kcals_series()[m] * waste;
        constant += monthly.dairy_milk.kcals_series()[m];
        constant += monthly.cattle_maintained.kcals_series()[m];
        constant += monthly.meat_eaten[m];
        constant += monthly.cs_for_humans.kcals_series()[m];
        constant += monthly.scp_for_humans.kcals_series()[m];
        constant += monthly.greenhouse_area[m] * monthly.greenhouse_per_ha.kcals_series()[m];
        constant += monthly.fish.kcals_series()[m];
        constant += monthly.h_e_created.kcals_series()[m];
        model = model.with(constraint!(
            humans_fed_kcals[m] == expr + constant * kcal_scale
        ));

        if scalars.include_fat {
            let mut expr = Expression::from(0.0);
            let mut constant = 0.0;
            if let Some(sf) = &sf {
                expr += (scalars.sf_fraction_fat * waste * fat_scale) * sf.eaten[m];
            }
            if let Some(c) = &crops {
                expr += (scalars.og_fraction_fat * waste * fat_scale) * c.eaten_no_rotation[m];
                expr += (scalars.og_rotation_fraction_fat * waste * fat_scale)
                    * c.eaten_with_rotation[m];
            }
            if let Some(sw) = &seaweed {
                expr += (scalars.seaweed_fat * fat_scale) * sw.food_produced[m];
            }
            constant -= monthly.nonhuman_consumption.fat_series()[m] * waste;
            constant += monthly.dairy_milk.fat_series()[m];
            constant += monthly.cattle_maintained.fat_series()[m];
            constant += monthly.meat_eaten[m] * scalars.meat_fraction_fat;
            constant += monthly.scp_for_humans.fat_series()[m];
            constant += monthly.greenhouse_area[m] * monthly.greenhouse_per_ha.fat_series()[m];
            constant += monthly.fish.fat_series()[m];
            constant += monthly.h_e_created.fat_series()[m];
            model = model.with(constraint!(
                humans_fed_fat[m] == expr + constant * fat_scale
            ));
        }

        if scalars.include_protein {
            let mut expr = Expression::from(0.0);
            let mut constant = 0.0;
            if let Some(sf) = &sf {
                expr += (scalars.sf_fraction_protein * waste * protein_scale) * sf.eaten[m];
            }
            if let Some(c) = &crops {
                expr +=
                    (scalars.og_fraction_protein * waste * protein_scale) * c.eaten_no_rotation[m];
                expr += (scalars.og_rotation_fraction_protein * waste * protein_scale)
                    * c.eaten_with_rotation[m];
            }
            if let Some(sw) = &seaweed {
                expr += (scalars.seaweed_protein * protein_scale) * sw.food_produced[m];
            }
            constant -= monthly.nonhuman_consumption.protein_series()[m] * waste;
            constant += monthly.dairy_milk.protein_series()[m];
            constant += monthly.cattle_maintained.protein_series()[m];
            constant += monthly.meat_eaten[m] * scalars.meat_fraction_protein;
            constant += monthly.scp_for_humans.protein_series()[m];
            constant += monthly.greenhouse_area[m] * monthly.greenhouse_per_ha.protein_series()[m];
            constant += monthly.fish.protein_series()[m];
            constant += monthly.h_e_created.protein_series()[m];
            model = model.with(constraint!(
                humans_fed_protein[m] == expr + constant * protein_scale
            ));
        }

        // calories already committed to animals and biofuel must actually be
        // drawn from the stored food and crop pools
        let mut committed = Expression::from(0.0);
        if let Some(sf) = &sf {
            committed += sf.eaten[m];
        }
        if let Some(c) = &crops {
            committed += c.eaten_no_rotation[m];
            committed += scalars.og_rotation_fraction_kcals * c.eaten_with_rotation[m];
        }
        model = model.with(constraint!(
            committed >= monthly.nonhuman_consumption.kcals_series()[m]
        ));

        if scalars.include_fat {
            let mut committed = Expression::from(0.0);
            if let Some(sf) = &sf {
                committed += scalars.sf_fraction_fat * sf.eaten[m];
            }
            if let Some(c) = &crops {
                committed += scalars.og_fraction_fat * c.eaten_no_rotation[m];
                committed += scalars.og_rotation_fraction_fat * c.eaten_with_rotation[m];
            }
            model = model.with(constraint!(
                committed >= monthly.nonhuman_consumption.fat_series()[m]
            ));
        }
        if scalars.include_protein {
            let mut committed = Expression::from(0.0);
            if let Some(sf) = &sf {
                committed += scalars.sf_fraction_protein * sf.eaten[m];
            }
            if let Some(c) = &crops {
                committed += scalars.og_fraction_protein * c.eaten_no_rotation[m];
                committed += scalars.og_rotation_fraction_protein * c.eaten_with_rotation[m];
            }
            model = model.with(constraint!(
                committed >= monthly.nonhuman_consumption.protein_series()[m]
            ));
        }

        if scalars.kcal_smoothing && m > 0 {
            model = model
                .with(constraint!(
                    humans_fed_kcals[m - 1] >= (1.0 / 1.05) * humans_fed_kcals[m]
                ))
                .with(constraint!(
                    humans_fed_kcals[m - 1] <= 1.05 * humans_fed_kcals[m]
                ));
        }

        // the max-min coupling
        model = model.with(constraint!(objective <= humans_fed_kcals[m]));
        if scalars.include_fat {
            model = model.with(constraint!(objective <= humans_fed_fat[m]));
        }
        if scalars.include_protein {
            model = model.with(constraint!(objective <= humans_fed_protein[m]));
        }
    }

    let solution = model.solve()?;

    let values = |vs: &[Variable]| -> Vec<f64> { vs.iter().map(|v| solution.value(*v)).collect() };
    let zeros = vec![0.0; n];

    let monthly_solution = MonthlySolution {
        stored_food_start: sf.as_ref().map_or(zeros.clone(), |v| values(&v.start)),
        stored_food_end: sf.as_ref().map_or(zeros.clone(), |v| values(&v.end)),
        stored_food_eaten: sf.as_ref().map_or(zeros.clone(), |v| values(&v.eaten)),
        seaweed_wet_on_farm: seaweed
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.wet_on_farm)),
        used_area: seaweed.as_ref().map_or(zeros.clone(), |v| values(&v.used_area)),
        seaweed_food_produced: seaweed
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.food_produced)),
        crops_food_storage_no_rotation: crops
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.storage_no_rotation)),
        crops_food_storage_rotation: crops
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.storage_rotation)),
        crops_food_eaten_no_rotation: crops
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.eaten_no_rotation)),
        crops_food_eaten_with_rotation: crops
            .as_ref()
            .map_or(zeros.clone(), |v| values(&v.eaten_with_rotation)),
        humans_fed_kcals: values(&humans_fed_kcals),
        humans_fed_fat: if scalars.include_fat {
            values(&humans_fed_fat)
        } else {
            zeros.clone()
        },
        humans_fed_protein: if scalars.include_protein {
            values(&humans_fed_protein)
        } else {
            zeros
        },
    };

    Ok(LpSolution {
        objective: solution.value(objective),
        monthly: monthly_solution,
    })
}
