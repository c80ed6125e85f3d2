//! Livestock coupling: milk and meat from feed the optimizer never sees
//! (grasses, residues), meat and milk created from human-edible feed, and
//! the one-shot reserve from culling herds that can no longer be fed.

use crate::constants::{
    human_inedible_feed_baseline, human_inedible_feed_nuclear_winter,
    CATTLE_BASELINE_TONS_MONTHLY, CHICKEN_PORK_LIMIT_TONS_MONTHLY, DAIRY_LIMIT_TONS_MONTHLY,
    EDIBLE_TO_CATTLE_CONVERSION, EDIBLE_TO_CHICKEN_PORK_CONVERSION, EDIBLE_TO_DAIRY_CONVERSION,
    INEDIBLE_TO_CATTLE_CONVERSION, INEDIBLE_TO_DAIRY_CONVERSION, KCALS_PER_DRY_CALORIC_TON,
    MILK_FAT_PER_KG, MILK_KCALS_PER_KG, MILK_PROTEIN_PER_KG,
};
use crate::error::ModelError;
use crate::inputs::ScenarioInputs;
use crate::nutrients::{NutrientUnits, Nutrients};

/// Milk and cattle meat sustained on human-inedible feed.
#[derive(Debug, Clone)]
pub struct PrimaryMeatDairy {
    /// Milk produced [tons / month]
    pub dairy_milk_tons: Vec<f64>,
    /// Cattle meat maintained [tons / month]
    pub cattle_maintained_tons: Vec<f64>,
    /// Milk production headroom left for human-edible feed [tons / month]
    pub h_e_fed_dairy_limit: Vec<f64>,
    /// Post-waste nutrient series
    pub dairy_milk: Nutrients,
    pub cattle_maintained: Nutrients,
}

pub fn derive_primary(inputs: &ScenarioInputs) -> PrimaryMeatDairy {
    let feed = if inputs.is_nuclear_winter {
        human_inedible_feed_nuclear_winter(inputs.nmonths)
    } else {
        human_inedible_feed_baseline(inputs.nmonths)
    };

    let mut dairy_milk_tons = Vec::with_capacity(inputs.nmonths);
    let mut cattle_maintained_tons = Vec::with_capacity(inputs.nmonths);
    for feed_tons in &feed {
        let mut for_cattle = *feed_tons;
        if inputs.enable.milk {
            let max_dairy = feed_tons / INEDIBLE_TO_DAIRY_CONVERSION;
            if max_dairy <= DAIRY_LIMIT_TONS_MONTHLY {
                // every ton of inedible feed goes to dairy
                dairy_milk_tons.push(max_dairy);
                cattle_maintained_tons.push(0.0);
                continue;
            }
            dairy_milk_tons.push(DAIRY_LIMIT_TONS_MONTHLY);
            for_cattle = feed_tons - DAIRY_LIMIT_TONS_MONTHLY * INEDIBLE_TO_DAIRY_CONVERSION;
        } else {
            dairy_milk_tons.push(0.0);
        }
        if inputs.enable.maintained_meat {
            cattle_maintained_tons.push(for_cattle / INEDIBLE_TO_CATTLE_CONVERSION);
        } else {
            cattle_maintained_tons.push(0.0);
        }
    }

    let h_e_fed_dairy_limit = dairy_milk_tons
        .iter()
        .map(|d| DAIRY_LIMIT_TONS_MONTHLY - d)
        .collect();

    let dairy_milk = milk_nutrients(inputs, &dairy_milk_tons);
    let cattle_maintained = cattle_nutrients(inputs, &cattle_maintained_tons, true);

    PrimaryMeatDairy {
        dairy_milk_tons,
        cattle_maintained_tons,
        h_e_fed_dairy_limit,
        dairy_milk,
        cattle_maintained,
    }
}

fn milk_nutrients(inputs: &ScenarioInputs, tons: &[f64]) -> Nutrients {
    let edible = 1.0 - inputs.waste.dairy / 100.0;
    Nutrients::series(
        tons.iter()
            .map(|t| t * 1e3 * MILK_KCALS_PER_KG / 1e9 * edible)
            .collect(),
        tons.iter().map(|t| t / 1e3 * MILK_FAT_PER_KG * edible).collect(),
        tons.iter()
            .map(|t| t / 1e3 * MILK_PROTEIN_PER_KG * edible)
            .collect(),
        NutrientUnits::billion_kcals_thousand_tons_each_month(),
    )
}

fn cattle_nutrients(inputs: &ScenarioInputs, tons: &[f64], apply_waste: bool) -> Nutrients {
    let ls = &inputs.livestock;
    let edible = if apply_waste {
        1.0 - inputs.waste.meat / 100.0
    } else {
        1.0
    };
    let kcals: Vec<f64> = tons
        .iter()
        .map(|t| t * 1e3 * ls.large_animal_kcals_per_kg / 1e9 * edible)
        .collect();
    let fat = kcals
        .iter()
        .map(|k| k * 1e9 * ls.large_animal_fat_per_kg / ls.large_animal_kcals_per_kg / 1e6)
        .collect();
    let protein = kcals
        .iter()
        .map(|k| k * 1e9 * ls.large_animal_protein_per_kg / ls.large_animal_kcals_per_kg / 1e6)
        .collect();
    Nutrients::series(
        kcals,
        fat,
        protein,
        NutrientUnits::billion_kcals_thousand_tons_each_month(),
    )
}

/// Meat and milk created from human-edible calories routed to animals.
#[derive(Debug, Clone)]
pub struct SecondaryMeatDairy {
    /// Post-waste nutrient series
    pub h_e_meat: Nutrients,
    pub h_e_milk: Nutrients,
    /// Meat plus milk, the term credited back to humans in the optimizer
    pub h_e_created: Nutrients,

    /// Chicken + pork production relative to the present-day baseline
    pub ratio_maintained_chicken_pork: Vec<f64>,
    pub ratio_maintained_cattle: Vec<f64>,
    pub culled_ratio_cattle: Vec<f64>,
    /// Small-animal share of combined small + medium carcass mass
    pub small_to_medium_ratio: f64,

    pub init_small_animals_culled: f64,
    pub init_medium_animals_culled: f64,
    pub init_large_animals_culled: f64,
}

pub fn derive_secondary(
    inputs: &ScenarioInputs,
    excess_kcals: &[f64],
    primary: &PrimaryMeatDairy,
) -> Result<SecondaryMeatDairy, ModelError> {
    let ls = &inputs.livestock;
    let nmonths = inputs.nmonths;

    let excess_dry_cal_tons: Vec<f64> = excess_kcals
        .iter()
        .map(|k| k * 1e9 / KCALS_PER_DRY_CALORIC_TON)
        .collect();
    if let Some(m) = excess_dry_cal_tons.iter().position(|t| *t < 0.0) {
        return Err(ModelError::Invariant(format!(
            "calories routed to animals are negative in month {m}: the scenario \
             commits more feed and biofuel than its sources can supply"
        )));
    }

    let cp_limit_feed_usage = CHICKEN_PORK_LIMIT_TONS_MONTHLY * EDIBLE_TO_CHICKEN_PORK_CONVERSION;

    let mut dairy_h_e_tons = Vec::with_capacity(nmonths);
    let mut chicken_pork_tons = Vec::with_capacity(nmonths);
    let mut cattle_h_e_tons = Vec::with_capacity(nmonths);
    for m in 0..nmonths {
        let mut dairy_feed_used = 0.0;
        if inputs.enable.milk {
            let max_dairy = excess_dry_cal_tons[m] / EDIBLE_TO_DAIRY_CONVERSION;
            if max_dairy <= primary.h_e_fed_dairy_limit[m] {
                dairy_h_e_tons.push(max_dairy);
                chicken_pork_tons.push(0.0);
                cattle_h_e_tons.push(0.0);
                continue;
            }
            dairy_h_e_tons.push(primary.h_e_fed_dairy_limit[m]);
            dairy_feed_used = primary.h_e_fed_dairy_limit[m] * EDIBLE_TO_DAIRY_CONVERSION;
        } else {
            dairy_h_e_tons.push(0.0);
        }

        let for_chicken_pork_cattle = excess_dry_cal_tons[m] - dairy_feed_used;
        if for_chicken_pork_cattle < 0.0 {
            return Err(ModelError::Invariant(format!(
                "negative feed remainder after dairy in month {m}"
            )));
        }

        let max_chicken_pork = for_chicken_pork_cattle / EDIBLE_TO_CHICKEN_PORK_CONVERSION;
        if max_chicken_pork <= CHICKEN_PORK_LIMIT_TONS_MONTHLY {
            chicken_pork_tons.push(max_chicken_pork);
            cattle_h_e_tons.push(0.0);
            continue;
        }
        chicken_pork_tons.push(CHICKEN_PORK_LIMIT_TONS_MONTHLY);
        let for_cattle = for_chicken_pork_cattle - cp_limit_feed_usage;
        cattle_h_e_tons.push(for_cattle / EDIBLE_TO_CATTLE_CONVERSION);
    }

    let ratio_maintained_cattle: Vec<f64> = primary
        .cattle_maintained_tons
        .iter()
        .zip(&cattle_h_e_tons)
        .map(|(inedible, h_e)| (inedible + h_e) / CATTLE_BASELINE_TONS_MONTHLY)
        .collect();
    let culled_ratio_cattle: Vec<f64> = ratio_maintained_cattle
        .iter()
        .map(|r| (1.0 - r).max(0.0))
        .collect();
    let ratio_maintained_chicken_pork: Vec<f64> = chicken_pork_tons
        .iter()
        .map(|t| t / CHICKEN_PORK_LIMIT_TONS_MONTHLY)
        .collect();

    // Chicken and pork keep the present-day mass split between small and
    // medium animals.
    let small_mass = ls.init_small_animals * ls.kg_per_small_animal;
    let medium_mass = ls.init_medium_animals * ls.kg_per_medium_animal;
    let small_to_medium_ratio = small_mass / (medium_mass + small_mass);

    let blended = |small: f64, medium: f64| {
        small * small_to_medium_ratio + medium * (1.0 - small_to_medium_ratio)
    };
    let cp_kcals: Vec<f64> = chicken_pork_tons
        .iter()
        .map(|t| {
            t * 1e3 * blended(ls.small_animal_kcals_per_kg, ls.medium_animal_kcals_per_kg) / 1e9
        })
        .collect();
    let cp_fat: Vec<f64> = chicken_pork_tons
        .iter()
        .map(|t| t * 1e3 * blended(ls.small_animal_fat_per_kg, ls.medium_animal_fat_per_kg) / 1e6)
        .collect();
    let cp_protein: Vec<f64> = chicken_pork_tons
        .iter()
        .map(|t| {
            t * 1e3 * blended(ls.small_animal_protein_per_kg, ls.medium_animal_protein_per_kg)
                / 1e6
        })
        .collect();

    let cattle = cattle_nutrients(inputs, &cattle_h_e_tons, false);

    let meat_waste = 1.0 - inputs.waste.meat / 100.0;
    let units = NutrientUnits::billion_kcals_thousand_tons_each_month();
    let h_e_meat = if inputs.enable.maintained_meat {
        Nutrients::series(
            cattle
                .kcals_series()
                .iter()
                .zip(&cp_kcals)
                .map(|(c, p)| (c + p) * meat_waste)
                .collect(),
            cattle
                .fat_series()
                .iter()
                .zip(&cp_fat)
                .map(|(c, p)| (c + p) * meat_waste)
                .collect(),
            cattle
                .protein_series()
                .iter()
                .zip(&cp_protein)
                .map(|(c, p)| (c + p) * meat_waste)
                .collect(),
            units.clone(),
        )
    } else {
        Nutrients::zero_series(nmonths, units.clone())
    };

    let h_e_milk = if inputs.enable.milk {
        milk_nutrients(inputs, &dairy_h_e_tons)
    } else {
        Nutrients::zero_series(nmonths, units)
    };

    let h_e_created = h_e_meat.add(&h_e_milk);

    let min_ratio_cp = ratio_maintained_chicken_pork
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min);
    let max_culled_cattle = culled_ratio_cattle.iter().cloned().fold(0.0, f64::max);
    let (small_culled, medium_culled, large_culled) = if inputs.is_nuclear_winter {
        (
            ls.init_small_animals * (1.0 - min_ratio_cp),
            ls.init_medium_animals * (1.0 - min_ratio_cp),
            ls.init_large_animals * max_culled_cattle,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    Ok(SecondaryMeatDairy {
        h_e_meat,
        h_e_milk,
        h_e_created,
        ratio_maintained_chicken_pork,
        ratio_maintained_cattle,
        culled_ratio_cattle,
        small_to_medium_ratio,
        init_small_animals_culled: small_culled,
        init_medium_animals_culled: medium_culled,
        init_large_animals_culled: large_culled,
    })
}

/// The culled-herd reserve released at a bounded monthly rate.
#[derive(Debug, Clone)]
pub struct CulledMeat {
    /// Total reserve [billion kcals], waste applied
    pub initial_meat_kcals: f64,
    /// [thousand tons / billion kcals] of the culled mix
    pub fraction_fat: f64,
    pub fraction_protein: f64,
    /// Months over which the reserve is released
    pub cull_duration: usize,
    /// Release rate [billion kcals / month]
    pub limit_per_month: f64,
    /// Monthly culled meat eaten [billion kcals]
    pub meat_eaten: Vec<f64>,
}

pub fn derive_culled(inputs: &ScenarioInputs, secondary: &SecondaryMeatDairy) -> CulledMeat {
    let ls = &inputs.livestock;
    let nmonths = inputs.nmonths;
    let meat_waste = 1.0 - inputs.waste.meat / 100.0;

    // per-animal totals: [billion kcals] and [thousand tons]
    let kcals_per_small = ls.small_animal_kcals_per_kg * ls.kg_per_small_animal / 1e9;
    let kcals_per_medium = ls.medium_animal_kcals_per_kg * ls.kg_per_medium_animal / 1e9;
    let kcals_per_large = ls.large_animal_kcals_per_kg * ls.kg_per_large_animal / 1e9;
    let fat_per_small = ls.small_animal_fat_per_kg * ls.kg_per_small_animal / 1e6;
    let fat_per_medium = ls.medium_animal_fat_per_kg * ls.kg_per_medium_animal / 1e6;
    let fat_per_large = ls.large_animal_fat_per_kg * ls.kg_per_large_animal / 1e6;
    let protein_per_small = ls.small_animal_protein_per_kg * ls.kg_per_small_animal / 1e6;
    let protein_per_medium = ls.medium_animal_protein_per_kg * ls.kg_per_medium_animal / 1e6;
    let protein_per_large = ls.large_animal_protein_per_kg * ls.kg_per_large_animal / 1e6;

    let init_meat_kcals = secondary.init_small_animals_culled * kcals_per_small
        + secondary.init_medium_animals_culled * kcals_per_medium
        + secondary.init_large_animals_culled * kcals_per_large;
    let init_meat_fat = secondary.init_small_animals_culled * fat_per_small
        + secondary.init_medium_animals_culled * fat_per_medium
        + secondary.init_large_animals_culled * fat_per_large;
    let init_meat_protein = secondary.init_small_animals_culled * protein_per_small
        + secondary.init_medium_animals_culled * protein_per_medium
        + secondary.init_large_animals_culled * protein_per_large;

    let (fraction_fat, fraction_protein) = if init_meat_kcals > 0.0 {
        (
            init_meat_fat / init_meat_kcals,
            init_meat_protein / init_meat_kcals,
        )
    } else {
        (0.0, 0.0)
    };

    let r = secondary.small_to_medium_ratio;
    let small_medium_herd_kcals = ls.init_small_animals * kcals_per_small * r
        + ls.init_medium_animals * kcals_per_medium * (1.0 - r);
    let large_herd_kcals = ls.init_large_animals * kcals_per_large;

    let (cull_duration, limit_per_month) = if inputs.is_nuclear_winter {
        // meat obtainable by culling down to the herd each month can sustain
        let culled_meat_over_time: Vec<f64> = (0..nmonths)
            .map(|m| {
                ((1.0 - secondary.ratio_maintained_chicken_pork[m]) * small_medium_herd_kcals
                    + secondary.culled_ratio_cattle[m] * large_herd_kcals)
                    * meat_waste
            })
            .collect();
        let peak = culled_meat_over_time.iter().cloned().fold(0.0, f64::max);
        let duration = if ls.recalculate_cull_duration {
            // first month the culling curve peaks
            let mut argmax = 0;
            let mut best = f64::NEG_INFINITY;
            for (i, v) in culled_meat_over_time.iter().enumerate() {
                if *v > best {
                    best = *v;
                    argmax = i;
                }
            }
            argmax + 1
        } else {
            ls.cull_duration_months
        };
        if duration == 0 {
            (0, 0.0)
        } else {
            let mut limit = peak / duration as f64;
            // cap the monthly release at a multiple of present-day slaughter
            let baseline_monthly_kcals = (CATTLE_BASELINE_TONS_MONTHLY
                * 1e3
                * ls.large_animal_kcals_per_kg
                + CHICKEN_PORK_LIMIT_TONS_MONTHLY
                    * 1e3
                    * (ls.small_animal_kcals_per_kg * r
                        + ls.medium_animal_kcals_per_kg * (1.0 - r)))
                / 1e9
                * meat_waste;
            limit = limit.min(ls.max_ratio_culled_slaughter_to_baseline * baseline_monthly_kcals);
            (duration, limit)
        }
    } else {
        (0, 0.0)
    };

    let meat_eaten = if inputs.enable.culled_meat {
        (0..nmonths)
            .map(|m| if m < cull_duration { limit_per_month } else { 0.0 })
            .collect()
    } else {
        vec![0.0; nmonths]
    };

    CulledMeat {
        initial_meat_kcals: init_meat_kcals * meat_waste,
        fraction_fat,
        fraction_protein,
        cull_duration,
        limit_per_month,
        meat_eaten,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ScenarioInputs;

    #[test]
    fn test_primary_dairy_first_then_cattle() {
        let inputs = ScenarioInputs::nuclear_winter();
        let primary = derive_primary(&inputs);
        // month 0: 2728e6/12 tons of feed, far above the dairy cap
        assert!((primary.dairy_milk_tons[0] - DAIRY_LIMIT_TONS_MONTHLY).abs() < 1e-6);
        let expected_cattle = (2728.0 * 1e6 / 12.0
            - DAIRY_LIMIT_TONS_MONTHLY * INEDIBLE_TO_DAIRY_CONVERSION)
            / INEDIBLE_TO_CATTLE_CONVERSION;
        assert!((primary.cattle_maintained_tons[0] - expected_cattle).abs() < 1e-6);
        // by year two feed is scarce and dairy absorbs all of it
        assert!(primary.dairy_milk_tons[12] < DAIRY_LIMIT_TONS_MONTHLY);
        assert_eq!(primary.cattle_maintained_tons[12], 0.0);
    }

    #[test]
    fn test_primary_respects_toggles() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.milk = false;
        let primary = derive_primary(&inputs);
        assert!(primary.dairy_milk_tons.iter().all(|d| *d == 0.0));
        assert!(primary.cattle_maintained_tons[0] > 0.0);

        inputs.enable.maintained_meat = false;
        let neither = derive_primary(&inputs);
        assert!(neither.cattle_maintained_tons.iter().all(|c| *c == 0.0));
    }

    #[test]
    fn test_secondary_cascade_order() {
        let inputs = ScenarioInputs::nuclear_winter();
        let primary = derive_primary(&inputs);
        // a little excess fills dairy headroom first
        let small_excess = vec![10.0; inputs.nmonths];
        let sec = derive_secondary(&inputs, &small_excess, &primary).unwrap();
        assert!(sec.ratio_maintained_chicken_pork.iter().all(|r| *r <= 1.0));
        assert!(sec
            .h_e_created
            .kcals_series()
            .iter()
            .all(|k| k.is_finite() && *k >= 0.0));

        // a huge excess saturates dairy and chicken/pork, spilling to cattle
        let big_excess = vec![600e3; inputs.nmonths];
        let sec = derive_secondary(&inputs, &big_excess, &primary).unwrap();
        assert!((sec.ratio_maintained_chicken_pork[12] - 1.0).abs() < 1e-9);
        assert!(sec.ratio_maintained_cattle[12] > 0.0);
    }

    #[test]
    fn test_secondary_rejects_negative_excess() {
        let inputs = ScenarioInputs::nuclear_winter();
        let primary = derive_primary(&inputs);
        let mut excess = vec![0.0; inputs.nmonths];
        excess[3] = -1.0;
        assert!(derive_secondary(&inputs, &excess, &primary).is_err());
    }

    #[test]
    fn test_culled_reserve_released_over_duration() {
        let inputs = ScenarioInputs::nuclear_winter();
        let primary = derive_primary(&inputs);
        let excess = vec![0.0; inputs.nmonths];
        let sec = derive_secondary(&inputs, &excess, &primary).unwrap();
        let culled = derive_culled(&inputs, &sec);
        assert!(culled.cull_duration > 0);
        assert!(culled.limit_per_month > 0.0);
        assert!(culled.meat_eaten[0] > 0.0);
        assert_eq!(culled.meat_eaten[culled.cull_duration.min(inputs.nmonths - 1)], 0.0);
        // fractions describe the culled mix, not zero and not absurd
        assert!(culled.fraction_fat > 0.0 && culled.fraction_fat < 1.0);
        assert!(culled.fraction_protein > 0.0 && culled.fraction_protein < 1.0);
    }

    #[test]
    fn test_cull_duration_zero_releases_nothing() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.livestock.recalculate_cull_duration = false;
        inputs.livestock.cull_duration_months = 0;
        let primary = derive_primary(&inputs);
        let sec = derive_secondary(&inputs, &vec![0.0; inputs.nmonths], &primary).unwrap();
        let culled = derive_culled(&inputs, &sec);
        assert_eq!(culled.cull_duration, 0);
        assert!(culled.meat_eaten.iter().all(|m| *m == 0.0));
    }

    #[test]
    fn test_no_culling_outside_nuclear_winter() {
        let inputs = ScenarioInputs::baseline();
        let primary = derive_primary(&inputs);
        let sec = derive_secondary(&inputs, &vec![0.0; inputs.nmonths], &primary).unwrap();
        assert_eq!(sec.init_small_animals_culled, 0.0);
        let culled = derive_culled(&inputs, &sec);
        assert_eq!(culled.initial_meat_kcals, 0.0);
        assert!(culled.meat_eaten.iter().all(|m| *m == 0.0));
    }
}
