//! Outdoor crop production: seasonal baseline yields scaled by the
//! multi-year disruption trajectory, with an optional post-transition crop
//! rotation that trades calories for fat and protein.
//!
//! Crop waste is NOT applied here; the optimizer applies it to everything
//! drawn from the crop and stored-food pools.

use crate::constants::{KCALS_PER_DRY_CALORIC_TON, SEED_PERCENT};
use crate::error::ModelError;
use crate::inputs::ScenarioInputs;
use crate::lookup::LookupTable;
use crate::series::linspace;

/// Months covered by the disruption interpolation: eleven years.
pub const REDUCTION_MONTHS: usize = 132;

#[derive(Debug, Clone)]
pub struct OutdoorCrops {
    /// Annual production [dry caloric tons], seed use removed
    pub annual_yield: f64,
    /// [thousand tons fat / billion kcals]
    pub fraction_fat: f64,
    /// [thousand tons protein / billion kcals]
    pub fraction_protein: f64,

    /// Kcal multiplier of the improved rotation relative to the baseline mix
    pub rotation_fraction_kcals: f64,
    /// [thousand tons / billion kcals] under the improved rotation
    pub rotation_fraction_fat: f64,
    pub rotation_fraction_protein: f64,
    /// How much of the disruption the improved rotation recovers
    pub kcals_reduced: f64,

    /// Fraction of baseline yield remaining, month 0 = simulation January of
    /// the first calendar year; length [`REDUCTION_MONTHS`]
    pub all_months_reductions: Vec<f64>,
    /// The same trajectory as a lookup table; evaluation past the last
    /// tabulated month clamps to the final ratio
    pub reduction_table: LookupTable,
    /// Seasonal monthly yields [billion kcals], aligned so index 0 is the
    /// simulation's starting month
    pub months_cycle: Vec<f64>,

    /// Monthly production with / without the improved rotation
    /// [billion kcals], before greenhouse land is carved out
    pub kcals_grown: Vec<f64>,
    pub no_rot_kcals_grown: Vec<f64>,

    /// Monthly production routed to the optimizer [billion kcals]: rotation
    /// series after the transition month, non-rotated before, greenhouse
    /// area removed
    pub production: Vec<f64>,
}

pub fn derive(inputs: &ScenarioInputs) -> Result<OutdoorCrops, ModelError> {
    let annual_yield = 0.96 * inputs.baseline_crop_kcals_tons * (1.0 - SEED_PERCENT / 100.0);
    let annual_billion_kcals = annual_yield * KCALS_PER_DRY_CALORIC_TON / 1e9;

    // Fat and protein as fractions of caloric production, bias-corrected the
    // same way the baseline supply data is.
    let fraction_fat = 1.02 * inputs.baseline_crop_fat_thou_tons / annual_billion_kcals;
    let fraction_protein = 0.93 * inputs.baseline_crop_protein_thou_tons / annual_billion_kcals;

    let rot = &inputs.rotation;
    let (kcals_reduced, rotation_fraction_fat, rotation_fraction_protein) =
        if rot.use_better_rotation {
            (
                rot.kcals_reduction,
                fraction_fat * rot.fat_ratio,
                fraction_protein * rot.protein_ratio,
            )
        } else {
            (1.0, fraction_fat, fraction_protein)
        };

    let all_months_reductions = build_reductions(inputs)?;
    let reduction_table =
        LookupTable::from_monthly("crop disruption", all_months_reductions.clone());

    // Seasonal cycle, rotated so index 0 is the starting calendar month.
    let month_index = inputs.starting_month_num - 1;
    let months_cycle: Vec<f64> = (0..12)
        .map(|i| inputs.seasonality[(i + month_index) % 12] * annual_billion_kcals)
        .collect();

    let mut kcals_grown = Vec::with_capacity(inputs.nmonths);
    let mut no_rot_kcals_grown = Vec::with_capacity(inputs.nmonths);
    for i in 0..inputs.nmonths {
        let month_kcals = months_cycle[i % 12];
        let lost = 1.0 - reduction_table.eval_month(i + month_index);
        kcals_grown.push(month_kcals * (1.0 - kcals_reduced * lost));
        no_rot_kcals_grown.push(month_kcals * (1.0 - lost));
    }

    Ok(OutdoorCrops {
        annual_yield,
        fraction_fat,
        fraction_protein,
        rotation_fraction_kcals: 1.0,
        rotation_fraction_fat,
        rotation_fraction_protein,
        kcals_reduced,
        all_months_reductions,
        reduction_table,
        months_cycle,
        kcals_grown,
        no_rot_kcals_grown,
        production: vec![0.0; inputs.nmonths],
    })
}

/// Fraction of baseline yield remaining for each of the 132 months after the
/// event: ones until the catastrophe takes hold, then ten 12-point linear
/// segments between consecutive annual ratios, then a tail completing the
/// eleventh year.
fn build_reductions(inputs: &ScenarioInputs) -> Result<Vec<f64>, ModelError> {
    let ratios: Vec<f64> = inputs
        .disruption_crops_by_year
        .iter()
        .map(|d| 1.0 - d)
        .collect();

    let month_index = inputs.starting_month_num - 1;
    let mut out = vec![1.0; inputs.starting_month_num];

    let mut prev = 1.0;
    for ratio in &ratios[..10] {
        out.extend(&linspace(prev, *ratio, 13)[1..]);
        prev = *ratio;
    }
    out.extend(&linspace(ratios[9], ratios[10], 13)[1..12 - month_index]);

    if out.len() != REDUCTION_MONTHS {
        return Err(ModelError::Invariant(format!(
            "disruption interpolation produced {} months, expected {REDUCTION_MONTHS}",
            out.len()
        )));
    }
    if out.iter().any(|r| !(0.0..=1.0).contains(r)) {
        return Err(ModelError::Invariant(
            "disruption reductions fell outside [0, 1]".into(),
        ));
    }
    Ok(out)
}

impl OutdoorCrops {
    /// Route production to the optimizer: the non-rotated series until the
    /// first harvest plus the rotation changeover completes, the rotated
    /// series afterwards, scaled down by the land fraction greenhouses take.
    pub fn set_production_minus_greenhouse_area(
        &mut self,
        inputs: &ScenarioInputs,
        greenhouse_fraction_area: &[f64],
    ) {
        if !inputs.enable.outdoor_growing {
            self.production = vec![0.0; inputs.nmonths];
            return;
        }
        if inputs.rotation.use_better_rotation {
            let hd = inputs.rotation.initial_harvest_duration_months
                + inputs.delay.rotation_change;
            self.production = (0..inputs.nmonths)
                .map(|m| {
                    let grown = if m < hd {
                        self.no_rot_kcals_grown[m]
                    } else {
                        self.kcals_grown[m]
                    };
                    grown * (1.0 - greenhouse_fraction_area[m])
                })
                .collect();
        } else {
            self.production = self.no_rot_kcals_grown.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ScenarioInputs;

    #[test]
    fn test_reductions_length_and_range() {
        for start in 1..=12 {
            let mut inputs = ScenarioInputs::nuclear_winter();
            inputs.starting_month_num = start;
            let crops = derive(&inputs).unwrap();
            assert_eq!(crops.all_months_reductions.len(), REDUCTION_MONTHS);
            assert!(crops
                .all_months_reductions
                .iter()
                .all(|r| (0.0..=1.0).contains(r)));
        }
    }

    #[test]
    fn test_reductions_head_is_flat_then_declines() {
        let inputs = ScenarioInputs::nuclear_winter();
        let crops = derive(&inputs).unwrap();
        let r = &crops.all_months_reductions;
        // flat ones through the starting month
        for i in 0..inputs.starting_month_num {
            assert_eq!(r[i], 1.0);
        }
        // year-one endpoint is 1 - 0.53
        assert!((r[inputs.starting_month_num + 11] - 0.47).abs() < 1e-9);
        // worst year bottoms out at 1 - 0.89
        let min = r.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((min - 0.11).abs() < 1e-9);
    }

    #[test]
    fn test_no_disruption_means_flat_production() {
        let inputs = ScenarioInputs::baseline();
        let crops = derive(&inputs).unwrap();
        for (grown, cycle) in crops
            .no_rot_kcals_grown
            .iter()
            .zip(crops.months_cycle.iter().cycle())
        {
            assert!((grown - cycle).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seasonal_cycle_alignment() {
        let inputs = ScenarioInputs::nuclear_winter();
        let crops = derive(&inputs).unwrap();
        // starting month 5 (May): cycle index 0 carries the May fraction
        let annual = crops.annual_yield * KCALS_PER_DRY_CALORIC_TON / 1e9;
        assert!((crops.months_cycle[0] - inputs.seasonality[4] * annual).abs() < 1e-9);
        assert!((crops.months_cycle[11] - inputs.seasonality[3] * annual).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_ratios_scale_fractions() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.rotation.use_better_rotation = true;
        inputs.rotation.fat_ratio = 3.0;
        inputs.rotation.protein_ratio = 2.0;
        let crops = derive(&inputs).unwrap();
        assert!((crops.rotation_fraction_fat - 3.0 * crops.fraction_fat).abs() < 1e-12);
        assert!((crops.rotation_fraction_protein - 2.0 * crops.fraction_protein).abs() < 1e-12);
    }

    #[test]
    fn test_production_switches_to_rotation_after_changeover() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.rotation.use_better_rotation = true;
        let mut crops = derive(&inputs).unwrap();
        let gh_fraction = vec![0.0; inputs.nmonths];
        crops.set_production_minus_greenhouse_area(&inputs, &gh_fraction);
        let hd = inputs.rotation.initial_harvest_duration_months + inputs.delay.rotation_change;
        for m in 0..inputs.nmonths {
            let expected = if m < hd {
                crops.no_rot_kcals_grown[m]
            } else {
                crops.kcals_grown[m]
            };
            assert!((crops.production[m] - expected).abs() < 1e-9);
        }
    }
}
