//! Greenhouses: area buildout over existing cropland and per-hectare yield.
//!
//! Construction starts after the scenario delay; the first crop takes five
//! more months to reach harvest, then coverage expands linearly to the cap
//! over 37 months and stays there. Greenhouse yield per hectare follows the
//! outdoor disruption (cloud cover hits both) but with the protected-culture
//! gain on top, and crop waste applied here since greenhouse output bypasses
//! the optimizer's crop pools.

use crate::constants::{
    GREENHOUSE_HARVEST_DELAY_MONTHS, GREENHOUSE_LIMIT_AREA_HA, GREENHOUSE_RAMP_MONTHS,
    TOTAL_CROP_AREA_HA,
};
use crate::inputs::ScenarioInputs;
use crate::series::linspace;
use crate::sources::outdoor_crops::OutdoorCrops;

#[derive(Debug, Clone)]
pub struct Greenhouses {
    /// Covered area [hectares]
    pub area: Vec<f64>,
    /// Fraction of total cropland covered, used to reduce outdoor production
    pub fraction_of_crop_area: Vec<f64>,
    /// Yield [billion kcals / hectare], waste applied
    pub kcals_per_ha: Vec<f64>,
    /// [thousand tons / hectare]
    pub fat_per_ha: Vec<f64>,
    pub protein_per_ha: Vec<f64>,
}

pub fn derive(inputs: &ScenarioInputs, crops: &OutdoorCrops) -> Greenhouses {
    let nmonths = inputs.nmonths;
    if !inputs.enable.greenhouses {
        return Greenhouses {
            area: vec![0.0; nmonths],
            fraction_of_crop_area: vec![0.0; nmonths],
            kcals_per_ha: vec![0.0; nmonths],
            fat_per_ha: vec![0.0; nmonths],
            protein_per_ha: vec![0.0; nmonths],
        };
    }

    let cap = GREENHOUSE_LIMIT_AREA_HA * inputs.greenhouses.area_multiplier;
    let zero_months = inputs.delay.greenhouse + GREENHOUSE_HARVEST_DELAY_MONTHS;
    let mut area_long = vec![0.0; zero_months];
    area_long.extend(linspace(0.0, cap, GREENHOUSE_RAMP_MONTHS));
    area_long.resize(nmonths.max(area_long.len()), cap);
    area_long.truncate(nmonths);
    // a short run can end mid-ramp; pad never exceeds the cap by construction
    let area = area_long;

    let fraction_of_crop_area: Vec<f64> = area.iter().map(|a| a / TOTAL_CROP_AREA_HA).collect();

    // Baseline monthly kcals per hectare, disrupted the same way outdoor
    // rotation crops are.
    let monthly_kcals_per_ha =
        crops.months_cycle.iter().sum::<f64>() / 12.0 / TOTAL_CROP_AREA_HA;
    let month_index = inputs.starting_month_num - 1;

    let edible = inputs.crop_waste_fraction();
    let gain = 1.0 + inputs.greenhouses.gain_percent / 100.0;

    let mut kcals_per_ha = Vec::with_capacity(nmonths);
    let mut fat_per_ha = Vec::with_capacity(nmonths);
    let mut protein_per_ha = Vec::with_capacity(nmonths);
    for m in 0..nmonths {
        let lost = 1.0 - crops.reduction_table.eval_month(m + month_index);
        let grown = monthly_kcals_per_ha * (1.0 - crops.kcals_reduced * lost) * edible;
        let gh_kcals = grown * crops.rotation_fraction_kcals * gain;
        kcals_per_ha.push(gh_kcals);
        fat_per_ha.push(crops.rotation_fraction_fat * gh_kcals);
        protein_per_ha.push(crops.rotation_fraction_protein * gh_kcals);
    }

    Greenhouses {
        area,
        fraction_of_crop_area,
        kcals_per_ha,
        fat_per_ha,
        protein_per_ha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ScenarioInputs;

    #[test]
    fn test_area_ramp_shape() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.nmonths = 60;
        inputs.delay.greenhouse = 12;
        let crops = crate::sources::outdoor_crops::derive(&inputs).unwrap();
        let gh = derive(&inputs, &crops);
        assert_eq!(gh.area.len(), 60);
        // zero through the construction delay plus harvest lag
        for m in 0..17 {
            assert_eq!(gh.area[m], 0.0, "month {m}");
        }
        // linear ramp reaches the cap at month 17 + 36
        assert!(gh.area[17] < 1e-6);
        let cap = 250e6;
        assert!((gh.area[53] - cap).abs() < 1.0);
        for m in 54..60 {
            assert!((gh.area[m] - cap).abs() < 1.0);
        }
        // piecewise linear in between
        let slope = gh.area[20] - gh.area[19];
        assert!((gh.area[30] - gh.area[29] - slope).abs() < 1.0);
    }

    #[test]
    fn test_disabled_greenhouses_are_zero() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.greenhouses = false;
        let crops = crate::sources::outdoor_crops::derive(&inputs).unwrap();
        let gh = derive(&inputs, &crops);
        assert!(gh.area.iter().all(|a| *a == 0.0));
        assert!(gh.kcals_per_ha.iter().all(|k| *k == 0.0));
    }

    #[test]
    fn test_yield_carries_gain_and_waste() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.rotation.use_better_rotation = false;
        let crops = crate::sources::outdoor_crops::derive(&inputs).unwrap();
        let gh = derive(&inputs, &crops);
        // first month: no disruption yet, so yield is baseline * gain * waste
        let baseline = crops.months_cycle.iter().sum::<f64>() / 12.0 / TOTAL_CROP_AREA_HA;
        let expected = baseline * 1.44 * inputs.crop_waste_fraction();
        assert!((gh.kcals_per_ha[0] - expected).abs() < 1e-12);
        // fat tracks kcals through the crop fraction
        assert!((gh.fat_per_ha[0] - crops.fraction_fat * gh.kcals_per_ha[0]).abs() < 1e-12);
    }
}
