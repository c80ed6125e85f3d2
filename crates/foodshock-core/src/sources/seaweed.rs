//! Seaweed farming: area buildout schedule and nutrition per wet kiloton.
//!
//! Farm area is built at a constant daily rate after a construction delay,
//! capped at the maximum area, then sampled to month boundaries for the
//! optimizer's biomass stock dynamics.

use crate::constants::{
    SEAWEED_KCALS_PER_KG_DRY, SEAWEED_MASS_FRACTION_FAT_DRY, SEAWEED_MASS_FRACTION_PROTEIN_DRY,
    SEAWEED_WET_TO_DRY,
};
use crate::conversions::DAYS_IN_MONTH;
use crate::inputs::ScenarioInputs;
use crate::series::linspace;

#[derive(Debug, Clone)]
pub struct Seaweed {
    /// Farm area available at the start of each month [km^2]
    pub built_area: Vec<f64>,
    /// [billion kcals / thousand tons wet]
    pub kcals_per_wet_kiloton: f64,
    /// Fraction fat per wet mass, waste applied
    pub fat_per_wet_kiloton: f64,
    /// Fraction digestible protein per wet mass, waste applied
    pub protein_per_wet_kiloton: f64,
}

pub fn derive(inputs: &ScenarioInputs) -> Seaweed {
    let ndays = inputs.nmonths * DAYS_IN_MONTH as usize;
    let farm = &inputs.seaweed;

    // Daily built area: flat during the construction delay, then a linear
    // ramp, clamped at the maximum farm area.
    let mut daily = Vec::with_capacity(2 * ndays);
    if inputs.enable.seaweed {
        let delay_days = inputs.delay.seaweed * DAYS_IN_MONTH as usize;
        daily.extend(std::iter::repeat(farm.initial_area).take(delay_days));
    } else {
        // farm never expands
        daily.extend(std::iter::repeat(farm.initial_area).take(ndays));
    }
    daily.extend(linspace(
        farm.initial_area,
        (ndays as f64 - 1.0) * farm.new_area_per_day + farm.initial_area,
        ndays,
    ));
    for a in &mut daily {
        *a = a.min(farm.maximum_area);
    }
    daily.truncate(ndays);

    let built_area = (0..inputs.nmonths)
        .map(|m| daily[m * DAYS_IN_MONTH as usize])
        .collect();

    let edible = 1.0 - inputs.waste.seaweed / 100.0;

    Seaweed {
        built_area,
        // 1000 tons wet -> kg dry -> kcals -> billion kcals
        kcals_per_wet_kiloton: 1e6 * SEAWEED_KCALS_PER_KG_DRY / 1e9 * SEAWEED_WET_TO_DRY * edible,
        fat_per_wet_kiloton: SEAWEED_MASS_FRACTION_FAT_DRY * SEAWEED_WET_TO_DRY * edible,
        protein_per_wet_kiloton: SEAWEED_MASS_FRACTION_PROTEIN_DRY * SEAWEED_WET_TO_DRY * edible,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ScenarioInputs;

    #[test]
    fn test_built_area_ramps_and_caps() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.delay.seaweed = 1;
        let sw = derive(&inputs);
        assert_eq!(sw.built_area.len(), inputs.nmonths);
        // flat during the construction delay
        assert_eq!(sw.built_area[0], inputs.seaweed.initial_area);
        assert_eq!(sw.built_area[1], inputs.seaweed.initial_area);
        // non-decreasing, capped at the maximum
        for w in sw.built_area.windows(2) {
            assert!(w[1] >= w[0]);
        }
        assert!(sw
            .built_area
            .iter()
            .all(|a| *a <= inputs.seaweed.maximum_area));
        // with 4.153 km^2/day the 1000 km^2 cap is hit within the run
        assert_eq!(*sw.built_area.last().unwrap(), inputs.seaweed.maximum_area);
    }

    #[test]
    fn test_disabled_farm_never_expands() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.seaweed = false;
        let sw = derive(&inputs);
        assert!(sw
            .built_area
            .iter()
            .all(|a| *a == inputs.seaweed.initial_area));
    }

    #[test]
    fn test_nutrition_per_wet_kiloton() {
        let inputs = ScenarioInputs::nuclear_winter();
        let sw = derive(&inputs);
        // 2648.57 kcals/kg dry / 6 wet-to-dry * 15% waste ~= 0.375 billion
        // kcals per thousand tons wet
        assert!((sw.kcals_per_wet_kiloton - 0.3752).abs() < 1e-3);
        assert!(sw.fat_per_wet_kiloton > 0.0 && sw.fat_per_wet_kiloton < 0.01);
        assert!(sw.protein_per_wet_kiloton > 0.0 && sw.protein_per_wet_kiloton < 0.03);
    }
}
