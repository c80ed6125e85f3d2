//! Wild catch and aquaculture. Baseline tonnage is spread evenly over the
//! year; under a nuclear winter, production follows the tabulated decline
//! schedule tied to ocean productivity loss.

use crate::constants::{
    fish_decline_table, FISH_FAT_PER_KG, FISH_KCALS_PER_TON, FISH_PROTEIN_PER_KG,
    FISH_TONS_WET_2018,
};
use crate::inputs::ScenarioInputs;
use crate::nutrients::{NutrientUnits, Nutrients};

/// Monthly fish production as a nutrient series
/// [billion kcals / thousand tons].
pub fn derive(inputs: &ScenarioInputs) -> Nutrients {
    let units = NutrientUnits::billion_kcals_thousand_tons_each_month();
    if !inputs.enable.fish {
        return Nutrients::zero_series(inputs.nmonths, units);
    }

    let edible_tons_annual = FISH_TONS_WET_2018 * (1.0 - inputs.waste.seafood / 100.0);
    let kcals_monthly = edible_tons_annual / 12.0 * FISH_KCALS_PER_TON / 1e9;
    let kg_monthly = edible_tons_annual / 12.0 * 1e3;
    // kg of catch times nutrient density, as thousand tons
    let fat_monthly = kg_monthly * FISH_FAT_PER_KG / 1e6;
    let protein_monthly = kg_monthly * FISH_PROTEIN_PER_KG / 1e6;

    let scale: Vec<f64> = if inputs.is_nuclear_winter {
        let decline = fish_decline_table();
        (0..inputs.nmonths)
            .map(|m| decline.eval_month(m) / 100.0)
            .collect()
    } else {
        vec![1.0; inputs.nmonths]
    };

    Nutrients::series(
        scale.iter().map(|s| s * kcals_monthly).collect(),
        scale.iter().map(|s| s * fat_monthly).collect(),
        scale.iter().map(|s| s * protein_monthly).collect(),
        units,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::Conversions;

    #[test]
    fn test_baseline_is_flat() {
        let mut inputs = ScenarioInputs::baseline();
        inputs.is_nuclear_winter = false;
        let fish = derive(&inputs);
        let k = fish.kcals_series();
        assert!(k.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-12));
        // 168.9M tons * 85% edible / 12 * 1.31M kcals/ton ~= 15.7k billion
        assert!((k[0] - 15_674.0).abs() < 10.0);
    }

    #[test]
    fn test_nuclear_winter_declines() {
        let inputs = ScenarioInputs::nuclear_winter();
        let fish = derive(&inputs);
        let k = fish.kcals_series();
        assert!(k[24] < k[0] * 0.70);
        assert!(k[24] > k[0] * 0.60);
    }

    #[test]
    fn test_disabled_fish_is_zero() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.fish = false;
        let ctx = Conversions::new(2100.0, 47.0, 51.0, 7.8e9, true, true);
        assert!(derive(&inputs).all_equals_zero(&ctx));
    }
}
