//! Stored food: a single pre-catastrophe reserve, interpreted as kcals with
//! fat and protein fractions matching outdoor crops (stored food is mostly
//! grain and so nutritionally close to the field crop mix).

use crate::constants::KCALS_PER_DRY_CALORIC_TON;
use crate::inputs::ScenarioInputs;
use crate::sources::outdoor_crops::OutdoorCrops;

#[derive(Debug, Clone)]
pub struct StoredFood {
    /// Initial reserve [billion kcals], before waste
    pub initial_kcals: f64,
    /// [thousand tons / billion kcals]
    pub fraction_fat: f64,
    pub fraction_protein: f64,
}

pub fn derive(inputs: &ScenarioInputs, crops: &OutdoorCrops) -> StoredFood {
    let initial_kcals = if inputs.enable.stored_food {
        inputs.stored_food_dry_caloric_tons * KCALS_PER_DRY_CALORIC_TON / 1e9
    } else {
        0.0
    };
    StoredFood {
        initial_kcals,
        fraction_fat: crops.fraction_fat,
        fraction_protein: crops.fraction_protein,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::outdoor_crops;

    #[test]
    fn test_reserve_in_billion_kcals() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.stored_food_dry_caloric_tons = 500e6;
        let crops = outdoor_crops::derive(&inputs).unwrap();
        let sf = derive(&inputs, &crops);
        // 500e6 tons * 4e6 kcals/ton / 1e9 = 2e6 billion kcals
        assert!((sf.initial_kcals - 2e6).abs() < 1e-6);
        assert_eq!(sf.fraction_fat, crops.fraction_fat);
    }

    #[test]
    fn test_disabled_reserve_is_zero() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.stored_food = false;
        let crops = outdoor_crops::derive(&inputs).unwrap();
        assert_eq!(derive(&inputs, &crops).initial_kcals, 0.0);
    }
}
