//! Industrial foods: methane single-cell protein and cellulosic sugar.
//!
//! Both follow tabulated construction ramps expressed as percent of global
//! caloric need, delayed by the scenario's industrial-foods delay and scaled
//! by the slope multiplier. Sugar-chain waste applies to both for lack of a
//! better baseline.

use crate::constants::{
    cellulosic_sugar_ramp, methane_scp_ramp, INDUSTRIAL_FOODS_LOSS,
    INDUSTRIAL_FOODS_MONTHLY_KCALS, KG_PER_THOUSAND_TONS, SCP_FRAC_FAT, SCP_FRAC_PROTEIN,
    SCP_KCALS_PER_KG,
};
use crate::inputs::ScenarioInputs;
use crate::lookup::LookupTable;

#[derive(Debug, Clone)]
pub struct MethaneScp {
    /// Production [billion kcals / month], waste applied
    pub kcals: Vec<f64>,
    /// [thousand tons / month]
    pub fat: Vec<f64>,
    pub protein: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct CellulosicSugar {
    /// Production [billion kcals / month], waste applied. Sugar carries no
    /// fat or protein.
    pub kcals: Vec<f64>,
}

pub fn derive_scp(inputs: &ScenarioInputs) -> MethaneScp {
    let kcals = ramp_production(inputs, inputs.enable.methane_scp, &methane_scp_ramp());
    // kcal production -> kg of product -> thousand tons of each macronutrient
    let fat = kcals
        .iter()
        .map(|k| k * 1e9 / SCP_KCALS_PER_KG * SCP_FRAC_FAT / KG_PER_THOUSAND_TONS)
        .collect();
    let protein = kcals
        .iter()
        .map(|k| k * 1e9 / SCP_KCALS_PER_KG * SCP_FRAC_PROTEIN / KG_PER_THOUSAND_TONS)
        .collect();
    MethaneScp { kcals, fat, protein }
}

pub fn derive_cs(inputs: &ScenarioInputs) -> CellulosicSugar {
    CellulosicSugar {
        kcals: ramp_production(inputs, inputs.enable.cellulosic_sugar, &cellulosic_sugar_ramp()),
    }
}

fn ramp_production(inputs: &ScenarioInputs, enabled: bool, ramp: &LookupTable) -> Vec<f64> {
    if !enabled {
        return vec![0.0; inputs.nmonths];
    }
    let delay = inputs.delay.industrial_foods;
    let slope = inputs.industrial.slope_multiplier / (1.0 - INDUSTRIAL_FOODS_LOSS);
    let edible = 1.0 - inputs.waste.sugar / 100.0;
    (0..inputs.nmonths)
        .map(|m| {
            if m < delay {
                0.0
            } else {
                ramp.eval_month(m - delay) / 100.0 * slope * INDUSTRIAL_FOODS_MONTHLY_KCALS
                    * edible
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::ScenarioInputs;

    #[test]
    fn test_delay_shifts_the_ramp() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.delay.industrial_foods = 3;
        let cs = derive_cs(&inputs);
        // 3 months delay + 5 months construction before any sugar
        for m in 0..8 {
            assert_eq!(cs.kcals[m], 0.0, "month {m}");
        }
        assert!(cs.kcals[8] > 0.0);
        let scp = derive_scp(&inputs);
        for m in 0..15 {
            assert_eq!(scp.kcals[m], 0.0, "month {m}");
        }
        assert!(scp.kcals[15] > 0.0);
    }

    #[test]
    fn test_scp_macronutrients_track_kcals() {
        let inputs = ScenarioInputs::nuclear_winter();
        let scp = derive_scp(&inputs);
        let m = 30;
        assert!(scp.kcals[m] > 0.0);
        // one billion kcals of SCP is ~187 tons of product
        let tons = scp.kcals[m] * 1e9 / SCP_KCALS_PER_KG / 1e3;
        assert!((scp.protein[m] - tons * SCP_FRAC_PROTEIN / 1e3).abs() < 1e-9);
        assert!((scp.fat[m] - tons * SCP_FRAC_FAT / 1e3).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_sources_are_zero() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable.methane_scp = false;
        inputs.enable.cellulosic_sugar = false;
        assert!(derive_scp(&inputs).kcals.iter().all(|k| *k == 0.0));
        assert!(derive_cs(&inputs).kcals.iter().all(|k| *k == 0.0));
    }

    #[test]
    fn test_waste_and_slope_scale_production() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.waste.sugar = 0.0;
        inputs.industrial.slope_multiplier = 1.0;
        let full = derive_cs(&inputs);
        inputs.waste.sugar = 50.0;
        inputs.industrial.slope_multiplier = 2.0;
        let scaled = derive_cs(&inputs);
        let m = 20;
        assert!((scaled.kcals[m] - full.kcals[m]).abs() < 1e-9);
    }
}
