//! Parameter derivation: one pass from scenario inputs to the two records
//! the optimizer consumes (scalar constants and monthly series), plus the
//! conversions context and any warnings raised along the way.

use serde::{Deserialize, Serialize};

use crate::conversions::Conversions;
use crate::error::ModelError;
use crate::feed_biofuels;
use crate::inputs::ScenarioInputs;
use crate::nutrients::{NutrientUnits, Nutrients};
use crate::sources::{
    fish, greenhouses, industrial, meat_dairy, outdoor_crops, seaweed, stored_food,
};

/// Single-valued constants used by the optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarConstants {
    pub nmonths: usize,
    pub population: f64,

    pub add_fish: bool,
    pub add_seaweed: bool,
    pub add_stored_food: bool,
    pub add_outdoor_growing: bool,
    pub add_greenhouses: bool,
    pub add_methane_scp: bool,
    pub add_cellulosic_sugar: bool,
    pub add_maintained_meat: bool,
    pub add_culled_meat: bool,
    pub add_milk: bool,

    pub include_fat: bool,
    pub include_protein: bool,

    /// Whole-population monthly needs, the denominators of "percent fed"
    pub billion_kcals_needed: f64,
    pub thou_tons_fat_needed: f64,
    pub thou_tons_protein_needed: f64,
    /// Per-person monthly kcals, for the seaweed consumption cap
    pub kcals_monthly: f64,

    /// Seaweed farm constants
    pub initial_seaweed: f64,
    pub initial_area: f64,
    pub minimum_density: f64,
    pub maximum_density: f64,
    pub harvest_loss_percent: f64,
    pub seaweed_growth_percent_monthly: f64,
    pub seaweed_kcals: f64,
    pub seaweed_fat: f64,
    pub seaweed_protein: f64,
    pub max_seaweed_as_percent_kcals: f64,

    /// The stored-food pool the LP starts from [billion kcals]: the full
    /// reserve normally (feed draw is charged via nonhuman consumption),
    /// zero when the pre-allocator found the reserve insufficient
    pub initial_sf_kcals: f64,
    pub sf_fraction_fat: f64,
    pub sf_fraction_protein: f64,

    /// Outdoor crop nutrient fractions, baseline and improved rotation
    pub og_fraction_fat: f64,
    pub og_fraction_protein: f64,
    pub og_rotation_fraction_kcals: f64,
    pub og_rotation_fraction_fat: f64,
    pub og_rotation_fraction_protein: f64,

    /// Month the optimizer's crop pools switch from the first harvest
    pub initial_harvest_duration: usize,
    pub crop_waste_percent: f64,

    /// Culled meat nutrient fractions
    pub meat_fraction_fat: f64,
    pub meat_fraction_protein: f64,
    pub cull_duration: usize,

    pub kcal_smoothing: bool,
    pub stored_food_smoothing: bool,
    pub fluctuation_limit: f64,
    pub check_constraints: bool,
}

/// Monthly series used by the optimizer. Triples are nutrient series in
/// billion kcals / thousand tons.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyConstants {
    /// Seaweed farm area available [km^2]
    pub built_area: Vec<f64>,
    /// Outdoor crop production entering the crop pools [billion kcals]
    pub crops_food_produced: Vec<f64>,

    /// Greenhouse area [ha] and per-hectare yields
    pub greenhouse_area: Vec<f64>,
    pub greenhouse_per_ha: Nutrients,

    pub fish: Nutrients,
    /// Industrial foods remaining for humans after feed/biofuel routing
    pub cs_for_humans: Nutrients,
    pub scp_for_humans: Nutrients,

    /// Livestock products from human-inedible feed
    pub dairy_milk: Nutrients,
    pub cattle_maintained: Nutrients,
    /// Meat and milk created from human-edible feed
    pub h_e_created: Nutrients,
    /// Culled herd reserve released per month [billion kcals]
    pub meat_eaten: Vec<f64>,

    /// What the optimizer must deduct from stored food + outdoor crops
    pub nonhuman_consumption: Nutrients,
}

/// Everything the optimizer and analyzer need for one run.
#[derive(Debug, Clone)]
pub struct DerivedParams {
    pub scalars: ScalarConstants,
    pub monthly: MonthlyConstants,
    pub conversions: Conversions,
    pub warnings: Vec<String>,
}

pub fn derive(inputs: &ScenarioInputs) -> Result<DerivedParams, ModelError> {
    inputs.validate()?;

    let ctx = Conversions::new(
        inputs.nutrition.kcals_daily,
        inputs.nutrition.fat_daily,
        inputs.nutrition.protein_daily,
        inputs.population,
        inputs.nutrition.include_fat,
        inputs.nutrition.include_protein,
    );
    let mut warnings = Vec::new();

    // Source models, in dependency order.
    let sw = seaweed::derive(inputs);
    let fish = fish::derive(inputs);
    let scp = industrial::derive_scp(inputs);
    let cs = industrial::derive_cs(inputs);
    let mut crops = outdoor_crops::derive(inputs)?;
    let gh = greenhouses::derive(inputs, &crops);
    crops.set_production_minus_greenhouse_area(inputs, &gh.fraction_of_crop_area);
    let sf = stored_food::derive(inputs, &crops);

    // Feed and biofuel demand routed through the source cascade.
    let pre = feed_biofuels::allocate(inputs, &cs, &scp, &crops, &sf, &ctx)?;
    if pre.over_demand {
        warnings.push(
            "the scenario's feed and biofuel usage cannot be covered by outdoor crops, \
             cellulosic sugar, methane SCP, and the entire stored food reserve; stored \
             food for humans is set to zero and the resulting percent fed will be \
             unrealistically low"
                .to_string(),
        );
    }

    // Livestock: primary products from inedible feed, secondary from the
    // human-edible calories the cascade routed to animals.
    let primary = meat_dairy::derive_primary(inputs);
    let secondary = meat_dairy::derive_secondary(inputs, &pre.kcals_fed_to_animals, &primary)?;
    let culled = meat_dairy::derive_culled(inputs, &secondary);

    let scalars = ScalarConstants {
        nmonths: inputs.nmonths,
        population: inputs.population,
        add_fish: inputs.enable.fish,
        add_seaweed: inputs.enable.seaweed,
        add_stored_food: inputs.enable.stored_food,
        add_outdoor_growing: inputs.enable.outdoor_growing,
        add_greenhouses: inputs.enable.greenhouses,
        add_methane_scp: inputs.enable.methane_scp,
        add_cellulosic_sugar: inputs.enable.cellulosic_sugar,
        add_maintained_meat: inputs.enable.maintained_meat,
        add_culled_meat: inputs.enable.culled_meat,
        add_milk: inputs.enable.milk,
        include_fat: inputs.nutrition.include_fat,
        include_protein: inputs.nutrition.include_protein,
        billion_kcals_needed: ctx.billion_kcals_needed,
        thou_tons_fat_needed: ctx.thou_tons_fat_needed,
        thou_tons_protein_needed: ctx.thou_tons_protein_needed,
        kcals_monthly: ctx.kcals_monthly,
        initial_seaweed: inputs.seaweed.initial_seaweed,
        initial_area: inputs.seaweed.initial_area,
        minimum_density: inputs.seaweed.minimum_density,
        maximum_density: inputs.seaweed.maximum_density,
        harvest_loss_percent: inputs.seaweed.harvest_loss_percent,
        seaweed_growth_percent_monthly: inputs.seaweed.production_rate_percent,
        seaweed_kcals: sw.kcals_per_wet_kiloton,
        seaweed_fat: sw.fat_per_wet_kiloton,
        seaweed_protein: sw.protein_per_wet_kiloton,
        max_seaweed_as_percent_kcals: inputs.max_seaweed_as_percent_kcals,
        initial_sf_kcals: pre.sf_initial_for_lp,
        sf_fraction_fat: sf.fraction_fat,
        sf_fraction_protein: sf.fraction_protein,
        og_fraction_fat: crops.fraction_fat,
        og_fraction_protein: crops.fraction_protein,
        og_rotation_fraction_kcals: crops.rotation_fraction_kcals,
        og_rotation_fraction_fat: crops.rotation_fraction_fat,
        og_rotation_fraction_protein: crops.rotation_fraction_protein,
        initial_harvest_duration: inputs.rotation.initial_harvest_duration_months,
        crop_waste_percent: inputs.waste.crops,
        meat_fraction_fat: culled.fraction_fat,
        meat_fraction_protein: culled.fraction_protein,
        cull_duration: culled.cull_duration,
        kcal_smoothing: inputs.smoothing.kcal_smoothing,
        stored_food_smoothing: inputs.smoothing.stored_food_smoothing,
        fluctuation_limit: inputs.smoothing.fluctuation_limit,
        check_constraints: inputs.check_constraints,
    };

    let units = NutrientUnits::billion_kcals_thousand_tons_each_month();
    let monthly = MonthlyConstants {
        built_area: sw.built_area,
        crops_food_produced: crops.production.clone(),
        greenhouse_area: gh.area,
        greenhouse_per_ha: Nutrients::series(
            gh.kcals_per_ha,
            gh.fat_per_ha,
            gh.protein_per_ha,
            units.clone(),
        ),
        fish,
        cs_for_humans: Nutrients::series_from_kcals(pre.cs_for_humans.clone(), units.clone()),
        scp_for_humans: pre.scp_for_humans.clone(),
        dairy_milk: primary.dairy_milk.clone(),
        cattle_maintained: primary.cattle_maintained.clone(),
        h_e_created: secondary.h_e_created.clone(),
        meat_eaten: culled.meat_eaten.clone(),
        nonhuman_consumption: pre.nonhuman_consumption.clone(),
    };

    audit_not_nan(&scalars, &monthly)?;
    audit_series(&scalars, &monthly, &ctx)?;

    Ok(DerivedParams {
        scalars,
        monthly,
        conversions: ctx,
        warnings,
    })
}

/// Anything NaN here would make the LP fail in an opaque way; fail loudly
/// with the offending key instead.
fn audit_not_nan(scalars: &ScalarConstants, monthly: &MonthlyConstants) -> Result<(), ModelError> {
    let scalar_fields: [(&'static str, f64); 14] = [
        ("billion_kcals_needed", scalars.billion_kcals_needed),
        ("thou_tons_fat_needed", scalars.thou_tons_fat_needed),
        ("thou_tons_protein_needed", scalars.thou_tons_protein_needed),
        ("seaweed_kcals", scalars.seaweed_kcals),
        ("seaweed_fat", scalars.seaweed_fat),
        ("seaweed_protein", scalars.seaweed_protein),
        ("initial_sf_kcals", scalars.initial_sf_kcals),
        ("sf_fraction_fat", scalars.sf_fraction_fat),
        ("sf_fraction_protein", scalars.sf_fraction_protein),
        ("og_fraction_fat", scalars.og_fraction_fat),
        ("og_fraction_protein", scalars.og_fraction_protein),
        ("og_rotation_fraction_fat", scalars.og_rotation_fraction_fat),
        ("meat_fraction_fat", scalars.meat_fraction_fat),
        ("meat_fraction_protein", scalars.meat_fraction_protein),
    ];
    for (key, value) in scalar_fields {
        if !value.is_finite() {
            return Err(ModelError::NotFinite(key));
        }
    }

    let plain_series: [(&'static str, &[f64]); 4] = [
        ("built_area", &monthly.built_area),
        ("crops_food_produced", &monthly.crops_food_produced),
        ("greenhouse_area", &monthly.greenhouse_area),
        ("meat_eaten", &monthly.meat_eaten),
    ];
    for (key, series) in plain_series {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NotFinite(key));
        }
    }

    let triples: [(&'static str, &Nutrients); 8] = [
        ("greenhouse_per_ha", &monthly.greenhouse_per_ha),
        ("fish", &monthly.fish),
        ("cs_for_humans", &monthly.cs_for_humans),
        ("scp_for_humans", &monthly.scp_for_humans),
        ("dairy_milk", &monthly.dairy_milk),
        ("cattle_maintained", &monthly.cattle_maintained),
        ("h_e_created", &monthly.h_e_created),
        ("nonhuman_consumption", &monthly.nonhuman_consumption),
    ];
    for (key, triple) in triples {
        if triple.has_nan() {
            return Err(ModelError::NotFinite(key));
        }
    }
    Ok(())
}

/// Every monthly series must span the horizon and every production series
/// must be non-negative.
fn audit_series(
    scalars: &ScalarConstants,
    monthly: &MonthlyConstants,
    ctx: &Conversions,
) -> Result<(), ModelError> {
    let n = scalars.nmonths;
    let lengths = [
        ("built_area", monthly.built_area.len()),
        ("crops_food_produced", monthly.crops_food_produced.len()),
        ("greenhouse_area", monthly.greenhouse_area.len()),
        ("greenhouse_per_ha", monthly.greenhouse_per_ha.nmonths()),
        ("fish", monthly.fish.nmonths()),
        ("cs_for_humans", monthly.cs_for_humans.nmonths()),
        ("scp_for_humans", monthly.scp_for_humans.nmonths()),
        ("dairy_milk", monthly.dairy_milk.nmonths()),
        ("cattle_maintained", monthly.cattle_maintained.nmonths()),
        ("h_e_created", monthly.h_e_created.nmonths()),
        ("meat_eaten", monthly.meat_eaten.len()),
        ("nonhuman_consumption", monthly.nonhuman_consumption.nmonths()),
    ];
    for (key, len) in lengths {
        if len != n {
            return Err(ModelError::Invariant(format!(
                "series `{key}` has {len} months, expected {n}"
            )));
        }
    }

    for (key, triple) in [
        ("fish", &monthly.fish),
        ("cs_for_humans", &monthly.cs_for_humans),
        ("scp_for_humans", &monthly.scp_for_humans),
        ("dairy_milk", &monthly.dairy_milk),
        ("cattle_maintained", &monthly.cattle_maintained),
        ("h_e_created", &monthly.h_e_created),
        ("nonhuman_consumption", &monthly.nonhuman_consumption),
    ] {
        if !triple.all_greater_than_or_equal_to_zero(ctx) {
            return Err(ModelError::Invariant(format!(
                "production series `{key}` has negative entries"
            )));
        }
    }
    if monthly.crops_food_produced.iter().any(|v| *v < 0.0) {
        return Err(ModelError::Invariant(
            "production series `crops_food_produced` has negative entries".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_nuclear_winter() {
        let inputs = ScenarioInputs::nuclear_winter();
        let derived = derive(&inputs).unwrap();
        assert_eq!(derived.scalars.nmonths, inputs.nmonths);
        assert!(derived.scalars.initial_sf_kcals > 0.0);
        assert!(derived.warnings.is_empty());
        // crop production reflects the disruption by year three
        let produced = &derived.monthly.crops_food_produced;
        let year1: f64 = produced[..12].iter().sum();
        let year3: f64 = produced[24..36].iter().sum();
        assert!(year3 < year1 * 0.5);
    }

    #[test]
    fn test_derive_baseline_has_no_disruption() {
        let inputs = ScenarioInputs::baseline();
        let derived = derive(&inputs).unwrap();
        assert!(derived.warnings.is_empty());
        let produced: f64 = derived.monthly.crops_food_produced.iter().sum();
        // a full year of undisrupted production
        let annual = 0.96 * inputs.baseline_crop_kcals_tons * (1.0 - 92.0 / 3898.0) * 4e6 / 1e9;
        assert!((produced - annual).abs() / annual < 1e-9);
    }

    #[test]
    fn test_all_sources_off_yields_zero_series() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.enable = crate::inputs::SourceToggles::all_off();
        inputs.delay.feed_shutoff = 0;
        inputs.delay.biofuel_shutoff = 0;
        let derived = derive(&inputs).unwrap();
        let ctx = &derived.conversions;
        assert!(derived.monthly.fish.all_equals_zero(ctx));
        assert!(derived.monthly.dairy_milk.all_equals_zero(ctx));
        assert!(derived.monthly.h_e_created.all_equals_zero(ctx));
        assert_eq!(derived.scalars.initial_sf_kcals, 0.0);
        assert!(derived.monthly.crops_food_produced.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_over_demand_produces_warning() {
        let mut inputs = ScenarioInputs::nuclear_winter();
        inputs.stored_food_dry_caloric_tons = 1e6;
        inputs.delay.feed_shutoff = inputs.nmonths;
        inputs.delay.biofuel_shutoff = inputs.nmonths;
        let derived = derive(&inputs).unwrap();
        assert_eq!(derived.warnings.len(), 1);
        assert_eq!(derived.scalars.initial_sf_kcals, 0.0);
    }
}
