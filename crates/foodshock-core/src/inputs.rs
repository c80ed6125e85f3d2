//! Scenario inputs: everything an analyst can vary between runs.
//!
//! The whole record is read once at the start of a run and never mutated.
//! `validate()` fails fast and names the offending field.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ModelError;

/// All adjustable inputs for one model run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInputs {
    /// Simulation length [months, >= 2]
    pub nmonths: usize,
    /// Calendar month the simulation starts in [1..=12]; aligns seasonality
    /// and the disruption interpolation (the reference catastrophe is mid-May)
    pub starting_month_num: usize,
    /// Global population [persons]
    pub population: f64,

    pub nutrition: NutritionTargets,
    pub enable: SourceToggles,

    /// Whether the crop/fish disruption trajectories apply
    pub is_nuclear_winter: bool,
    /// Fraction of baseline crop yield lost, years 1..=11 after the event
    pub disruption_crops_by_year: [f64; 11],
    /// Monthly fractions of annual crop yield, January..December, sum 1
    pub seasonality: [f64; 12],

    pub waste: WastePercents,
    pub delay: DelayMonths,
    pub seaweed: SeaweedFarm,
    pub rotation: CropRotation,
    pub industrial: IndustrialFoods,
    pub feed_biofuels: NonhumanDemand,
    pub livestock: LivestockInventory,
    pub greenhouses: GreenhouseBuildout,
    pub smoothing: Smoothing,

    /// Initial stored food reserve [dry caloric tons]
    pub stored_food_dry_caloric_tons: f64,
    /// Baseline annual crop production [dry caloric tons]
    pub baseline_crop_kcals_tons: f64,
    /// Baseline annual crop fat [thousand tons]
    pub baseline_crop_fat_thou_tons: f64,
    /// Baseline annual crop protein [thousand tons]
    pub baseline_crop_protein_thou_tons: f64,

    /// Cap on seaweed as percent of per-person caloric need
    pub max_seaweed_as_percent_kcals: f64,

    /// Run the post-solve constraint audit
    pub check_constraints: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionTargets {
    /// Per-capita target [kcals / person / day]
    pub kcals_daily: f64,
    /// Per-capita target [grams fat / person / day]
    pub fat_daily: f64,
    /// Per-capita target [grams protein / person / day]
    pub protein_daily: f64,
    /// Whether fat participates in the optimization objective
    pub include_fat: bool,
    /// Whether protein participates in the optimization objective
    pub include_protein: bool,
}

/// Which food sources exist in this scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceToggles {
    pub fish: bool,
    pub seaweed: bool,
    pub stored_food: bool,
    pub outdoor_growing: bool,
    pub greenhouses: bool,
    pub methane_scp: bool,
    pub cellulosic_sugar: bool,
    pub maintained_meat: bool,
    pub culled_meat: bool,
    pub milk: bool,
}

impl SourceToggles {
    pub fn all_off() -> Self {
        Self {
            fish: false,
            seaweed: false,
            stored_food: false,
            outdoor_growing: false,
            greenhouses: false,
            methane_scp: false,
            cellulosic_sugar: false,
            maintained_meat: false,
            culled_meat: false,
            milk: false,
        }
    }

    pub fn all_on() -> Self {
        Self {
            fish: true,
            seaweed: true,
            stored_food: true,
            outdoor_growing: true,
            greenhouses: true,
            methane_scp: true,
            cellulosic_sugar: true,
            maintained_meat: true,
            culled_meat: true,
            milk: true,
        }
    }
}

/// Losses between production and consumption [percent].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WastePercents {
    pub crops: f64,
    pub seafood: f64,
    pub meat: f64,
    pub dairy: f64,
    pub seaweed: f64,
    pub sugar: f64,
}

/// Onset delays [months].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayMonths {
    /// Before seaweed farm construction begins
    pub seaweed: usize,
    /// Before greenhouse construction begins (harvest lag added on top)
    pub greenhouse: usize,
    /// Before industrial food factory construction begins
    pub industrial_foods: usize,
    /// Between first-harvest end and the improved rotation taking effect
    pub rotation_change: usize,
    /// Months of continued feed usage before shutoff
    pub feed_shutoff: usize,
    /// Months of continued biofuel usage before shutoff
    pub biofuel_shutoff: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeaweedFarm {
    /// New farm area built per day [km^2 / day]
    pub new_area_per_day: f64,
    /// Daily biomass growth [percent / month in the stock recurrence]
    pub production_rate_percent: f64,
    /// Initial wet biomass on farm [thousand tons]
    pub initial_seaweed: f64,
    /// Initial farm area [km^2]
    pub initial_area: f64,
    /// Stocking density bounds [tons wet / km^2]
    pub minimum_density: f64,
    pub maximum_density: f64,
    /// Total farm area cap [km^2]
    pub maximum_area: f64,
    /// Biomass lost when harvesting newly expanded area [percent]
    pub harvest_loss_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropRotation {
    /// Switch to a resilient-food crop rotation after the first harvest
    pub use_better_rotation: bool,
    /// Multiplier on kcals under the improved rotation (< 1: fewer calories)
    pub kcals_reduction: f64,
    /// Multiplier on the fat fraction under the improved rotation
    pub fat_ratio: f64,
    /// Multiplier on the protein fraction under the improved rotation
    pub protein_ratio: f64,
    /// Months of the pre-catastrophe planting still being harvested
    pub initial_harvest_duration_months: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustrialFoods {
    /// Scales the canonical construction ramps
    pub slope_multiplier: f64,
    /// Caps, as fraction of each demand channel, on methane SCP
    pub max_fraction_human_food_as_scp: f64,
    pub max_fraction_feed_as_scp: f64,
    pub max_fraction_biofuel_as_scp: f64,
    /// Caps, as fraction of each demand channel, on cellulosic sugar
    pub max_fraction_human_food_as_cs: f64,
    pub max_fraction_feed_as_cs: f64,
    pub max_fraction_biofuel_as_cs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonhumanDemand {
    /// Animal feed drawn from human-edible sources [billion kcals / month]
    pub feed_monthly_kcals: f64,
    /// [thousand tons / month]
    pub feed_monthly_fat: f64,
    pub feed_monthly_protein: f64,
    /// Biofuel production [billion kcals / month]
    pub biofuel_monthly_kcals: f64,
    pub biofuel_monthly_fat: f64,
    pub biofuel_monthly_protein: f64,
    /// Extra calories deliberately routed to animals each month
    /// [billion kcals]; empty means none
    pub excess_calories: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivestockInventory {
    /// Initial herd counts [animals]
    pub init_small_animals: f64,
    pub init_medium_animals: f64,
    pub init_large_animals: f64,
    pub init_milk_cows: f64,

    /// Carcass masses [kg / animal]
    pub kg_per_small_animal: f64,
    pub kg_per_medium_animal: f64,
    pub kg_per_large_animal: f64,

    /// Meat nutrition [kcals / kg], [kg fat / kg], [kg protein / kg]
    pub small_animal_kcals_per_kg: f64,
    pub small_animal_fat_per_kg: f64,
    pub small_animal_protein_per_kg: f64,
    pub medium_animal_kcals_per_kg: f64,
    pub medium_animal_fat_per_kg: f64,
    pub medium_animal_protein_per_kg: f64,
    pub large_animal_kcals_per_kg: f64,
    pub large_animal_fat_per_kg: f64,
    pub large_animal_protein_per_kg: f64,

    /// Months over which the culled herd is consumed; recomputed from the
    /// culling curve when `recalculate_cull_duration` is set
    pub cull_duration_months: usize,
    pub recalculate_cull_duration: bool,
    /// Cap on monthly culled slaughter relative to baseline production
    pub max_ratio_culled_slaughter_to_baseline: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreenhouseBuildout {
    /// Yield gain of greenhouse crops over outdoor crops [percent]
    pub gain_percent: f64,
    /// Scales the greenhouse area cap
    pub area_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smoothing {
    /// Bound month-over-month change in people fed to 5%
    pub kcal_smoothing: bool,
    /// Bound month-over-month change in stored food consumption
    pub stored_food_smoothing: bool,
    /// Allowed ratio between consecutive months of stored food eaten
    pub fluctuation_limit: f64,
}

impl Default for ScenarioInputs {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioInputs {
    /// Business as usual: no catastrophe, every source available, feed and
    /// biofuel usage continuing at present-day rates for the whole run.
    pub fn baseline() -> Self {
        let nmonths = 12;
        Self {
            nmonths,
            starting_month_num: 5,
            population: 7.8e9,
            nutrition: NutritionTargets {
                kcals_daily: 2100.0,
                fat_daily: 47.0,
                protein_daily: 51.0,
                include_fat: false,
                include_protein: false,
            },
            enable: SourceToggles::all_on(),
            is_nuclear_winter: false,
            disruption_crops_by_year: [0.0; 11],
            seasonality: constants::SEASONALITY_BASELINE,
            waste: WastePercents {
                crops: 19.02,
                seafood: 15.0,
                meat: 15.0,
                dairy: 20.0,
                seaweed: 15.0,
                sugar: 14.3,
            },
            delay: DelayMonths {
                seaweed: 1,
                greenhouse: 2,
                industrial_foods: 3,
                rotation_change: 2,
                feed_shutoff: nmonths,
                biofuel_shutoff: nmonths,
            },
            seaweed: SeaweedFarm::default_farm(),
            rotation: CropRotation {
                use_better_rotation: false,
                kcals_reduction: 0.93,
                fat_ratio: 1.487,
                protein_ratio: 1.108,
                initial_harvest_duration_months: 8,
            },
            industrial: IndustrialFoods::default_caps(),
            feed_biofuels: NonhumanDemand::present_day(),
            livestock: LivestockInventory::present_day(),
            greenhouses: GreenhouseBuildout {
                gain_percent: 44.0,
                area_multiplier: 1.0,
            },
            smoothing: Smoothing {
                kcal_smoothing: false,
                stored_food_smoothing: false,
                fluctuation_limit: 1.5,
            },
            stored_food_dry_caloric_tons: 1360e6,
            baseline_crop_kcals_tons: 3898e6,
            baseline_crop_fat_thou_tons: 322e3,
            baseline_crop_protein_thou_tons: 350e3,
            max_seaweed_as_percent_kcals: 10.0,
            check_constraints: true,
        }
    }

    /// The 150 Tg nuclear winter scenario: crop and fish disruption on, all
    /// resilient foods deployed, feed and biofuel shut off within months.
    pub fn nuclear_winter() -> Self {
        let mut s = Self::baseline();
        s.nmonths = 84;
        s.is_nuclear_winter = true;
        s.disruption_crops_by_year = constants::DISRUPTION_NUCLEAR_WINTER;
        s.seasonality = constants::SEASONALITY_NUCLEAR_WINTER;
        s.rotation.use_better_rotation = true;
        s.delay = DelayMonths {
            seaweed: 1,
            greenhouse: 2,
            industrial_foods: 3,
            rotation_change: 2,
            feed_shutoff: 2,
            biofuel_shutoff: 1,
        };
        s.smoothing.kcal_smoothing = true;
        s.smoothing.stored_food_smoothing = true;
        s
    }

    /// Nuclear winter with no resilient-food response: no seaweed farms, no
    /// greenhouses, no industrial foods, no rotation change. Society lives
    /// off stored food, surviving crops, fish, and livestock.
    pub fn nuclear_winter_no_resilient_foods() -> Self {
        let mut s = Self::nuclear_winter();
        s.enable.seaweed = false;
        s.enable.greenhouses = false;
        s.enable.methane_scp = false;
        s.enable.cellulosic_sugar = false;
        s.rotation.use_better_rotation = false;
        s
    }

    pub fn crop_waste_fraction(&self) -> f64 {
        1.0 - self.waste.crops / 100.0
    }

    /// Fail fast on malformed inputs, reporting the field by name.
    pub fn validate(&self) -> Result<(), ModelError> {
        fn err(field: &'static str, reason: impl Into<String>) -> ModelError {
            ModelError::InvalidInput {
                field,
                reason: reason.into(),
            }
        }

        if self.nmonths < 2 {
            return Err(err("nmonths", format!("must be at least 2, got {}", self.nmonths)));
        }
        if !(1..=12).contains(&self.starting_month_num) {
            return Err(err(
                "starting_month_num",
                format!("must be in 1..=12, got {}", self.starting_month_num),
            ));
        }
        if !self.population.is_finite() || self.population <= 0.0 {
            return Err(err("population", format!("must be positive, got {}", self.population)));
        }
        for (name, v) in [
            ("nutrition.kcals_daily", self.nutrition.kcals_daily),
            ("nutrition.fat_daily", self.nutrition.fat_daily),
            ("nutrition.protein_daily", self.nutrition.protein_daily),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(err_static(name, v));
            }
        }

        let season_sum: f64 = self.seasonality.iter().sum();
        if (season_sum - 1.0).abs() > 1e-9 {
            return Err(err(
                "seasonality",
                format!("12 monthly fractions must sum to 1, got {season_sum}"),
            ));
        }
        if self.seasonality.iter().any(|f| *f < 0.0) {
            return Err(err("seasonality", "fractions must be non-negative"));
        }
        if self
            .disruption_crops_by_year
            .iter()
            .any(|d| !(0.0..=1.0).contains(d))
        {
            return Err(err("disruption_crops_by_year", "ratios must be within [0, 1]"));
        }

        for (name, v) in [
            ("waste.crops", self.waste.crops),
            ("waste.seafood", self.waste.seafood),
            ("waste.meat", self.waste.meat),
            ("waste.dairy", self.waste.dairy),
            ("waste.seaweed", self.waste.seaweed),
            ("waste.sugar", self.waste.sugar),
        ] {
            if !(0.0..=100.0).contains(&v) {
                return Err(err_static(name, v));
            }
        }

        if self.delay.feed_shutoff < self.delay.biofuel_shutoff {
            return Err(err(
                "delay.feed_shutoff",
                format!(
                    "feed shutoff delay ({}) must be >= biofuel shutoff delay ({})",
                    self.delay.feed_shutoff, self.delay.biofuel_shutoff
                ),
            ));
        }

        if !self.feed_biofuels.excess_calories.is_empty()
            && self.feed_biofuels.excess_calories.len() != self.nmonths
        {
            return Err(err(
                "feed_biofuels.excess_calories",
                format!(
                    "length {} does not match nmonths {}",
                    self.feed_biofuels.excess_calories.len(),
                    self.nmonths
                ),
            ));
        }

        if self.enable.outdoor_growing
            && self.nmonths <= self.rotation.initial_harvest_duration_months + 1
        {
            return Err(err(
                "rotation.initial_harvest_duration_months",
                format!(
                    "nmonths ({}) must exceed the initial harvest duration ({}) by at least 2",
                    self.nmonths, self.rotation.initial_harvest_duration_months
                ),
            ));
        }

        if self.smoothing.stored_food_smoothing && self.smoothing.fluctuation_limit <= 1.0 {
            return Err(err(
                "smoothing.fluctuation_limit",
                format!("must exceed 1, got {}", self.smoothing.fluctuation_limit),
            ));
        }

        Ok(())
    }
}

fn err_static(field: &'static str, value: f64) -> ModelError {
    ModelError::InvalidInput {
        field,
        reason: format!("out of range or not finite: {value}"),
    }
}

impl SeaweedFarm {
    pub fn default_farm() -> Self {
        Self {
            new_area_per_day: 4.153,
            production_rate_percent: 10.0,
            initial_seaweed: 1.0,
            initial_area: 1.0,
            minimum_density: 400.0,
            maximum_density: 800.0,
            maximum_area: 1000.0,
            harvest_loss_percent: 15.0,
        }
    }
}

impl IndustrialFoods {
    pub fn default_caps() -> Self {
        Self {
            slope_multiplier: 1.0,
            max_fraction_human_food_as_scp: 0.3,
            max_fraction_feed_as_scp: 0.3,
            max_fraction_biofuel_as_scp: 0.3,
            max_fraction_human_food_as_cs: 0.3,
            max_fraction_feed_as_cs: 0.3,
            max_fraction_biofuel_as_cs: 0.7,
        }
    }
}

impl NonhumanDemand {
    /// Present-day feed and biofuel usage, converted from annual dry caloric
    /// tonnage to billion kcals and thousand tons per month.
    pub fn present_day() -> Self {
        Self {
            feed_monthly_kcals: 1385e6 / 12.0 * 4e6 / 1e9,
            feed_monthly_fat: 60.0 / 12.0 * 1e3,
            feed_monthly_protein: 147.0 / 12.0 * 1e3,
            biofuel_monthly_kcals: 623e6 / 12.0 * 4e6 / 1e9,
            biofuel_monthly_fat: 124.0 / 12.0 * 1e3,
            biofuel_monthly_protein: 32.0 / 12.0 * 1e3,
            excess_calories: Vec::new(),
        }
    }

    pub fn none() -> Self {
        Self {
            feed_monthly_kcals: 0.0,
            feed_monthly_fat: 0.0,
            feed_monthly_protein: 0.0,
            biofuel_monthly_kcals: 0.0,
            biofuel_monthly_fat: 0.0,
            biofuel_monthly_protein: 0.0,
            excess_calories: Vec::new(),
        }
    }
}

impl LivestockInventory {
    pub fn present_day() -> Self {
        let init_milk_cows = 264e6;
        Self {
            init_small_animals: 28.2e9,
            init_medium_animals: 3.2e9,
            init_large_animals: 1.9e9 - init_milk_cows,
            init_milk_cows,
            kg_per_small_animal: 2.36,
            kg_per_medium_animal: 24.6,
            kg_per_large_animal: 269.7,
            small_animal_kcals_per_kg: 1525.0,
            small_animal_fat_per_kg: 0.076,
            small_animal_protein_per_kg: 0.196,
            medium_animal_kcals_per_kg: 3590.0,
            medium_animal_fat_per_kg: 0.34,
            medium_animal_protein_per_kg: 0.11,
            large_animal_kcals_per_kg: 2750.0,
            large_animal_fat_per_kg: 0.182,
            large_animal_protein_per_kg: 0.257,
            cull_duration_months: 60,
            recalculate_cull_duration: true,
            max_ratio_culled_slaughter_to_baseline: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        ScenarioInputs::baseline().validate().unwrap();
        ScenarioInputs::nuclear_winter().validate().unwrap();
    }

    #[test]
    fn test_bad_seasonality_is_rejected() {
        let mut s = ScenarioInputs::baseline();
        s.seasonality[0] += 0.5;
        let e = s.validate().unwrap_err();
        assert!(e.to_string().contains("seasonality"));
    }

    #[test]
    fn test_feed_shutoff_must_cover_biofuel_shutoff() {
        let mut s = ScenarioInputs::nuclear_winter();
        s.delay.feed_shutoff = 0;
        s.delay.biofuel_shutoff = 4;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_nmonths_too_small() {
        let mut s = ScenarioInputs::baseline();
        s.nmonths = 1;
        assert!(s.validate().is_err());
    }
}
