//! Physical constants shared across the source models.
//!
//! Scenario-dependent quantities live in [`crate::inputs::ScenarioInputs`];
//! everything here is a property of the foods themselves or of the canonical
//! unit system (billion kcals for energy, thousand tons for mass).

use crate::lookup::LookupTable;

/// Energy per dry caloric ton of crop-equivalent food [kcals / ton].
pub const KCALS_PER_DRY_CALORIC_TON: f64 = 4e6;

/// kg per thousand tons.
pub const KG_PER_THOUSAND_TONS: f64 = 1e6;

// ---------------------------------------------------------------------------
// Seaweed
// ---------------------------------------------------------------------------

/// Wet-to-dry mass conversion for farmed seaweed.
pub const SEAWEED_WET_TO_DRY: f64 = 1.0 / 6.0;

/// Average over seven farmed varieties (emi-tsunomata, irish moss, kelp,
/// laver, wakame, fucus vesiculosus, fucus spiralis), dry basis.
pub const SEAWEED_KCALS_PER_KG_DRY: f64 =
    (2590.0 + 2940.0 + 2580.0 + 2100.0 + 2700.0 + 2520.0 + 3100.0) / 7.0;

/// Dry mass fraction fat, same varieties.
pub const SEAWEED_MASS_FRACTION_FAT_DRY: f64 =
    (0.014 + 0.010 + 0.034 + 0.017 + 0.038 + 0.031 + 0.020) / 7.0;

/// Dry mass fraction digestible protein (digestibility times crude protein).
pub const SEAWEED_MASS_FRACTION_PROTEIN_DRY: f64 = (0.770 * 0.153
    + 0.770 * 0.091
    + 0.768 * 0.101
    + 0.862 * 0.349
    + 0.700 * 0.182
    + 0.147 * 0.060
    + 0.147 * 0.100)
    / 7.0;

// ---------------------------------------------------------------------------
// Fish
// ---------------------------------------------------------------------------

/// Global wild catch plus aquaculture, 2018 [tons wet].
pub const FISH_TONS_WET_2018: f64 = 168_936.71e3;
pub const FISH_KCALS_PER_TON: f64 = 1310.0 * 1e3;
pub const FISH_PROTEIN_PER_KG: f64 = 0.0204;
pub const FISH_FAT_PER_KG: f64 = 0.0048;

/// Percent of baseline fish production by month under a nuclear winter: a
/// decade-long decline to about two thirds of baseline with a slow
/// recovery, in seven year-long linear segments (each year repeats the
/// previous year's endpoint before moving on). Holds at the final value
/// past the tabulated months.
pub fn fish_decline_table() -> LookupTable {
    LookupTable::new(
        "fish percent of baseline",
        vec![
            0.0, 11.0, 12.0, 23.0, 24.0, 35.0, 36.0, 47.0, 48.0, 59.0, 60.0, 71.0, 72.0, 83.0,
        ],
        vec![
            100.0, 90.0, 90.0, 68.0, 68.0, 65.0, 65.0, 66.0, 66.0, 67.0, 67.0, 69.0, 69.0, 70.0,
        ],
    )
}

// ---------------------------------------------------------------------------
// Livestock
// ---------------------------------------------------------------------------

/// Feed conversion: dry caloric tons of human-inedible feed per ton of milk.
pub const INEDIBLE_TO_DAIRY_CONVERSION: f64 = 1.44;
/// Dry caloric tons of human-inedible feed per ton of cattle meat.
pub const INEDIBLE_TO_CATTLE_CONVERSION: f64 = 92.6;
/// Dry caloric tons of human-edible feed per ton of milk.
pub const EDIBLE_TO_DAIRY_CONVERSION: f64 = 0.7;
/// Dry caloric tons of human-edible feed per ton of chicken or pork.
pub const EDIBLE_TO_CHICKEN_PORK_CONVERSION: f64 = 4.8;
/// Dry caloric tons of human-edible feed per ton of cattle meat.
pub const EDIBLE_TO_CATTLE_CONVERSION: f64 = 9.8;

/// Present-day global milk production cap [tons / month].
pub const DAIRY_LIMIT_TONS_MONTHLY: f64 = 879e6 / 12.0;
/// Present-day global chicken + pork production cap [tons meat / month].
pub const CHICKEN_PORK_LIMIT_TONS_MONTHLY: f64 = 250e6 / 12.0;
/// Present-day global cattle meat production [tons / month], baseline for
/// the culled-herd ratio.
pub const CATTLE_BASELINE_TONS_MONTHLY: f64 = 74.2e6 / 12.0;

/// Whole milk nutrition per kg.
pub const MILK_KCALS_PER_KG: f64 = 610.0;
pub const MILK_FAT_PER_KG: f64 = 0.032;
pub const MILK_PROTEIN_PER_KG: f64 = 0.033;

/// Human-inedible feed available each month [dry caloric tons], nuclear
/// winter trajectory: crop residues and grazing collapse in year one and
/// slowly recover. Entries are annual blocks; the first year is cut short by
/// the mid-year catastrophe.
pub fn human_inedible_feed_nuclear_winter(nmonths: usize) -> Vec<f64> {
    const BLOCKS: [(usize, f64); 8] = [
        (8, 2728.0),
        (12, 972.0),
        (12, 594.0),
        (12, 531.0),
        (12, 552.0),
        (12, 789.0),
        (12, 1026.0),
        (12, 1394.0),
    ];
    let mut out = Vec::with_capacity(nmonths);
    for (count, value) in BLOCKS {
        for _ in 0..count {
            out.push(value * 1e6 / 12.0);
        }
    }
    let last = *out.last().unwrap();
    out.resize(nmonths.max(out.len()), last);
    out.truncate(nmonths);
    out
}

/// Human-inedible feed under business as usual [dry caloric tons / month].
pub fn human_inedible_feed_baseline(nmonths: usize) -> Vec<f64> {
    vec![4206.0 * 1e6 / 12.0; nmonths]
}

// ---------------------------------------------------------------------------
// Industrial foods
// ---------------------------------------------------------------------------

/// Billion kcals per month corresponding to 100% of global caloric need in
/// the industrial-foods scale-up studies.
pub const INDUSTRIAL_FOODS_MONTHLY_KCALS: f64 = 6_793_977.0 / 12.0;

/// Losses assumed inside the industrial percent-of-need schedules; the
/// schedules are divided by (1 - this) before use.
pub const INDUSTRIAL_FOODS_LOSS: f64 = 0.12;

pub const SCP_KCALS_PER_KG: f64 = 5350.0;
pub const SCP_FRAC_PROTEIN: f64 = 0.650;
pub const SCP_FRAC_FAT: f64 = 0.09;

/// Methane single-cell protein ramp: percent of caloric need by month from
/// construction start. A year of construction, stepwise factory openings
/// through years two and three, then saturation at 15%. Steps carry a
/// breakpoint on each side so whole-month evaluation stays exact.
pub fn methane_scp_ramp() -> LookupTable {
    LookupTable::new(
        "methane SCP percent of need",
        vec![
            0.0, 11.0, 12.0, 16.0, 17.0, 18.0, 22.0, 23.0, 24.0, 29.0, 30.0, 31.0,
        ],
        vec![0.0, 0.0, 2.0, 2.0, 4.0, 7.0, 7.0, 9.0, 11.0, 11.0, 13.0, 15.0],
    )
}

/// Cellulosic sugar ramp: percent of caloric need by month from construction
/// start. Five months of construction, a first tranche of plants at 9.79%,
/// then 20% once the full fleet operates.
pub fn cellulosic_sugar_ramp() -> LookupTable {
    LookupTable::new(
        "cellulosic sugar percent of need",
        vec![0.0, 4.0, 5.0, 7.0, 8.0],
        vec![0.0, 0.0, 9.79, 9.79, 20.0],
    )
}

// ---------------------------------------------------------------------------
// Crops
// ---------------------------------------------------------------------------

/// Global outdoor crop area [hectares].
pub const TOTAL_CROP_AREA_HA: f64 = 500e6;

/// Fraction of outdoor growing redirected to non-eaten seed.
pub const SEED_PERCENT: f64 = 100.0 * (92.0 / 3898.0);

/// Greenhouse area cap before the scenario multiplier [hectares].
pub const GREENHOUSE_LIMIT_AREA_HA: f64 = 250e6;
/// Months from first greenhouse planting to first harvest.
pub const GREENHOUSE_HARVEST_DELAY_MONTHS: usize = 5;
/// Months of linear greenhouse area expansion up to the cap.
pub const GREENHOUSE_RAMP_MONTHS: usize = 37;

/// Tropical crop seasonality (average 2000-2018), used under nuclear winter
/// when production shifts to the tropics. Fractions of annual yield, January
/// through December, summing to 1.
pub const SEASONALITY_NUCLEAR_WINTER: [f64; 12] = [
    0.1564, 0.0461, 0.0650, 0.1017, 0.0772, 0.0785, 0.0667, 0.0256, 0.0163, 0.1254, 0.1183,
    0.1228,
];

/// Present-day global crop seasonality (average 2000-2018), December
/// rounded down so the twelve fractions sum to exactly one.
pub const SEASONALITY_BASELINE: [f64; 12] = [
    0.1121, 0.0178, 0.0241, 0.0344, 0.0338, 0.0411, 0.0882, 0.0791, 0.1042, 0.1911, 0.1377,
    0.1364,
];

/// Crop disruption under the 150 Tg nuclear winter scenario: fraction of
/// baseline yield lost, years 1 through 11 after the event.
pub const DISRUPTION_NUCLEAR_WINTER: [f64; 11] = [
    0.53, 0.82, 0.89, 0.88, 0.84, 0.76, 0.65, 0.50, 0.33, 0.17, 0.08,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seasonality_sums_to_one() {
        let nw: f64 = SEASONALITY_NUCLEAR_WINTER.iter().sum();
        let bau: f64 = SEASONALITY_BASELINE.iter().sum();
        assert!((nw - 1.0).abs() < 1e-9, "nuclear winter seasonality sums to {nw}");
        assert!((bau - 1.0).abs() < 1e-9, "baseline seasonality sums to {bau}");
    }

    #[test]
    fn test_fish_table_shape() {
        let table = fish_decline_table();
        let pct: Vec<f64> = (0..120).map(|m| table.eval_month(m)).collect();
        assert!((pct[0] - 100.0).abs() < 1e-9);
        // year-over-year boundaries repeat the endpoint before moving on
        assert!((pct[11] - 90.0).abs() < 1e-9);
        assert!((pct[12] - 90.0).abs() < 1e-9);
        // trough in year three, flat tail at 70
        assert!((pct[24] - 68.0).abs() < 1e-9);
        assert!((pct[35] - 65.0).abs() < 1e-9);
        assert!((pct[119] - 70.0).abs() < 1e-9);
        assert!(pct.iter().all(|p| (60.0..=100.0).contains(p)));
    }

    #[test]
    fn test_industrial_ramps() {
        let scp = methane_scp_ramp();
        assert_eq!(scp.eval_month(0), 0.0);
        assert_eq!(scp.eval_month(11), 0.0);
        assert_eq!(scp.eval_month(12), 2.0);
        assert_eq!(scp.eval_month(17), 4.0);
        assert_eq!(scp.eval_month(23), 9.0);
        assert_eq!(scp.eval_month(30), 13.0);
        assert_eq!(scp.eval_month(31), 15.0);
        assert_eq!(scp.eval_month(300), 15.0);
        let cs = cellulosic_sugar_ramp();
        assert_eq!(cs.eval_month(4), 0.0);
        assert_eq!(cs.eval_month(5), 9.79);
        assert_eq!(cs.eval_month(8), 20.0);
    }

    #[test]
    fn test_inedible_feed_schedule() {
        let feed = human_inedible_feed_nuclear_winter(92);
        assert_eq!(feed.len(), 92);
        assert!((feed[0] - 2728.0 * 1e6 / 12.0).abs() < 1.0);
        assert!((feed[8] - 972.0 * 1e6 / 12.0).abs() < 1.0);
        // extends flat past the tabulated 92 months
        let longer = human_inedible_feed_nuclear_winter(120);
        assert!((longer[119] - 1394.0 * 1e6 / 12.0).abs() < 1.0);
    }
}
