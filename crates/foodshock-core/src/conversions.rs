//! Per-capita nutritional requirements in the model's canonical units.
//!
//! Built once during parameter derivation and passed by reference into every
//! nutrient-triple operation that has to decide whether fat or protein
//! participate. Immutable after construction.

use serde::{Deserialize, Serialize};

/// Days per simulated month. The model uses a flat 30-day month throughout.
pub const DAYS_IN_MONTH: f64 = 30.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversions {
    /// Total population [persons]
    pub population: f64,

    /// Per-capita daily needs [kcals, grams, grams]
    pub kcals_daily: f64,
    pub fat_daily: f64,
    pub protein_daily: f64,

    /// Per-capita monthly needs: kcals [kcals], fat and protein
    /// [thousand tons]
    pub kcals_monthly: f64,
    pub fat_monthly: f64,
    pub protein_monthly: f64,

    /// Whole-population monthly needs: [billion kcals] and [thousand tons]
    pub billion_kcals_needed: f64,
    pub thou_tons_fat_needed: f64,
    pub thou_tons_protein_needed: f64,

    /// Whether fat / protein participate in predicates, min/max selection,
    /// and the LP objective.
    pub include_fat: bool,
    pub include_protein: bool,
}

impl Conversions {
    pub fn new(
        kcals_daily: f64,
        fat_daily: f64,
        protein_daily: f64,
        population: f64,
        include_fat: bool,
        include_protein: bool,
    ) -> Self {
        let kcals_monthly = kcals_daily * DAYS_IN_MONTH;
        // grams/day -> thousand tons/month (1 thousand tons = 1e9 grams)
        let fat_monthly = fat_daily * DAYS_IN_MONTH / 1e9;
        let protein_monthly = protein_daily * DAYS_IN_MONTH / 1e9;

        Self {
            population,
            kcals_daily,
            fat_daily,
            protein_daily,
            kcals_monthly,
            fat_monthly,
            protein_monthly,
            billion_kcals_needed: kcals_monthly * population / 1e9,
            thou_tons_fat_needed: fat_monthly * population,
            thou_tons_protein_needed: protein_monthly * population,
            include_fat,
            include_protein,
        }
    }

    pub fn exclude_fat(&self) -> bool {
        !self.include_fat
    }

    pub fn exclude_protein(&self) -> bool {
        !self.include_protein
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_population_needs() {
        let c = Conversions::new(2100.0, 47.0, 51.0, 7.8e9, true, true);
        // 2100 kcal/day * 30 days * 7.8e9 people / 1e9 = 491,400 billion kcals
        assert!((c.billion_kcals_needed - 491_400.0).abs() < 1e-6);
        // 51 g/day * 30 / 1e9 * 7.8e9 = 11,934 thousand tons
        assert!((c.thou_tons_protein_needed - 11_934.0).abs() < 1e-6);
    }
}
