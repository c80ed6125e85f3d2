//! The immutable result bundle of one model run.

use serde::{Deserialize, Serialize};

use crate::inputs::ScenarioInputs;
use crate::optimizer::analysis::Analysis;
use crate::optimizer::lp::MonthlySolution;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// The max-min percent of the population fed across months and included
    /// nutrients
    pub objective: f64,
    /// Percent fed each month (kcals; fat and protein when included)
    pub humans_fed_kcals: Vec<f64>,
    pub humans_fed_fat: Vec<f64>,
    pub humans_fed_protein: Vec<f64>,
    /// Per-source percent-of-need contributions
    pub analysis: Analysis,
    /// Warnings raised during parameter derivation (e.g. the feed/biofuel
    /// over-demand path)
    pub warnings: Vec<String>,
    /// The scenario that produced this run
    pub scenario: ScenarioInputs,
}

impl RunOutput {
    pub fn new(
        scenario: ScenarioInputs,
        solution: MonthlySolution,
        analysis: Analysis,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            objective: analysis.objective,
            humans_fed_kcals: solution.humans_fed_kcals,
            humans_fed_fat: solution.humans_fed_fat,
            humans_fed_protein: solution.humans_fed_protein,
            analysis,
            warnings,
            scenario,
        }
    }

    pub fn nmonths(&self) -> usize {
        self.humans_fed_kcals.len()
    }

    /// The month where the percent fed bottoms out.
    pub fn worst_month(&self) -> usize {
        self.humans_fed_kcals
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Named per-source percent-fed series, in display order.
    pub fn source_series(&self) -> Vec<(&'static str, &[f64])> {
        vec![
            ("stored_food", &self.analysis.stored_food),
            ("outdoor_crops", &self.analysis.outdoor_crops),
            ("seaweed", &self.analysis.seaweed),
            ("cellulosic_sugar", &self.analysis.cellulosic_sugar),
            ("methane_scp", &self.analysis.methane_scp),
            ("greenhouses", &self.analysis.greenhouses),
            ("fish", &self.analysis.fish),
            ("milk", &self.analysis.milk),
            ("meat", &self.analysis.meat),
            ("feed_and_biofuel", &self.analysis.nonhuman),
        ]
    }
}
