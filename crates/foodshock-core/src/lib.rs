//! Global food supply allocation under a sustained production shock.
//!
//! The pipeline is a single synchronous pass: scenario inputs are expanded
//! into monthly production, demand, and capacity series per food source;
//! feed and biofuel demand is pre-allocated through a priority cascade; the
//! remaining allocation problem is solved as a month-indexed linear program
//! maximizing the worst month's fraction of human nutritional needs met.

pub mod constants;
pub mod conversions;
pub mod error;
pub mod feed_biofuels;
pub mod inputs;
pub mod lookup;
pub mod nutrients;
pub mod optimizer;
pub mod output;
pub mod params;
pub mod series;
pub mod sources;

pub use conversions::Conversions;
pub use error::ModelError;
pub use inputs::ScenarioInputs;
pub use nutrients::{NutrientUnits, Nutrients};
pub use output::RunOutput;
pub use params::{DerivedParams, MonthlyConstants, ScalarConstants};

/// Run the whole pipeline for one scenario: derive parameters, solve the
/// allocation LP, analyze, and bundle the results.
pub fn run(inputs: &ScenarioInputs) -> Result<RunOutput, ModelError> {
    let derived = params::derive(inputs)?;
    let solution = optimizer::optimize(&derived.scalars, &derived.monthly)?;
    let analysis = optimizer::analyze(
        &derived.scalars,
        &derived.monthly,
        &solution,
        &derived.conversions,
    )?;
    Ok(RunOutput::new(
        inputs.clone(),
        solution.monthly,
        analysis,
        derived.warnings,
    ))
}
