//! Per-source derivation: each module turns scenario inputs into the monthly
//! capacities, productions, and nutrient ratios its source contributes.

pub mod fish;
pub mod greenhouses;
pub mod industrial;
pub mod meat_dairy;
pub mod outdoor_crops;
pub mod seaweed;
pub mod stored_food;
