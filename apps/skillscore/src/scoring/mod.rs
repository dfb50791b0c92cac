// Skill scoring core: text cleansing, aggregation, competency table,
// probability normalization and reweighting.
// Everything here is synchronous and free of I/O.

pub mod aggregate;
pub mod competency;
pub mod models;
pub mod probability;
pub mod reweight;
pub mod text;
