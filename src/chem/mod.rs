//! Chemistry collaborators of the reward function.
//!
//! - [`traits`] -- the [`Chemistry`] and [`MetricSuite`] capability traits and
//!   pool-backed helpers ([`remove_invalid`], [`parse_all`]).
//! - [`heuristic`] -- [`HeuristicChemistry`], a syntactic SMILES backend that
//!   lets the full pipeline run without a cheminformatics toolkit.

pub mod heuristic;
pub mod traits;

pub use heuristic::{HeuristicChemistry, HeuristicMolecule};
pub use traits::{parse_all, remove_invalid, Chemistry, MetricSuite};
