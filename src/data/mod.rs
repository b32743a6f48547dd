//! Training data: the SMILES corpus and the generator's character vocabulary.

pub mod corpus;
pub mod vocab;

pub use corpus::{read_smiles_csv, write_smiles_csv, SMILES_COLUMN};
pub use vocab::CharVocab;
