//! Dependency-free SMILES heuristics.
//!
//! [`HeuristicChemistry`] approximates the cheminformatics toolkit with
//! purely syntactic rules so the reward pipeline can run end to end without
//! one:
//!
//! - **Validity**: the string tokenizes under the SMILES grammar, branches and
//!   bracket atoms are balanced, and every ring-closure label is closed.
//! - **Canonicalization**: trimmed input; no canonical atom ordering.
//! - **Fingerprint**: hashed 1..=3 token windows folded into 2048 bits,
//!   compared with Tanimoto similarity.
//! - **Scaffold**: the main chain with every branch removed.
//! - **Fragments**: atom token counts.
//! - **Filters**: heavy atom bound, no charges, no salts, no peroxides.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use anyhow::{bail, Result};

use super::traits::{Chemistry, MetricSuite};
use crate::pool::WorkerPool;

const FP_BITS: usize = 2048;
const FP_WORDS: usize = FP_BITS / 64;
const MAX_WINDOW: usize = 3;
const MAX_HEAVY_ATOMS: usize = 50;

const ORGANIC_SUBSET: &[char] = &['B', 'C', 'N', 'O', 'P', 'S', 'F', 'I'];
const AROMATIC_SUBSET: &[char] = &['b', 'c', 'n', 'o', 'p', 's'];
const BOND_CHARS: &[char] = &['-', '=', '#', ':', '/', '\\', '$'];

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Atom(String),
    Bond(char),
    Ring(String),
    Open,
    Close,
    Dot,
}

fn tokenize(smiles: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = smiles.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => {
                let Some(len) = chars[i + 1..].iter().position(|&ch| ch == ']') else {
                    bail!("Unclosed bracket atom at offset {i}");
                };
                let body: String = chars[i + 1..i + 1 + len].iter().collect();
                if body.is_empty() || body.contains('[') {
                    bail!("Malformed bracket atom at offset {i}");
                }
                tokens.push(Token::Atom(format!("[{body}]")));
                i += len + 2;
            }
            'C' if chars.get(i + 1) == Some(&'l') => {
                tokens.push(Token::Atom("Cl".into()));
                i += 2;
            }
            'B' if chars.get(i + 1) == Some(&'r') => {
                tokens.push(Token::Atom("Br".into()));
                i += 2;
            }
            c if ORGANIC_SUBSET.contains(&c) || AROMATIC_SUBSET.contains(&c) => {
                tokens.push(Token::Atom(c.to_string()));
                i += 1;
            }
            c if c.is_ascii_digit() => {
                tokens.push(Token::Ring(c.to_string()));
                i += 1;
            }
            '%' => {
                let label: String = chars[i + 1..].iter().take(2).collect();
                if label.len() != 2 || !label.chars().all(|ch| ch.is_ascii_digit()) {
                    bail!("Malformed ring label at offset {i}");
                }
                tokens.push(Token::Ring(label));
                i += 3;
            }
            c if BOND_CHARS.contains(&c) => {
                tokens.push(Token::Bond(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            other => bail!("Unexpected character {other:?} at offset {i}"),
        }
    }

    Ok(tokens)
}

fn check_grammar(tokens: &[Token]) -> Result<()> {
    let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
        bail!("Empty sequence");
    };
    if !matches!(first, Token::Atom(_)) {
        bail!("Sequence must start with an atom");
    }
    if matches!(last, Token::Bond(_) | Token::Open | Token::Dot) {
        bail!("Sequence ends with a dangling bond or branch");
    }

    let mut depth = 0usize;
    let mut open_rings: HashMap<&str, usize> = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => {
                if matches!(tokens.get(i + 1), Some(Token::Close)) {
                    bail!("Empty branch");
                }
                depth += 1;
            }
            Token::Close => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| anyhow::anyhow!("Unbalanced closing branch"))?;
            }
            Token::Ring(label) => {
                *open_rings.entry(label.as_str()).or_default() += 1;
            }
            Token::Bond(_) | Token::Dot => {
                if !matches!(tokens.get(i + 1), Some(Token::Atom(_) | Token::Ring(_))) {
                    bail!("Bond without a following atom");
                }
            }
            Token::Atom(_) => {}
        }
    }

    if depth != 0 {
        bail!("Unbalanced opening branch");
    }
    if open_rings.values().any(|count| count % 2 != 0) {
        bail!("Unclosed ring");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Molecule
// ---------------------------------------------------------------------------

/// Parsed form produced by [`HeuristicChemistry`].
#[derive(Debug, Clone)]
pub struct HeuristicMolecule {
    smiles: String,
    atoms: Vec<String>,
    scaffold: String,
    charged: bool,
    components: usize,
    fingerprint: [u64; FP_WORDS],
}

impl HeuristicMolecule {
    fn from_tokens(smiles: &str, tokens: &[Token]) -> Self {
        let atoms: Vec<String> = tokens
            .iter()
            .filter_map(|t| match t {
                Token::Atom(a) => Some(a.clone()),
                _ => None,
            })
            .collect();

        let charged = atoms
            .iter()
            .any(|a| a.starts_with('[') && (a.contains('+') || a.contains('-')));
        let components = 1 + tokens.iter().filter(|t| **t == Token::Dot).count();

        Self {
            smiles: smiles.to_string(),
            scaffold: main_chain(tokens),
            fingerprint: fingerprint(tokens),
            atoms,
            charged,
            components,
        }
    }

    pub fn smiles(&self) -> &str {
        &self.smiles
    }

    pub fn heavy_atoms(&self) -> usize {
        self.atoms.iter().filter(|a| a.as_str() != "[H]").count()
    }

    pub fn scaffold(&self) -> &str {
        &self.scaffold
    }

    /// Tanimoto similarity of the two fingerprints.
    pub fn tanimoto(&self, other: &Self) -> f64 {
        let mut common = 0u32;
        let mut union = 0u32;
        for (a, b) in self.fingerprint.iter().zip(other.fingerprint.iter()) {
            common += (a & b).count_ones();
            union += (a | b).count_ones();
        }
        if union == 0 {
            return 0.0;
        }
        common as f64 / union as f64
    }

    fn passes_filters(&self) -> bool {
        let heavy = self.heavy_atoms();
        heavy > 0
            && heavy <= MAX_HEAVY_ATOMS
            && !self.charged
            && self.components == 1
            && !self.smiles.contains("OO")
    }
}

fn main_chain(tokens: &[Token]) -> String {
    let mut depth = 0usize;
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            Token::Atom(a) => out.push_str(a),
            Token::Bond(b) => out.push(*b),
            Token::Ring(label) => out.push_str(label),
            Token::Dot => out.push('.'),
        }
    }
    out
}

fn fingerprint(tokens: &[Token]) -> [u64; FP_WORDS] {
    let mut bits = [0u64; FP_WORDS];
    let body: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Open | Token::Close))
        .collect();

    for width in 1..=MAX_WINDOW {
        for window in body.windows(width) {
            let mut hasher = DefaultHasher::new();
            window.hash(&mut hasher);
            let bit = (hasher.finish() % FP_BITS as u64) as usize;
            bits[bit / 64] |= 1 << (bit % 64);
        }
    }
    bits
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Syntactic stand-in for a cheminformatics toolkit.
#[derive(Debug, Clone, Default)]
pub struct HeuristicChemistry;

impl HeuristicChemistry {
    pub fn new() -> Self {
        Self
    }
}

impl Chemistry for HeuristicChemistry {
    type Structure = HeuristicMolecule;

    fn canonicalize(&self, smiles: &str) -> Option<String> {
        let trimmed = smiles.trim();
        let tokens = tokenize(trimmed).ok()?;
        check_grammar(&tokens).ok()?;
        Some(trimmed.to_string())
    }

    fn parse(&self, smiles: &str) -> Result<HeuristicMolecule> {
        let tokens = tokenize(smiles)?;
        check_grammar(&tokens)?;
        Ok(HeuristicMolecule::from_tokens(smiles, &tokens))
    }
}

fn count_by<'a>(items: impl Iterator<Item = &'a str>) -> HashMap<&'a str, f64> {
    let mut counts = HashMap::new();
    for item in items {
        *counts.entry(item).or_insert(0.0) += 1.0;
    }
    counts
}

/// Cosine similarity of two count vectors; 0 when either is empty.
fn cosine(a: &HashMap<&str, f64>, b: &HashMap<&str, f64>) -> f64 {
    let dot: f64 = a
        .iter()
        .filter_map(|(k, va)| b.get(k).map(|vb| va * vb))
        .sum();
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl MetricSuite for HeuristicChemistry {
    fn scaffold_similarity(
        &self,
        reference: &[HeuristicMolecule],
        gen: &[HeuristicMolecule],
        _pool: &WorkerPool,
    ) -> Result<f64> {
        let ref_counts = count_by(reference.iter().map(|m| m.scaffold()));
        let gen_counts = count_by(gen.iter().map(|m| m.scaffold()));
        Ok(cosine(&ref_counts, &gen_counts))
    }

    fn fragment_similarity(
        &self,
        reference: &[HeuristicMolecule],
        gen: &[HeuristicMolecule],
        _pool: &WorkerPool,
    ) -> Result<f64> {
        let ref_counts = count_by(reference.iter().flat_map(|m| m.atoms.iter().map(String::as_str)));
        let gen_counts = count_by(gen.iter().flat_map(|m| m.atoms.iter().map(String::as_str)));
        Ok(cosine(&ref_counts, &gen_counts))
    }

    /// `1 - mean(T(a, b))` over all ordered pairs, diagonal included.
    fn internal_diversity(&self, gen: &[HeuristicMolecule], pool: &WorkerPool) -> Result<f64> {
        let row_sums = pool.map(gen, |a| gen.iter().map(|b| a.tanimoto(b)).sum::<f64>());
        let pairs = (gen.len() * gen.len()) as f64;
        Ok(1.0 - row_sums.iter().sum::<f64>() / pairs)
    }

    /// Mean over `gen` of the best Tanimoto match in `reference`.
    fn morgan_similarity(
        &self,
        reference: &[HeuristicMolecule],
        gen: &[HeuristicMolecule],
        pool: &WorkerPool,
        _device: i32,
    ) -> Result<f64> {
        if reference.is_empty() {
            return Ok(f64::NAN);
        }
        let nearest = pool.map(gen, |g| {
            reference
                .iter()
                .map(|r| g.tanimoto(r))
                .fold(0.0_f64, f64::max)
        });
        Ok(nearest.iter().sum::<f64>() / gen.len() as f64)
    }

    fn fraction_passes_filters(
        &self,
        gen: &[HeuristicMolecule],
        pool: &WorkerPool,
    ) -> Result<f64> {
        if gen.is_empty() {
            return Ok(0.0);
        }
        let passed = pool
            .map(gen, HeuristicMolecule::passes_filters)
            .into_iter()
            .filter(|&p| p)
            .count();
        Ok(passed as f64 / gen.len() as f64)
    }
}
