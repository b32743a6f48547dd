//! Character-level vocabulary for the generator.
//!
//! Ids `0..n` are the corpus characters in sorted order, followed by the
//! special tokens `<bos>`, `<eos>`, `<pad>` and `<unk>`.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const BOS: &str = "<bos>";
pub const EOS: &str = "<eos>";
pub const PAD: &str = "<pad>";
pub const UNK: &str = "<unk>";

const SPECIALS: [&str; 4] = [BOS, EOS, PAD, UNK];

/// Bidirectional char <-> id mapping. Serialized as the ordered token list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CharVocab {
    tokens: Vec<String>,
    c2i: HashMap<char, usize>,
}

impl CharVocab {
    /// Collect every character of `data`.
    pub fn from_data<S: AsRef<str>>(data: &[S]) -> Self {
        let chars: BTreeSet<char> = data.iter().flat_map(|s| s.as_ref().chars()).collect();
        let c2i = chars.iter().enumerate().map(|(id, &c)| (c, id)).collect();
        let mut tokens: Vec<String> = chars.into_iter().map(String::from).collect();
        tokens.extend(SPECIALS.iter().map(|s| s.to_string()));
        Self { tokens, c2i }
    }

    fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let n_chars = tokens.len().saturating_sub(SPECIALS.len());
        if tokens.len() < SPECIALS.len() || tokens[n_chars..] != SPECIALS {
            bail!("Vocabulary must end with the special tokens {SPECIALS:?}");
        }

        let mut c2i = HashMap::with_capacity(n_chars);
        for (id, token) in tokens[..n_chars].iter().enumerate() {
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    if c2i.insert(c, id).is_some() {
                        bail!("Duplicate vocabulary character {c:?}");
                    }
                }
                _ => bail!("Vocabulary entry {token:?} is not a single character"),
            }
        }

        Ok(Self { tokens, c2i })
    }

    /// Total number of ids, special tokens included.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn n_chars(&self) -> usize {
        self.tokens.len() - SPECIALS.len()
    }

    pub fn bos(&self) -> usize {
        self.n_chars()
    }

    pub fn eos(&self) -> usize {
        self.n_chars() + 1
    }

    pub fn pad(&self) -> usize {
        self.n_chars() + 2
    }

    pub fn unk(&self) -> usize {
        self.n_chars() + 3
    }

    pub fn char2id(&self, c: char) -> usize {
        self.c2i.get(&c).copied().unwrap_or_else(|| self.unk())
    }

    /// Token text of `id`; unknown ids map to `<unk>`.
    pub fn id2token(&self, id: usize) -> &str {
        self.tokens.get(id).map(String::as_str).unwrap_or(UNK)
    }

    pub fn string2ids(&self, s: &str, add_bos: bool, add_eos: bool) -> Vec<usize> {
        let mut ids = Vec::with_capacity(s.len() + 2);
        if add_bos {
            ids.push(self.bos());
        }
        ids.extend(s.chars().map(|c| self.char2id(c)));
        if add_eos {
            ids.push(self.eos());
        }
        ids
    }

    pub fn ids2string(&self, ids: &[usize], rem_bos: bool, rem_eos: bool) -> String {
        let mut ids = ids;
        if rem_bos {
            if let Some((&first, rest)) = ids.split_first() {
                if first == self.bos() {
                    ids = rest;
                }
            }
        }
        if rem_eos {
            if let Some((&last, rest)) = ids.split_last() {
                if last == self.eos() {
                    ids = rest;
                }
            }
        }
        ids.iter().map(|&id| self.id2token(id)).collect()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize vocabulary")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write vocabulary to {}", path.display()))?;
        tracing::info!(path = %path.display(), size = self.len(), "Saved vocabulary");
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary from {}", path.display()))?;
        let vocab: Self =
            serde_json::from_str(&data).context("Failed to deserialize vocabulary JSON")?;
        tracing::info!(path = %path.display(), size = vocab.len(), "Loaded vocabulary");
        Ok(vocab)
    }
}

impl TryFrom<Vec<String>> for CharVocab {
    type Error = anyhow::Error;

    fn try_from(tokens: Vec<String>) -> Result<Self> {
        Self::from_tokens(tokens)
    }
}

impl From<CharVocab> for Vec<String> {
    fn from(vocab: CharVocab) -> Self {
        vocab.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> CharVocab {
        CharVocab::from_data(&["CCO", "c1ccccc1"])
    }

    #[test]
    fn test_from_data_sorted_chars_then_specials() {
        let v = vocab();
        // '1' < 'C' < 'O' < 'c'
        assert_eq!(v.len(), 8);
        assert_eq!(v.char2id('1'), 0);
        assert_eq!(v.char2id('C'), 1);
        assert_eq!(v.char2id('O'), 2);
        assert_eq!(v.char2id('c'), 3);
        assert_eq!(v.bos(), 4);
        assert_eq!(v.eos(), 5);
        assert_eq!(v.pad(), 6);
        assert_eq!(v.unk(), 7);
    }

    #[test]
    fn test_unknown_char() {
        let v = vocab();
        assert_eq!(v.char2id('N'), v.unk());
        assert_eq!(v.ids2string(&[v.char2id('N')], true, true), UNK);
    }

    #[test]
    fn test_encode_decode() {
        let v = vocab();
        let ids = v.string2ids("CCO", true, true);
        assert_eq!(ids, vec![v.bos(), 1, 1, 2, v.eos()]);
        assert_eq!(v.ids2string(&ids, true, true), "CCO");
        assert_eq!(v.ids2string(&ids, false, false), "<bos>CCO<eos>");
    }

    #[test]
    fn test_json_roundtrip() {
        let v = vocab();
        let json = serde_json::to_string(&v).unwrap();
        let loaded: CharVocab = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, v);
        assert_eq!(loaded.char2id('c'), 3);
    }

    #[test]
    fn test_rejects_malformed_token_list() {
        let tokens: Vec<String> = vec!["CC".into(), BOS.into(), EOS.into(), PAD.into(), UNK.into()];
        assert!(CharVocab::try_from(tokens).is_err());
        assert!(CharVocab::try_from(vec!["C".to_string()]).is_err());
    }
}
