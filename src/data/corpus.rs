//! SMILES corpus files.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Name of the column holding the molecules.
pub const SMILES_COLUMN: &str = "SMILES";

/// Read the `SMILES` column of a CSV file. Other columns are ignored.
pub fn read_smiles_csv(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open corpus {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?;
    let Some(column) = headers.iter().position(|h| h.trim() == SMILES_COLUMN) else {
        bail!("{} has no {SMILES_COLUMN} column", path.display());
    };

    let mut smiles = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.with_context(|| format!("Malformed record {} in {}", line + 2, path.display()))?;
        if let Some(value) = record.get(column) {
            smiles.push(value.trim().to_string());
        }
    }

    tracing::info!(path = %path.display(), molecules = smiles.len(), "Loaded SMILES corpus");
    Ok(smiles)
}

/// Write `smiles` as a single-column CSV with a `SMILES` header.
pub fn write_smiles_csv(path: impl AsRef<Path>, smiles: &[String]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([SMILES_COLUMN])?;
    for s in smiles {
        writer.write_record([s])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_smiles_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(&path, "SPLIT,SMILES\ntrain,CCO\ntrain,c1ccccc1\n").unwrap();

        let smiles = read_smiles_csv(&path).unwrap();
        assert_eq!(smiles, vec!["CCO".to_string(), "c1ccccc1".to_string()]);
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "smile\nCCO\n").unwrap();
        assert!(read_smiles_csv(&path).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gen.csv");
        let smiles = vec!["CCO".to_string(), "CC(=O)O".to_string()];
        write_smiles_csv(&path, &smiles).unwrap();
        assert_eq!(read_smiles_csv(&path).unwrap(), smiles);
    }
}
