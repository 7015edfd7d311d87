//! Weighted banks of short input sequences.

use std::{fs, sync::Arc};

use rand::Rng;

use crate::MotifsError;

#[derive(Debug, Clone)]
struct Motif {
    inputs: Vec<u8>,
    weight: f64,
}

/// An indexed bank of motifs with draw weights.
///
/// The bank's shape is fixed after loading; the search tracks per-motif
/// quality on its own side, keyed by index into
/// [all_motifs](Self::all_motifs).
#[derive(Debug, Clone)]
pub struct Motifs {
    motifs: Vec<Motif>,
    total_weight: f64,
}

impl Motifs {
    /// Load motifs from a text file: one per line, a decimal weight followed
    /// by the motif's input bytes in decimal. `#` starts a comment.
    ///
    /// # Panics
    ///
    /// Panics if the file can't be read or parsed, or holds no motif with
    /// positive weight.
    #[track_caller]
    pub fn load(filename: &str) -> Self {
        match Self::try_load(filename) {
            Ok(motifs) => motifs,
            Err(error) => panic!("Error:\n  {}\n", error),
        }
    }

    /// Load motifs from a text file.
    ///
    /// Returns an error if the file can't be read or parsed, or holds no
    /// motif with positive weight.
    pub fn try_load(filename: &str) -> Result<Self, MotifsError> {
        let text = fs::read_to_string(filename).map_err(|error| MotifsError::ReadError {
            filename: filename.to_string(),
            error: Arc::new(error),
        })?;

        let mut motifs = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_error = || MotifsError::ParseError {
                filename: filename.to_string(),
                line: index + 1,
            };

            let mut fields = line.split_whitespace();
            let weight: f64 = fields
                .next()
                .and_then(|field| field.parse().ok())
                .filter(|weight: &f64| weight.is_finite() && *weight > 0.0)
                .ok_or_else(|| parse_error())?;
            let inputs = fields
                .map(|field| field.parse::<u8>().map_err(|_| parse_error()))
                .collect::<Result<Vec<u8>, MotifsError>>()?;
            if inputs.is_empty() {
                return Err(parse_error());
            }
            motifs.push(Motif { inputs, weight });
        }

        if motifs.is_empty() {
            return Err(MotifsError::NoMotifs {
                filename: filename.to_string(),
            });
        }
        let total_weight = motifs.iter().map(|motif| motif.weight).sum();
        Ok(Self {
            motifs,
            total_weight,
        })
    }

    /// Number of motifs in the bank.
    pub fn len(&self) -> usize {
        self.motifs.len()
    }

    /// Whether the bank is empty. Never true for a loaded bank.
    pub fn is_empty(&self) -> bool {
        self.motifs.is_empty()
    }

    /// The motif input sequences, in file order.
    pub fn all_motifs(&self) -> Vec<Vec<u8>> {
        self.motifs.iter().map(|motif| motif.inputs.clone()).collect()
    }

    /// Draw a motif with probability proportional to its weight.
    pub fn random_weighted<R: Rng>(&self, rng: &mut R) -> &[u8] {
        let mut remaining = rng.gen::<f64>() * self.total_weight;
        for motif in &self.motifs {
            if remaining < motif.weight {
                return &motif.inputs;
            }
            remaining -= motif.weight;
        }
        // Floating-point slack lands on the last motif.
        &self.motifs.last().expect("motif bank is empty").inputs
    }
}

#[cfg(test)]
mod tests {
    use std::{env, process};

    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn write_temp(tag: &str, contents: &str) -> String {
        let path = env::temp_dir()
            .join(format!("playfun-motifs-{}-{}.txt", tag, process::id()))
            .to_string_lossy()
            .into_owned();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_inputs_in_file_order() {
        let path = write_temp("order", "# bank\n1.0 0 0 128 128\n2.5 1 1\n");
        let motifs = Motifs::load(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(motifs.len(), 2);
        assert_eq!(
            motifs.all_motifs(),
            vec![vec![0, 0, 128, 128], vec![1, 1]]
        );
    }

    #[test]
    fn weighted_draws_are_deterministic_under_a_seed() {
        let path = write_temp("draw", "1.0 10\n1.0 20\n8.0 30\n");
        let motifs = Motifs::load(&path);
        fs::remove_file(&path).unwrap();

        let mut rng_a = Pcg64Mcg::seed_from_u64(7);
        let mut rng_b = Pcg64Mcg::seed_from_u64(7);
        let picks_a: Vec<&[u8]> = (0..32).map(|_| motifs.random_weighted(&mut rng_a)).collect();
        let picks_b: Vec<&[u8]> = (0..32).map(|_| motifs.random_weighted(&mut rng_b)).collect();
        assert_eq!(picks_a, picks_b);

        // The heavy motif dominates the draw.
        let heavy = picks_a.iter().filter(|pick| pick[0] == 30).count();
        assert!(heavy > 16, "heavy motif drawn {} times", heavy);
    }

    #[test]
    fn rejects_zero_weights_and_empty_lines() {
        let path = write_temp("zero", "0.0 1 2 3\n");
        assert!(matches!(
            Motifs::try_load(&path),
            Err(MotifsError::ParseError { line: 1, .. })
        ));
        fs::remove_file(&path).unwrap();

        let path = write_temp("none", "# just a comment\n");
        assert!(matches!(
            Motifs::try_load(&path),
            Err(MotifsError::NoMotifs { .. })
        ));
        fs::remove_file(&path).unwrap();
    }
}
