//! Weighted objective orderings over RAM locations.

use std::{
    cmp::Ordering,
    fs,
    io::{self, BufWriter, Write},
    sync::Arc,
};

use crate::ObjectivesError;

const SVG_WIDTH: f64 = 1024.0;
const SVG_HEIGHT: f64 = 768.0;
const SVG_STROKES: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Clone)]
struct Objective {
    locations: Vec<usize>,
    /// Share of the total weight, so all objectives sum to 1.
    weight: f64,
}

impl Objective {
    /// Lexicographic comparison of two memories at this objective's
    /// locations. Out-of-range locations read as 0.
    fn compare(&self, m1: &[u8], m2: &[u8]) -> Ordering {
        for &loc in &self.locations {
            let b1 = m1.get(loc).copied().unwrap_or(0);
            let b2 = m2.get(loc).copied().unwrap_or(0);
            match b1.cmp(&b2) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }

    /// Map a memory to [0, 1) by reading the locations as base-256 digits,
    /// most significant first.
    fn value_fraction(&self, mem: &[u8]) -> f64 {
        let mut value = 0.0;
        let mut scale = 1.0 / 256.0;
        for &loc in &self.locations {
            value += mem.get(loc).copied().unwrap_or(0) as f64 * scale;
            scale /= 256.0;
        }
        value
    }
}

/// A bank of weighted objectives learned from a playthrough.
#[derive(Debug, Clone)]
pub struct WeightedObjectives {
    objectives: Vec<Objective>,
}

impl WeightedObjectives {
    /// Load objectives from a text file: one per line, a decimal weight
    /// followed by whitespace-separated RAM locations. `#` starts a comment.
    ///
    /// # Panics
    ///
    /// Panics if the file can't be read or parsed, or holds no objective
    /// with positive weight.
    #[track_caller]
    pub fn load(filename: &str) -> Self {
        match Self::try_load(filename) {
            Ok(objectives) => objectives,
            Err(error) => panic!("Error:\n  {}\n", error),
        }
    }

    /// Load objectives from a text file.
    ///
    /// Weights are normalized to sum to 1, so [evaluate](Self::evaluate)
    /// lands in [-1, 1]. Returns an error if the file can't be read or
    /// parsed, or holds no objective with positive weight.
    pub fn try_load(filename: &str) -> Result<Self, ObjectivesError> {
        let text = fs::read_to_string(filename).map_err(|error| ObjectivesError::ReadError {
            filename: filename.to_string(),
            error: Arc::new(error),
        })?;

        let mut objectives = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parse_error = || ObjectivesError::ParseError {
                filename: filename.to_string(),
                line: index + 1,
            };

            let mut fields = line.split_whitespace();
            let weight: f64 = fields
                .next()
                .and_then(|field| field.parse().ok())
                .filter(|weight: &f64| weight.is_finite() && *weight >= 0.0)
                .ok_or_else(|| parse_error())?;
            let locations = fields
                .map(|field| field.parse::<usize>().map_err(|_| parse_error()))
                .collect::<Result<Vec<usize>, ObjectivesError>>()?;
            if locations.is_empty() {
                return Err(parse_error());
            }
            if weight > 0.0 {
                objectives.push(Objective { locations, weight });
            }
        }

        let total: f64 = objectives.iter().map(|objective| objective.weight).sum();
        if objectives.is_empty() || total <= 0.0 {
            return Err(ObjectivesError::NoObjectives {
                filename: filename.to_string(),
            });
        }
        for objective in &mut objectives {
            objective.weight /= total;
        }
        Ok(Self { objectives })
    }

    /// Number of objectives.
    pub fn size(&self) -> usize {
        self.objectives.len()
    }

    /// Score the change from `before` to `after`: the weight of every
    /// objective that increased minus the weight of every objective that
    /// decreased. In [-1, 1].
    pub fn evaluate(&self, before: &[u8], after: &[u8]) -> f64 {
        let mut score = 0.0;
        for objective in &self.objectives {
            match objective.compare(before, after) {
                Ordering::Less => score += objective.weight,
                Ordering::Greater => score -= objective.weight,
                Ordering::Equal => {}
            }
        }
        score
    }

    /// Like [evaluate](Self::evaluate), but weighing each objective by how
    /// far its value moved rather than just the direction.
    pub fn evaluate_magnitude(&self, before: &[u8], after: &[u8]) -> f64 {
        let mut score = 0.0;
        for objective in &self.objectives {
            score += objective.weight
                * (objective.value_fraction(after) - objective.value_fraction(before));
        }
        score
    }

    /// Plot every objective's value across the accumulated per-frame memory
    /// snapshots as an SVG.
    ///
    /// # Panics
    ///
    /// Panics if the file can't be written.
    #[track_caller]
    pub fn save_svg(&self, memories: &[Vec<u8>], filename: &str) {
        if let Err(error) = self.try_save_svg(memories, filename) {
            panic!("Error:\n  {}\n", error);
        }
    }

    /// Plot every objective's value across the accumulated per-frame memory
    /// snapshots as an SVG. Returns an error if the file can't be written.
    pub fn try_save_svg(
        &self,
        memories: &[Vec<u8>],
        filename: &str,
    ) -> Result<(), ObjectivesError> {
        self.save_svg_impl(memories, filename)
            .map_err(|error| ObjectivesError::WriteError {
                filename: filename.to_string(),
                error: Arc::new(error),
            })
    }

    fn save_svg_impl(&self, memories: &[Vec<u8>], filename: &str) -> io::Result<()> {
        let mut f = BufWriter::new(fs::File::create(filename)?);

        writeln!(
            f,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" \
             viewBox=\"0 0 {w} {h}\">",
            w = SVG_WIDTH,
            h = SVG_HEIGHT
        )?;
        writeln!(
            f,
            "  <rect width=\"{}\" height=\"{}\" fill=\"white\"/>",
            SVG_WIDTH, SVG_HEIGHT
        )?;

        let x_step = SVG_WIDTH / (memories.len().max(2) - 1) as f64;
        for (index, objective) in self.objectives.iter().enumerate() {
            let stroke = SVG_STROKES[index % SVG_STROKES.len()];
            write!(f, "  <polyline fill=\"none\" stroke=\"{}\" points=\"", stroke)?;
            for (frame, memory) in memories.iter().enumerate() {
                let x = frame as f64 * x_step;
                let y = (1.0 - objective.value_fraction(memory)) * SVG_HEIGHT;
                write!(f, "{:.1},{:.1} ", x, y)?;
            }
            writeln!(f, "\"><title>weight {:.4}</title></polyline>", objective.weight)?;
        }

        writeln!(
            f,
            "  <text x=\"4\" y=\"{}\" font-size=\"12\">{} frames, {} objectives</text>",
            SVG_HEIGHT - 6.0,
            memories.len(),
            self.objectives.len()
        )?;
        writeln!(f, "</svg>")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{env, process};

    use super::*;

    fn write_temp(tag: &str, contents: &str) -> String {
        let path = env::temp_dir()
            .join(format!("playfun-objectives-{}-{}.txt", tag, process::id()))
            .to_string_lossy()
            .into_owned();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn single_objective_scores_direction() {
        let path = write_temp("single", "1.0 0\n");
        let objectives = WeightedObjectives::load(&path);
        fs::remove_file(&path).unwrap();

        assert_eq!(objectives.size(), 1);
        assert_eq!(objectives.evaluate(&[5], &[9]), 1.0);
        assert_eq!(objectives.evaluate(&[9], &[5]), -1.0);
        assert_eq!(objectives.evaluate(&[7], &[7]), 0.0);
    }

    #[test]
    fn comparison_is_lexicographic() {
        let path = write_temp("lex", "1.0 0 1\n");
        let objectives = WeightedObjectives::load(&path);
        fs::remove_file(&path).unwrap();

        // First location equal, second decides.
        assert_eq!(objectives.evaluate(&[1, 5], &[1, 9]), 1.0);
        // First location dominates the second.
        assert_eq!(objectives.evaluate(&[2, 200], &[3, 0]), 1.0);
    }

    #[test]
    fn weights_normalize_across_objectives() {
        let path = write_temp("weights", "# learned\n3.0 0\n1.0 1\n");
        let objectives = WeightedObjectives::load(&path);
        fs::remove_file(&path).unwrap();

        // Only the 3.0-weight objective moves.
        assert!((objectives.evaluate(&[0, 0], &[1, 0]) - 0.75).abs() < 1e-9);
        // Both move in opposite directions.
        assert!((objectives.evaluate(&[0, 1], &[1, 0]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn magnitude_tracks_value_fractions() {
        let path = write_temp("magnitude", "1.0 0\n");
        let objectives = WeightedObjectives::load(&path);
        fs::remove_file(&path).unwrap();

        let score = objectives.evaluate_magnitude(&[0], &[128]);
        assert!((score - 0.5).abs() < 1e-9);
        // Out-of-range locations read as 0.
        assert_eq!(objectives.evaluate_magnitude(&[], &[]), 0.0);
    }

    #[test]
    fn rejects_garbage_and_empty_files() {
        let path = write_temp("garbage", "1.0 zero one\n");
        assert!(matches!(
            WeightedObjectives::try_load(&path),
            Err(ObjectivesError::ParseError { line: 1, .. })
        ));
        fs::remove_file(&path).unwrap();

        let path = write_temp("empty", "# nothing\n0.0 1 2\n");
        assert!(matches!(
            WeightedObjectives::try_load(&path),
            Err(ObjectivesError::NoObjectives { .. })
        ));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn svg_has_one_polyline_per_objective() {
        let path = write_temp("svg-src", "1.0 0\n2.0 1\n");
        let objectives = WeightedObjectives::load(&path);
        fs::remove_file(&path).unwrap();

        let svg_path = write_temp("svg-out", "");
        let memories = vec![vec![0u8, 0], vec![64, 32], vec![128, 64]];
        objectives.save_svg(&memories, &svg_path);
        let svg = fs::read_to_string(&svg_path).unwrap();
        fs::remove_file(&svg_path).unwrap();

        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
    }
}
