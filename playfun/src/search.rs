//! The greedy search: at every frame, try candidate motifs, score each by
//! immediate memory change plus stochastic look-ahead, and commit the best.

use std::{cmp::Ordering, collections::VecDeque};

use rand::{seq::SliceRandom, Rng};
use rand_pcg::Pcg64Mcg;

use playfun_emu::emu;
use playfun_movie as movie;
use playfun_objectives::{Motifs, WeightedObjectives};

/// Frame budget for one run.
const NUM_FRAMES: usize = 10_000;

/// Rolling window of recent future scores driving depth adaptation.
const HISTORY_SIZE: usize = 50;

// "playfun!"
const RNG_SEED: u64 = 0x706c_6179_6675_6e21;

const ROM_CHECKSUM: &str = "base64:Ww5XFVjIx5aTe5avRpVhxg==";

/// Look-ahead depths, adapted from the rolling future-score history.
///
/// Bad recent futures shorten and widen the rollouts; good ones lengthen
/// and deepen them.
#[derive(Debug)]
struct AdaptiveFutures {
    recent: VecDeque<f64>,
    avoid_depths: [usize; 2],
    seek_depths: [usize; 3],
}

impl AdaptiveFutures {
    fn new() -> Self {
        Self {
            recent: VecDeque::new(),
            avoid_depths: [20, 75],
            seek_depths: [30, 30, 50],
        }
    }

    fn record(&mut self, score: f64) {
        self.recent.push_back(score);
        while self.recent.len() > HISTORY_SIZE {
            self.recent.pop_front();
        }
    }

    fn average(&self) -> f64 {
        if self.recent.is_empty() {
            return 0.0;
        }
        self.recent.iter().sum::<f64>() / self.recent.len() as f64
    }

    fn adapt(&mut self) {
        // Not enough history to judge yet.
        if self.recent.len() < HISTORY_SIZE / 2 {
            return;
        }
        let avg = self.average();
        if avg < 0.3 {
            self.avoid_depths = [10, 30];
            self.seek_depths = [15, 15, 25];
        } else if avg > 0.7 {
            self.avoid_depths = [40, 150];
            self.seek_depths = [50, 50, 100];
        } else {
            self.avoid_depths = [20, 75];
            self.seek_depths = [30, 30, 50];
        }
    }
}

/// Per-motif quality tracking used to prune the candidate set.
#[derive(Debug)]
struct MotifQuality {
    scores: Vec<f64>,
    uses: usize,
}

impl MotifQuality {
    fn new(count: usize) -> Self {
        Self {
            scores: vec![0.0; count],
            uses: 0,
        }
    }

    /// Exponential moving average, slow enough to survive noisy frames.
    fn update(&mut self, index: usize, score: f64) {
        self.scores[index] = self.scores[index] * 0.95 + score * 0.05;
        self.uses += 1;
    }

    /// Which motifs to try this frame.
    ///
    /// Until enough usage data exists, all of them. After that, the best
    /// half by score plus a ~25% random subset of the rest, in random order.
    fn select<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let n = self.scores.len();
        let mut indices: Vec<usize> = (0..n).collect();

        if self.uses < 100 {
            indices.shuffle(rng);
            return indices;
        }

        indices.sort_by(|&a, &b| {
            self.scores[b]
                .partial_cmp(&self.scores[a])
                .unwrap_or(Ordering::Equal)
        });

        let best_half = n / 2;
        let mut selected: Vec<usize> = indices[..best_half].to_vec();
        for &index in &indices[best_half..] {
            if rng.gen::<u8>() < 64 {
                selected.push(index);
            }
        }

        selected.shuffle(rng);
        selected
    }
}

/// The greedy playfun driver.
///
/// Owns the growing output movie and all adaptive state; drives the
/// process-wide emulator facade.
#[derive(Debug)]
pub struct PlayFun {
    game: String,
    objectives: WeightedObjectives,
    motifs: Motifs,
    motif_bank: Vec<Vec<u8>>,
    quality: MotifQuality,
    futures: AdaptiveFutures,
    movie: Vec<u8>,
    memories: Vec<Vec<u8>>,
    rng: Pcg64Mcg,
    magnitude: bool,
}

impl PlayFun {
    /// Set up a run: size the step cache, and replay the seed movie's prefix
    /// up through its first button press so the search starts in-game.
    pub fn new(
        game: String,
        objectives: WeightedObjectives,
        motifs: Motifs,
        seed_movie: &[u8],
        magnitude: bool,
    ) -> Self {
        use rand::SeedableRng;

        emu::reset_cache(100_000, 10_000);
        let motif_bank = motifs.all_motifs();
        let quality = MotifQuality::new(motif_bank.len());

        let mut movie = Vec::new();
        let mut skipped = 0usize;
        for &input in seed_movie {
            emu::step(input);
            movie.push(input);
            if input != 0 {
                break;
            }
            skipped += 1;
        }
        println!("Skipped {} frames until first keypress.", skipped);

        Self {
            game,
            objectives,
            motifs,
            motif_bank,
            quality,
            futures: AdaptiveFutures::new(),
            movie,
            memories: Vec::new(),
            rng: Pcg64Mcg::seed_from_u64(RNG_SEED),
            magnitude,
        }
    }

    fn score_change(&self, before: &[u8], after: &[u8]) -> f64 {
        if self.magnitude {
            self.objectives.evaluate_magnitude(before, after)
        } else {
            self.objectives.evaluate(before, after)
        }
    }

    /// Worst score reachable from the current state: two trials of weighted
    /// random motifs, scoring `base_memory` against memory after every
    /// single step, minimized.
    fn avoid_bad_futures(&mut self, base_memory: &[u8]) -> f64 {
        let base_state = emu::save_uncompressed();

        let mut total = 1.0;
        let mut first = true;
        for trial in 0..self.futures.avoid_depths.len() {
            if trial != 0 {
                emu::load_uncompressed(&base_state);
            }
            for _ in 0..self.futures.avoid_depths[trial] {
                let motif = self.motifs.random_weighted(&mut self.rng);
                for &input in motif {
                    emu::caching_step(input);
                    let future_memory = emu::memory();
                    let score = self.score_change(base_memory, &future_memory);
                    total = if first { score } else { total.min(score) };
                    first = false;
                }
            }
        }
        total
    }

    /// Best endpoint reachable from the current state: three trials of
    /// weighted random motifs, scoring only each trial's final memory,
    /// maximized.
    fn seek_good_futures(&mut self, base_memory: &[u8]) -> f64 {
        let base_state = emu::save_uncompressed();

        let mut total = 1.0;
        for trial in 0..self.futures.seek_depths.len() {
            if trial != 0 {
                emu::load_uncompressed(&base_state);
            }
            for _ in 0..self.futures.seek_depths[trial] {
                let motif = self.motifs.random_weighted(&mut self.rng);
                for &input in motif {
                    emu::caching_step(input);
                }
            }

            let future_memory = emu::memory();
            let score = self.score_change(base_memory, &future_memory);
            total = if trial == 0 { score } else { total.max(score) };
        }
        total
    }

    /// Run the greedy loop for the full frame budget.
    pub fn greedy(&mut self) {
        for framenum in 0..NUM_FRAMES {
            let current_state = emu::save_uncompressed();
            let current_memory = emu::memory();
            self.memories.push(current_memory.clone());

            let candidates = self.quality.select(&mut self.rng);

            let mut best_score = f64::NEG_INFINITY;
            let mut best_immediate = 0.0;
            let mut best_future = 0.0;
            let mut best_index = 0usize;

            for (trial, &motif_index) in candidates.iter().enumerate() {
                if trial != 0 {
                    emu::load_uncompressed(&current_state);
                }
                let motif = self.motif_bank[motif_index].clone();
                for &input in &motif {
                    emu::caching_step(input);
                }

                let new_memory = emu::memory();
                let new_state = emu::save_uncompressed();

                let immediate_score = self.score_change(&current_memory, &new_memory);
                let mut future_score = self.avoid_bad_futures(&current_memory);
                emu::load_uncompressed(&new_state);
                future_score += self.seek_good_futures(&current_memory);

                let score = immediate_score + future_score;
                self.quality.update(motif_index, score);

                if score > best_score {
                    best_score = score;
                    best_immediate = immediate_score;
                    best_future = future_score;
                    best_index = motif_index;
                }
            }

            println!(
                "{:8} best score {:.2} ({:.2} + {:.2} future) [tried {}/{}]",
                self.movie.len(),
                best_score,
                best_immediate,
                best_future,
                candidates.len(),
                self.motif_bank.len()
            );

            self.futures.record(best_future);
            self.futures.adapt();

            if framenum % 100 == 0 {
                println!(
                    "         [adaptive: avg_future={:.2}, avoid=[{},{}], seek=[{},{},{}]]",
                    self.futures.average(),
                    self.futures.avoid_depths[0],
                    self.futures.avoid_depths[1],
                    self.futures.seek_depths[0],
                    self.futures.seek_depths[1],
                    self.futures.seek_depths[2]
                );
            }

            emu::load_uncompressed(&current_state);
            let best_motif = self.motif_bank[best_index].clone();
            for &input in &best_motif {
                emu::caching_step(input);
                self.movie.push(input);
            }

            if framenum % 10 == 0 {
                self.write_artifacts("progress");
                emu::print_cache_stats();
                println!("                     (wrote)");
            }
        }

        self.write_artifacts("final");
    }

    fn write_artifacts(&self, stage: &str) {
        movie::save_fm2(
            &format!("{}-playfun-motif-{}.fm2", self.game, stage),
            &format!("{}.nes", self.game),
            ROM_CHECKSUM,
            &self.movie,
        );
        self.objectives
            .save_svg(&self.memories, &format!("{}-playfun.svg", self.game));
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn filled_history(score: f64, samples: usize) -> AdaptiveFutures {
        let mut futures = AdaptiveFutures::new();
        for _ in 0..samples {
            futures.record(score);
        }
        futures.adapt();
        futures
    }

    #[test]
    fn bad_futures_shorten_the_rollouts() {
        let futures = filled_history(0.1, 25);
        assert_eq!(futures.avoid_depths, [10, 30]);
        assert_eq!(futures.seek_depths, [15, 15, 25]);
    }

    #[test]
    fn good_futures_lengthen_the_rollouts() {
        let futures = filled_history(0.9, 25);
        assert_eq!(futures.avoid_depths, [40, 150]);
        assert_eq!(futures.seek_depths, [50, 50, 100]);
    }

    #[test]
    fn middling_futures_keep_the_defaults() {
        let futures = filled_history(0.5, 25);
        assert_eq!(futures.avoid_depths, [20, 75]);
        assert_eq!(futures.seek_depths, [30, 30, 50]);
    }

    #[test]
    fn no_adaptation_until_history_is_half_full() {
        let futures = filled_history(0.9, 24);
        assert_eq!(futures.avoid_depths, [20, 75]);
        assert_eq!(futures.seek_depths, [30, 30, 50]);
    }

    #[test]
    fn history_is_a_rolling_window() {
        let mut futures = AdaptiveFutures::new();
        for _ in 0..HISTORY_SIZE {
            futures.record(0.9);
        }
        // Half a window of bad scores drags the average back under 0.7.
        for _ in 0..HISTORY_SIZE / 2 {
            futures.record(0.1);
        }
        assert_eq!(futures.recent.len(), HISTORY_SIZE);
        futures.adapt();
        assert_eq!(futures.avoid_depths, [20, 75]);
    }

    #[test]
    fn selection_tries_everything_until_usage_data_exists() {
        let quality = MotifQuality::new(8);
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let mut selected = quality.select(&mut rng);
        selected.sort_unstable();
        assert_eq!(selected, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn selection_keeps_the_best_half_once_warmed_up() {
        let mut quality = MotifQuality::new(8);
        // Warm up past the exploration threshold with a clear ranking:
        // motif 0 scores best, motif 7 worst.
        for _ in 0..15 {
            for index in 0..8 {
                quality.update(index, (8 - index) as f64);
            }
        }
        assert!(quality.uses >= 100);

        let mut rng = Pcg64Mcg::seed_from_u64(2);
        for _ in 0..20 {
            let selected = quality.select(&mut rng);
            for best in 0..4 {
                assert!(selected.contains(&best), "missing top motif {}", best);
            }
            assert!(selected.len() >= 4 && selected.len() <= 8);
        }

        // The tail is sampled: across many draws some low scorer shows up,
        // but not every time.
        let mut tail_seen = 0;
        for _ in 0..50 {
            let selected = quality.select(&mut rng);
            if selected.iter().any(|&index| index >= 4) {
                tail_seen += 1;
            }
        }
        assert!(tail_seen > 0 && tail_seen < 50);
    }

    #[test]
    fn quality_updates_are_an_ema() {
        let mut quality = MotifQuality::new(1);
        quality.update(0, 1.0);
        assert!((quality.scores[0] - 0.05).abs() < 1e-12);
        quality.update(0, 1.0);
        assert!((quality.scores[0] - (0.05 * 0.95 + 0.05)).abs() < 1e-12);
        assert_eq!(quality.uses, 2);
    }
}
