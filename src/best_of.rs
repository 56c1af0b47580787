use crate::kernels::{pad, shrink_block, shrink_naive};
use crate::{BestOfConfig, Element, LayoutError, Result, Shape4, Tensor4};
use log::{debug, trace};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A kernel taking an input buffer and writing an output buffer
pub type Alternative<T> = fn(&Tensor4<T>, &mut Tensor4<T>) -> Result<()>;

/// Problem size key: (input shape, output shape) by default
pub type ProblemSize = (Shape4, Shape4);

/// Derives the problem size key from the buffers of a call
pub type ProblemSizeFn<T> = fn(&Tensor4<T>, &Tensor4<T>) -> ProblemSize;

/// Keys a call by its (input shape, output shape)
pub fn io_size<T: Element>(matrix_in: &Tensor4<T>, matrix_out: &Tensor4<T>) -> ProblemSize {
    (matrix_in.shape, matrix_out.shape)
}

/// Keys a call by its (padded shape, unpadded shape) in either direction, so
/// the pad and shrink stages of one pipeline share a key
pub fn padded_size<T: Element>(a: &Tensor4<T>, b: &Tensor4<T>) -> ProblemSize {
    if a.shape.h + a.shape.w >= b.shape.h + b.shape.w {
        (a.shape, b.shape)
    } else {
        (b.shape, a.shape)
    }
}

/// Per problem size competition state
#[derive(Debug)]
struct Competition {
    current_alternative: usize,
    current_round: usize,
    times: Vec<Vec<Duration>>,
    /// Stage times of the pipeline run in progress
    stage_times: Vec<Option<Duration>>,
    pruned: Vec<bool>,
    best: Option<usize>,
    calls: usize,
}

impl Competition {
    fn new(alternatives: usize, stages: usize) -> Self {
        Competition {
            current_alternative: 0,
            current_round: 0,
            times: vec![Vec::new(); alternatives],
            stage_times: vec![None; stages],
            pruned: vec![false; alternatives],
            best: None,
            calls: 0,
        }
    }

    /// Median time per alternative in seconds, `None` if never run
    fn medians(&self) -> Vec<Option<f64>> {
        self.times.iter().map(|times| median(times)).collect()
    }
}

fn median(times: &[Duration]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    let mut secs: Vec<f64> = times.iter().map(Duration::as_secs_f64).collect();
    secs.sort_by(|a, b| a.total_cmp(b));
    let mid = secs.len() / 2;
    if secs.len() % 2 == 0 {
        Some((secs[mid - 1] + secs[mid]) / 2.0)
    } else {
        Some(secs[mid])
    }
}

/// One line of a [`BestOf::report`]
#[derive(Debug, Clone, PartialEq)]
pub struct BestOfRow {
    pub size: ProblemSize,
    /// Calls made for this size, every stage counted
    pub calls: usize,
    /// Median seconds per alternative
    pub medians: Vec<Option<f64>>,
    pub best: Option<usize>,
    /// Slowest median divided by the chosen alternative's median
    pub speedup: Option<f64>,
}

/// Runs interchangeable kernels in turn for each problem size and eventually
/// settles on the fastest one for that size.
///
/// Every call executes the current alternative, records its elapsed time and
/// moves on to the next one; one pass over all alternatives is a round. Once
/// `prune_after_round` rounds are done, each round boundary compares median
/// times: if only one alternative is within `pruning_speedup` of the best, or
/// `rounds` rounds have completed, the fastest is fixed for that size.
/// Otherwise the alternatives outside that margin stop being tried.
///
/// An alternative may also be a pipeline of several stages, see
/// [`BestOf::pipelines`]. The caller then runs each stage with
/// [`BestOf::call_stage`], and a pipeline is timed as the sum of its stages
/// once the last one has run.
pub struct BestOf<T: Element = f32> {
    name: String,
    alternatives: Vec<(String, Vec<Alternative<T>>)>,
    stages: usize,
    config: BestOfConfig,
    problem_size: ProblemSizeFn<T>,
    use_first_alternative: bool,
    competitions: HashMap<ProblemSize, Competition>,
    /// Problem sizes in first-seen order, for stable reports
    order: Vec<ProblemSize>,
}

impl<T: Element> BestOf<T> {
    pub fn new(
        name: impl Into<String>,
        alternatives: Vec<(&str, Alternative<T>)>,
        config: BestOfConfig,
    ) -> Result<Self> {
        let pipelines = alternatives
            .into_iter()
            .map(|(name, kernel)| (name, vec![kernel]))
            .collect();
        BestOf::pipelines(name, pipelines, config)
    }

    /// Competes pipelines of kernels. Every pipeline must have the same
    /// number of stages.
    pub fn pipelines(
        name: impl Into<String>,
        alternatives: Vec<(&str, Vec<Alternative<T>>)>,
        config: BestOfConfig,
    ) -> Result<Self> {
        config.validate()?;
        let name = name.into();
        let Some(stages) = alternatives.first().map(|(_, stages)| stages.len()) else {
            return Err(LayoutError::InvalidConfig(
                "BestOf needs at least one alternative".to_string(),
            ));
        };
        if stages == 0 {
            return Err(LayoutError::InvalidConfig(format!(
                "{}: a pipeline needs at least one stage",
                name
            )));
        }
        if let Some((bad, kernels)) = alternatives.iter().find(|(_, k)| k.len() != stages) {
            return Err(LayoutError::InvalidConfig(format!(
                "{}: expected {} stages for '{}', got {}",
                name,
                stages,
                bad,
                kernels.len()
            )));
        }

        Ok(BestOf {
            name,
            alternatives: alternatives
                .into_iter()
                .map(|(name, kernels)| (name.to_string(), kernels))
                .collect(),
            stages,
            config,
            problem_size: io_size::<T>,
            use_first_alternative: false,
            competitions: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Replaces the default (input shape, output shape) key
    pub fn with_problem_size(mut self, problem_size: ProblemSizeFn<T>) -> Self {
        self.problem_size = problem_size;
        self
    }

    /// Competes the block-copy shrink against the naive one
    pub fn shrink(config: BestOfConfig) -> Result<Self> {
        BestOf::new(
            "Shrink methods",
            vec![
                ("block", shrink_block as Alternative<T>),
                ("naive", shrink_naive as Alternative<T>),
            ],
            config,
        )
    }

    /// Competes two-stage pad then shrink pipelines, keyed by
    /// (padded shape, unpadded shape)
    pub fn pad_shrink(config: BestOfConfig) -> Result<Self> {
        let pad_stage = pad as Alternative<T>;
        Ok(BestOf::pipelines(
            "Pad and shrink pipelines",
            vec![
                ("block", vec![pad_stage, shrink_block as Alternative<T>]),
                ("naive", vec![pad_stage, shrink_naive as Alternative<T>]),
            ],
            config,
        )?
        .with_problem_size(padded_size::<T>))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> usize {
        self.stages
    }

    pub fn alternative_names(&self) -> Vec<&str> {
        self.alternatives.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Always run the first alternative, turning the competition off
    pub fn use_first_alternative(&mut self, enabled: bool) {
        self.use_first_alternative = enabled;
    }

    /// Runs one alternative on the given buffers. Same as stage 0 of
    /// [`BestOf::call_stage`], which is the whole kernel when there is a
    /// single stage.
    ///
    /// Kernel errors are returned as-is and do not count as a timed run.
    pub fn call(&mut self, matrix_in: &Tensor4<T>, matrix_out: &mut Tensor4<T>) -> Result<()> {
        self.call_stage(0, matrix_in, matrix_out)
    }

    /// Runs `stage` of the current pipeline on the given buffers.
    ///
    /// The pipeline is timed and the competition advances only when the last
    /// stage runs after all earlier stages of the same alternative did.
    pub fn call_stage(
        &mut self,
        stage: usize,
        matrix_in: &Tensor4<T>,
        matrix_out: &mut Tensor4<T>,
    ) -> Result<()> {
        if stage >= self.stages {
            return Err(LayoutError::InvalidConfig(format!(
                "{}: stage {} out of range for {} stages",
                self.name, stage, self.stages
            )));
        }
        if self.use_first_alternative {
            return (self.alternatives[0].1[stage])(matrix_in, matrix_out);
        }

        let size = (self.problem_size)(matrix_in, matrix_out);
        let total = self.alternatives.len();
        let stages = self.stages;
        let order = &mut self.order;
        let competition = self.competitions.entry(size).or_insert_with(|| {
            order.push(size);
            Competition::new(total, stages)
        });
        competition.calls += 1;

        if let Some(best) = competition.best {
            return (self.alternatives[best].1[stage])(matrix_in, matrix_out);
        }

        let current = competition.current_alternative;
        let (alternative_name, kernels) = &self.alternatives[current];
        let start = Instant::now();
        kernels[stage](matrix_in, matrix_out)?;
        let elapsed = start.elapsed();
        competition.stage_times[stage] = Some(elapsed);
        trace!(
            "{}: {} stage {} on {} -> {} took {:?}",
            self.name,
            alternative_name,
            stage,
            size.0,
            size.1,
            elapsed
        );

        if stage + 1 < stages {
            return Ok(());
        }
        let pipeline_time: Option<Duration> = competition.stage_times.iter().copied().sum();
        competition.stage_times.fill(None);
        let Some(pipeline_time) = pipeline_time else {
            return Ok(());
        };
        competition.times[current].push(pipeline_time);

        let next = next_active(&competition.pruned, current);
        competition.current_alternative = next;
        if next <= current {
            competition.current_round += 1;
            let warm = self.config.prune_after_round.min(self.config.rounds);
            if competition.current_round >= warm {
                self.evaluate(size);
            }
        }

        Ok(())
    }
    /// Picks a winner or prunes slow alternatives at a round boundary
    fn evaluate(&mut self, size: ProblemSize) {
        let config = &self.config;
        let Some(competition) = self.competitions.get_mut(&size) else {
            return;
        };

        let medians = competition.medians();
        let Some((best_idx, min_time)) = medians
            .iter()
            .enumerate()
            .filter(|(i, _)| !competition.pruned[*i])
            .filter_map(|(i, m)| m.map(|m| (i, m)))
            .fold(None, |acc: Option<(usize, f64)>, (i, m)| match acc {
                Some((_, best)) if best <= m => acc,
                _ => Some((i, m)),
            })
        else {
            return;
        };

        let threshold = min_time * config.pruning_speedup;
        let contenders = medians
            .iter()
            .zip(&competition.pruned)
            .filter(|(m, pruned)| !**pruned && matches!(m, Some(m) if *m <= threshold))
            .count();

        if competition.current_round >= config.rounds || contenders == 1 {
            competition.best = Some(best_idx);
            debug!(
                "{}: {} wins for {} -> {} after {} rounds",
                self.name, self.alternatives[best_idx].0, size.0, size.1, competition.current_round
            );
            return;
        }

        for (i, m) in medians.iter().enumerate() {
            if !competition.pruned[i] && m.map_or(true, |m| m > threshold) {
                competition.pruned[i] = true;
                debug!(
                    "{}: pruning {} for {} -> {}",
                    self.name, self.alternatives[i].0, size.0, size.1
                );
            }
        }
        competition.current_alternative = first_active(&competition.pruned);
    }

    pub fn is_settled(&self, size: &ProblemSize) -> bool {
        self.competitions
            .get(size)
            .map_or(false, |competition| competition.best.is_some())
    }

    /// Name of the chosen alternative for `size`, once settled
    pub fn best_name(&self, size: &ProblemSize) -> Option<&str> {
        let best = self.competitions.get(size)?.best?;
        Some(self.alternatives[best].0.as_str())
    }

    pub fn medians(&self) -> Vec<(ProblemSize, Vec<Option<f64>>)> {
        self.order
            .iter()
            .filter_map(|size| Some((*size, self.competitions.get(size)?.medians())))
            .collect()
    }

    /// Slowest median over the chosen alternative's median, per settled size
    pub fn speedups(&self) -> Vec<(ProblemSize, f64)> {
        self.report()
            .into_iter()
            .filter_map(|row| Some((row.size, row.speedup?)))
            .collect()
    }

    /// Share of settled sizes won by each alternative, for example
    /// `block: 75% naive: 25% of 4 sizes`
    pub fn summary(&self) -> String {
        let mut wins = vec![0usize; self.alternatives.len()];
        for best in self.competitions.values().filter_map(|c| c.best) {
            wins[best] += 1;
        }
        let settled: usize = wins.iter().sum();

        let parts: Vec<String> = self
            .alternatives
            .iter()
            .zip(&wins)
            .map(|((name, _), &count)| {
                if settled == 0 {
                    format!("{}: ---", name)
                } else {
                    format!("{}: {:.0}%", name, count as f64 * 100.0 / settled as f64)
                }
            })
            .collect();
        format!("{} of {} sizes", parts.join(" "), settled)
    }

    /// Speedup over settled sizes, weighted by how often each size was called
    pub fn mean_speedup(&self) -> Option<f64> {
        let (weighted, calls) = self
            .report()
            .into_iter()
            .filter_map(|row| Some((row.speedup?, row.calls)))
            .fold((0.0, 0usize), |(weighted, total), (speedup, calls)| {
                (weighted + speedup * calls as f64, total + calls)
            });
        (calls > 0).then(|| weighted / calls as f64)
    }

    pub fn report(&self) -> Vec<BestOfRow> {
        self.medians()
            .into_iter()
            .map(|(size, medians)| {
                let competition = self.competitions.get(&size);
                let best = competition.and_then(|c| c.best);
                let calls = competition.map_or(0, |c| c.calls);
                let speedup = best.and_then(|best| {
                    let chosen = medians[best]?;
                    let slowest = medians.iter().flatten().copied().fold(chosen, f64::max);
                    (chosen > 0.0).then(|| slowest / chosen)
                });
                BestOfRow {
                    size,
                    calls,
                    medians,
                    best,
                    speedup,
                }
            })
            .collect()
    }
}

fn first_active(pruned: &[bool]) -> usize {
    pruned.iter().position(|p| !p).unwrap_or(0)
}

/// Next alternative after `current` that is still in the running, wrapping
/// around; `current` itself when it is the only one left
fn next_active(pruned: &[bool], current: usize) -> usize {
    let total = pruned.len();
    (1..=total)
        .map(|k| (current + k) % total)
        .find(|&i| !pruned[i])
        .unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::pad;
    use crate::test_utils::{assert_tensors_eq, random_tensor};
    use std::thread;

    fn slow_shrink(matrix_in: &Tensor4<f32>, matrix_out: &mut Tensor4<f32>) -> Result<()> {
        thread::sleep(Duration::from_millis(20));
        shrink_naive(matrix_in, matrix_out)
    }

    fn padded_pair(seed: u64) -> (Tensor4<f32>, Tensor4<f32>) {
        let original = random_tensor((2, 2, 4, 4), seed);
        let mut padded = Tensor4::zeros((2, 2, 6, 6));
        pad(&original, &mut padded).unwrap();
        (original, padded)
    }

    #[test]
    fn test_settles_on_fast_alternative() {
        let config = BestOfConfig {
            rounds: 10,
            pruning_speedup: 2.0,
            prune_after_round: 2,
        };
        let mut best_of = BestOf::new(
            "test",
            vec![("slow", slow_shrink as Alternative<f32>), ("block", shrink_block)],
            config,
        )
        .unwrap();

        let (original, padded) = padded_pair(1);
        let size = (padded.shape, original.shape);

        let mut calls = 0;
        while !best_of.is_settled(&size) {
            let mut output = Tensor4::zeros(original.shape);
            best_of.call(&padded, &mut output).unwrap();
            assert_tensors_eq(&output, &original);
            calls += 1;
            assert!(calls <= 20, "competition never settled");
        }

        assert_eq!(calls, 4);
        assert_eq!(best_of.best_name(&size), Some("block"));

        let speedups = best_of.speedups();
        assert_eq!(speedups.len(), 1);
        assert!(speedups[0].1 > 2.0);

        assert_eq!(best_of.report()[0].calls, 4);
        assert_eq!(best_of.summary(), "slow: 0% block: 100% of 1 sizes");
        assert_eq!(best_of.mean_speedup(), Some(speedups[0].1));
    }

    #[test]
    fn test_two_stage_pipeline_settles_on_faster_pipeline() {
        let config = BestOfConfig {
            rounds: 10,
            pruning_speedup: 2.0,
            prune_after_round: 2,
        };
        let pad_stage = pad as Alternative<f32>;
        let mut best_of = BestOf::pipelines(
            "pipelines",
            vec![
                ("slow", vec![pad_stage, slow_shrink]),
                ("block", vec![pad_stage, shrink_block]),
            ],
            config,
        )
        .unwrap()
        .with_problem_size(padded_size);
        assert_eq!(best_of.stages(), 2);

        let original = random_tensor((2, 3, 4, 5), 8);
        let size = (Shape4::new(2, 3, 6, 9), original.shape);

        let mut runs = 0;
        while !best_of.is_settled(&size) {
            let mut padded = Tensor4::full(size.0, f32::NAN);
            let mut output = Tensor4::zeros(original.shape);
            best_of.call_stage(0, &original, &mut padded).unwrap();
            best_of.call_stage(1, &padded, &mut output).unwrap();
            assert_tensors_eq(&output, &original);
            runs += 1;
            assert!(runs <= 20, "pipelines never settled");
        }

        assert_eq!(runs, 4);
        assert_eq!(best_of.best_name(&size), Some("block"));
        let report = best_of.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].calls, 8);
        assert!(report[0].speedup.unwrap() > 2.0);
    }

    #[test]
    fn test_pad_shrink_pipelines() {
        let config = BestOfConfig {
            rounds: 2,
            pruning_speedup: 1e9,
            prune_after_round: 2,
        };
        let mut best_of = BestOf::pad_shrink(config).unwrap();
        let original = random_tensor((1, 2, 3, 3), 9);
        let mut padded = Tensor4::zeros((1, 2, 5, 7));
        let size = (padded.shape, original.shape);

        for _ in 0..4 {
            let mut output = Tensor4::zeros(original.shape);
            best_of.call_stage(0, &original, &mut padded).unwrap();
            best_of.call_stage(1, &padded, &mut output).unwrap();
            assert_tensors_eq(&output, &original);
        }

        assert!(best_of.is_settled(&size));
        assert!(best_of.report()[0].medians.iter().all(Option::is_some));
    }

    #[test]
    fn test_incomplete_pipeline_is_not_timed() {
        let mut best_of = BestOf::pad_shrink(BestOfConfig::default()).unwrap();
        let (original, padded) = padded_pair(10);
        let mut output = Tensor4::zeros(original.shape);

        best_of.call_stage(1, &padded, &mut output).unwrap();
        assert_tensors_eq(&output, &original);
        let medians = best_of.medians();
        assert_eq!(medians.len(), 1);
        assert!(medians[0].1.iter().all(Option::is_none));

        let err = best_of.call_stage(2, &padded, &mut output).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_uneven_pipelines() {
        let result = BestOf::pipelines(
            "uneven",
            vec![
                ("one", vec![shrink_block as Alternative<f32>]),
                ("two", vec![shrink_block, shrink_naive]),
            ],
            BestOfConfig::default(),
        );
        assert!(matches!(result, Err(LayoutError::InvalidConfig(_))));

        let result =
            BestOf::<f32>::pipelines("empty", vec![("none", vec![])], BestOfConfig::default());
        assert!(matches!(result, Err(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn test_padded_size_ignores_direction() {
        let small = Tensor4::<f32>::zeros((1, 1, 2, 2));
        let big = Tensor4::<f32>::zeros((1, 1, 4, 2));
        let key = (big.shape, small.shape);
        assert_eq!(padded_size(&small, &big), key);
        assert_eq!(padded_size(&big, &small), key);
        assert_eq!(io_size(&small, &big), (small.shape, big.shape));
    }

    #[test]
    fn test_settles_after_all_rounds_when_close() {
        let config = BestOfConfig {
            rounds: 5,
            pruning_speedup: 1e9,
            prune_after_round: 4,
        };
        let mut best_of = BestOf::shrink(config).unwrap();
        let (original, padded) = padded_pair(2);
        let size = (padded.shape, original.shape);

        let mut calls = 0;
        while !best_of.is_settled(&size) {
            let mut output = Tensor4::zeros(original.shape);
            best_of.call(&padded, &mut output).unwrap();
            calls += 1;
            assert!(calls <= 20, "competition never settled");
        }

        assert_eq!(calls, 10);
        let report = best_of.report();
        assert_eq!(report.len(), 1);
        assert!(report[0].medians.iter().all(Option::is_some));
        assert!(report[0].best.is_some());
        assert!(report[0].speedup.unwrap() >= 1.0);
    }

    #[test]
    fn test_prunes_slow_alternative_before_settling() {
        let config = BestOfConfig {
            rounds: 3,
            pruning_speedup: 2.0,
            prune_after_round: 1,
        };
        let mut best_of = BestOf::new(
            "test",
            vec![
                ("slow", slow_shrink as Alternative<f32>),
                ("block", shrink_block),
                ("naive", shrink_naive),
            ],
            config,
        )
        .unwrap();
        let (original, padded) = padded_pair(3);
        let size = (padded.shape, original.shape);

        let mut calls = 0;
        while !best_of.is_settled(&size) {
            let mut output = Tensor4::zeros(original.shape);
            best_of.call(&padded, &mut output).unwrap();
            assert_tensors_eq(&output, &original);
            calls += 1;
            assert!(calls <= 30, "competition never settled");
        }

        assert_ne!(best_of.best_name(&size), Some("slow"));
        let medians = best_of.medians();
        assert_eq!(medians.len(), 1);
        assert!(medians[0].1[0].is_some());
    }

    #[test]
    fn test_problem_sizes_are_independent() {
        let mut best_of = BestOf::shrink(BestOfConfig::default()).unwrap();
        let (small, small_padded) = padded_pair(4);
        let big = random_tensor((1, 3, 8, 8), 5);
        let mut big_padded = Tensor4::zeros((1, 3, 12, 10));
        pad(&big, &mut big_padded).unwrap();

        let mut out_small = Tensor4::zeros(small.shape);
        let mut out_big = Tensor4::zeros(big.shape);
        best_of.call(&small_padded, &mut out_small).unwrap();
        best_of.call(&big_padded, &mut out_big).unwrap();

        assert_tensors_eq(&out_small, &small);
        assert_tensors_eq(&out_big, &big);
        let sizes: Vec<ProblemSize> = best_of.medians().into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            sizes,
            vec![
                (small_padded.shape, small.shape),
                (big_padded.shape, big.shape)
            ]
        );
    }

    #[test]
    fn test_use_first_alternative() {
        let mut best_of = BestOf::shrink(BestOfConfig::default()).unwrap();
        best_of.use_first_alternative(true);
        let (original, padded) = padded_pair(6);

        let mut output = Tensor4::zeros(original.shape);
        best_of.call(&padded, &mut output).unwrap();

        assert_tensors_eq(&output, &original);
        assert!(best_of.medians().is_empty());
    }

    #[test]
    fn test_errors_are_not_timed() {
        let mut best_of = BestOf::shrink(BestOfConfig::default()).unwrap();
        let input = random_tensor((1, 1, 4, 4), 7);
        let mut output = Tensor4::zeros((1, 1, 4, 4));

        let err = best_of.call(&input, &mut output).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidOperation { .. }));
        let medians = best_of.medians();
        assert!(medians[0].1.iter().all(Option::is_none));
    }

    #[test]
    fn test_rejects_empty_alternatives() {
        let result = BestOf::<f32>::new("empty", vec![], BestOfConfig::default());
        assert!(matches!(result, Err(LayoutError::InvalidConfig(_))));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        let times = [3, 1, 2].map(Duration::from_secs);
        assert_eq!(median(&times), Some(2.0));
        let times = [4, 1, 2, 3].map(Duration::from_secs);
        assert_eq!(median(&times), Some(2.5));
    }
}
