use crate::kernels::pad;
use crate::{BestOf, ProfileSettings, Result, Shape4, Tensor4};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};

/// Spatial input of one convolution layer
#[derive(Debug, Clone, Copy)]
pub struct LayerShape {
    pub name: &'static str,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

/// Inputs of the AlexNet convolution layers
pub const ALEXNET_LAYERS: [LayerShape; 5] = [
    LayerShape {
        name: "conv1",
        channels: 3,
        height: 224,
        width: 224,
    },
    LayerShape {
        name: "conv2",
        channels: 96,
        height: 27,
        width: 27,
    },
    LayerShape {
        name: "conv3",
        channels: 256,
        height: 13,
        width: 13,
    },
    LayerShape {
        name: "conv4",
        channels: 384,
        height: 13,
        width: 13,
    },
    LayerShape {
        name: "conv5",
        channels: 384,
        height: 13,
        width: 13,
    },
];

/// Tunes two [`BestOf`]s over every layer: the shrink kernels alone on a
/// padded random input, and whole pad then shrink pipelines. Each keeps
/// being called until its problem size has settled on a kernel.
///
/// All kernels run inside a pool built from `settings.parallel`.
pub fn run_profile(settings: &ProfileSettings, layers: &[LayerShape]) -> Result<Vec<BestOf<f32>>> {
    let pool = settings.parallel.build_pool()?;
    let mut shrink_tuner = BestOf::shrink(settings.best_of.clone())?;
    let mut pipeline_tuner = BestOf::pad_shrink(settings.best_of.clone())?;
    shrink_tuner.use_first_alternative(settings.first_only);
    pipeline_tuner.use_first_alternative(settings.first_only);

    let max_calls = settings.best_of.rounds * shrink_tuner.alternative_names().len();
    let mut rng = StdRng::seed_from_u64(settings.seed);

    for layer in layers {
        let shape = Shape4::new(settings.batch, layer.channels, layer.height, layer.width);
        let padded_shape = Shape4::new(
            shape.n,
            shape.c,
            shape.h + 2 * settings.vpadding,
            shape.w + 2 * settings.hpadding,
        );
        info!("profiling {}: {} -> {}", layer.name, shape, padded_shape);

        let input = Tensor4::randn(shape, &mut rng);
        let mut padded = Tensor4::zeros(padded_shape);
        let mut shrunk = Tensor4::zeros(shape);
        let size = (padded_shape, shape);

        pool.install(|| pad(&input, &mut padded))?;
        for _ in 0..max_calls {
            if shrink_tuner.is_settled(&size) {
                break;
            }
            pool.install(|| shrink_tuner.call(&padded, &mut shrunk))?;
            if settings.first_only {
                break;
            }
        }
        if shrunk != input {
            warn!("{}: shrink did not restore the original input", layer.name);
        }

        for _ in 0..max_calls {
            if pipeline_tuner.is_settled(&size) {
                break;
            }
            pool.install(|| -> Result<()> {
                pipeline_tuner.call_stage(0, &input, &mut padded)?;
                pipeline_tuner.call_stage(1, &padded, &mut shrunk)
            })?;
            if settings.first_only {
                break;
            }
        }
        if shrunk != input {
            warn!("{}: pad and shrink did not restore the original input", layer.name);
        }
    }

    Ok(vec![shrink_tuner, pipeline_tuner])
}

/// Renders a [`BestOf`] report as a plain text table, times in milliseconds.
/// The chosen alternative is marked with `*`.
pub fn format_report(best_of: &BestOf<f32>) -> String {
    let header: String = best_of
        .alternative_names()
        .iter()
        .map(|name| format!("{:>12}", name))
        .collect();
    let mut lines = vec![
        best_of.name().to_string(),
        format!("{:<40}{:>8}{}{:>10}", "size", "count", header, "speedup"),
    ];

    for row in best_of.report() {
        let cells: String = row
            .medians
            .iter()
            .enumerate()
            .map(|(i, median)| {
                let cell = match median {
                    Some(secs) if row.best == Some(i) => format!("*{:.4}", secs * 1e3),
                    Some(secs) => format!("{:.4}", secs * 1e3),
                    None => "---".to_string(),
                };
                format!("{:>12}", cell)
            })
            .collect();
        let speedup = row.speedup.map_or_else(String::new, |s| format!("{:.1}", s));
        let size = format!("{} -> {}", row.size.0, row.size.1);
        lines.push(format!("{:<40}{:>8}{}{:>10}", size, row.calls, cells, speedup));
    }

    let mut summary = best_of.summary();
    if let Some(speedup) = best_of.mean_speedup() {
        summary.push_str(&format!(", mean speedup {:.1}", speedup));
    }
    lines.push(summary);

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BestOfConfig, ParallelConfig};

    fn settings(first_only: bool) -> ProfileSettings {
        ProfileSettings {
            batch: 2,
            vpadding: 1,
            hpadding: 2,
            seed: 3,
            first_only,
            parallel: ParallelConfig {
                num_threads: Some(2),
            },
            best_of: BestOfConfig {
                rounds: 3,
                pruning_speedup: 1e9,
                prune_after_round: 1,
            },
        }
    }

    const SMALL_LAYERS: [LayerShape; 2] = [
        LayerShape {
            name: "a",
            channels: 2,
            height: 8,
            width: 5,
        },
        LayerShape {
            name: "b",
            channels: 3,
            height: 5,
            width: 5,
        },
    ];

    #[test]
    fn test_run_profile_settles_every_size() {
        let tuners = run_profile(&settings(false), &SMALL_LAYERS).unwrap();
        assert_eq!(tuners.len(), 2);

        for best_of in &tuners {
            let report = best_of.report();
            assert_eq!(report.len(), 2);
            assert!(report.iter().all(|row| row.best.is_some()));
            assert_eq!(report[0].size.1, Shape4::new(2, 2, 8, 5));
            assert_eq!(report[0].size.0, Shape4::new(2, 2, 10, 9));
        }
        assert_eq!(tuners[0].report()[0].calls, 6);
        assert_eq!(tuners[1].report()[0].calls, 12);

        let table = format_report(&tuners[0]);
        assert!(table.starts_with("Shrink methods\n"));
        assert!(table.contains("(2, 2, 10, 9) -> (2, 2, 8, 5)"));
        assert_eq!(table.matches('*').count(), 2);
        assert!(table.contains("of 2 sizes"));
        assert!(table.ends_with('\n'));

        let table = format_report(&tuners[1]);
        assert!(table.starts_with("Pad and shrink pipelines\n"));
        assert_eq!(table.matches('*').count(), 2);
    }

    #[test]
    fn test_run_profile_first_only() {
        let tuners = run_profile(&settings(true), &SMALL_LAYERS).unwrap();
        assert!(tuners.iter().all(|best_of| best_of.report().is_empty()));

        let table = format_report(&tuners[0]);
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("block: --- naive: --- of 0 sizes"));
    }
}
