//! Dictionary construction: the fixed atom set the pursuit selects from.
//!
//! Atoms are either drawn from the training samples (selection), created as
//! cluster centroids (creation), or supplied by the caller. Class-aware
//! modes size each class group independently; see [`GroupMode`].
//!
//! Built once per fit call. The orchestrator prunes unused atoms afterwards;
//! this module never mutates an existing dictionary.

use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::index::sample;

use crate::error::ConfigError;

/// How class structure influences atom counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupMode {
    /// Uniform over all samples, ignoring classes.
    Global,
    /// Equal atom count per class regardless of class size.
    Balanced,
    /// Atom count per class proportional to class frequency, minimum 1.
    ///
    /// Each group is floored independently, so the total may fall short of
    /// the naive global count by up to `n_groups - 1`.
    Stratified,
}

/// How atoms are produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DictionaryStrategy {
    /// Draw atoms from the training samples without replacement.
    Selection(GroupMode),
    /// Run k-means (globally or per class) and use centroids as atoms.
    ///
    /// Centroids are new points, not original samples.
    Creation { mode: GroupMode, max_iter: u32 },
}

impl Default for DictionaryStrategy {
    fn default() -> Self {
        DictionaryStrategy::Selection(GroupMode::Global)
    }
}

/// Dictionary configuration.
#[derive(Clone, Debug, Default)]
pub struct DictionaryParams {
    /// Atom count: a fraction of `n_samples` in (0, 1], an absolute count
    /// when > 1, or `None` for the full training set in original order.
    pub size: Option<f64>,

    /// Selection or creation strategy. Ignored when `init_components` is set.
    pub strategy: DictionaryStrategy,

    /// Caller-supplied atoms, bypassing selection and creation.
    pub init_components: Option<Array2<f64>>,
}

/// Resolve a fraction-or-count size against `n` available samples.
pub(crate) fn resolve_size(size: f64, n: usize) -> usize {
    if size > 0.0 && size <= 1.0 {
        (size * n as f64) as usize
    } else {
        size as usize
    }
}

/// Build the atom set for one fit call.
///
/// `labels` carries class indices for classification; class-aware modes
/// fail without them. The rng is the fit call's single seeded source.
pub(crate) fn build_dictionary(
    x: ArrayView2<'_, f64>,
    labels: Option<&[usize]>,
    params: &DictionaryParams,
    rng: &mut StdRng,
) -> Result<Array2<f64>, ConfigError> {
    if let Some(init) = &params.init_components {
        return Ok(init.clone());
    }

    let n_samples = x.nrows();
    let (count, fraction) = match params.size {
        None => (n_samples, 1.0),
        Some(size) => {
            if !size.is_finite() || size <= 0.0 {
                return Err(ConfigError::InvalidDictionarySize(size));
            }
            let count = resolve_size(size, n_samples);
            if count == 0 {
                return Err(ConfigError::InvalidDictionarySize(size));
            }
            // Keep the caller's fraction exact for stratified sizing;
            // re-deriving it from the floored count would floor twice.
            let fraction = if size <= 1.0 {
                size
            } else {
                count as f64 / n_samples as f64
            };
            (count, fraction)
        }
    };
    if count > n_samples {
        return Err(ConfigError::DictionaryExceedsSamples {
            requested: count,
            available: n_samples,
        });
    }

    match params.strategy {
        DictionaryStrategy::Selection(GroupMode::Global) => {
            if count == n_samples {
                return Ok(x.to_owned());
            }
            Ok(gather_rows(x, &sample(rng, n_samples, count).into_vec()))
        }
        DictionaryStrategy::Creation {
            mode: GroupMode::Global,
            max_iter,
        } => kmeans_centroids(x, count, max_iter, rng),
        DictionaryStrategy::Selection(mode) => {
            let groups = class_groups(labels, mode)?;
            let mut parts = Vec::with_capacity(groups.len());
            for group in &groups {
                let take = group_count(mode, count, fraction, group.len(), groups.len());
                if take > group.len() {
                    return Err(ConfigError::DictionaryExceedsSamples {
                        requested: take,
                        available: group.len(),
                    });
                }
                let picked: Vec<usize> = sample(rng, group.len(), take)
                    .into_iter()
                    .map(|i| group[i])
                    .collect();
                parts.push(gather_rows(x, &picked));
            }
            concat_rows(&parts, x.ncols())
        }
        DictionaryStrategy::Creation { mode, max_iter } => {
            let groups = class_groups(labels, mode)?;
            let mut parts = Vec::with_capacity(groups.len());
            for group in &groups {
                let take = group_count(mode, count, fraction, group.len(), groups.len());
                if take > group.len() {
                    return Err(ConfigError::DictionaryExceedsSamples {
                        requested: take,
                        available: group.len(),
                    });
                }
                let rows = gather_rows(x, group);
                parts.push(kmeans_centroids(rows.view(), take, max_iter, rng)?);
            }
            concat_rows(&parts, x.ncols())
        }
    }
}

/// Atom count for one class group.
///
/// Balanced splits the requested total evenly; stratified applies the
/// caller's fraction to the group size. Both floor, with a minimum of 1.
fn group_count(
    mode: GroupMode,
    total: usize,
    fraction: f64,
    group_size: usize,
    n_groups: usize,
) -> usize {
    match mode {
        GroupMode::Global => unreachable!("global mode has no groups"),
        GroupMode::Balanced => (total / n_groups).max(1),
        GroupMode::Stratified => ((fraction * group_size as f64) as usize).max(1),
    }
}

/// Sample indices per class, classes in ascending order.
fn class_groups(labels: Option<&[usize]>, mode: GroupMode) -> Result<Vec<Vec<usize>>, ConfigError> {
    let labels = labels.ok_or(ConfigError::GroupModeNeedsLabels { mode })?;
    let n_classes = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &c) in labels.iter().enumerate() {
        groups[c].push(i);
    }
    groups.retain(|g| !g.is_empty());
    Ok(groups)
}

fn gather_rows(x: ArrayView2<'_, f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

fn concat_rows(parts: &[Array2<f64>], n_cols: usize) -> Result<Array2<f64>, ConfigError> {
    let total: usize = parts.iter().map(|p| p.nrows()).sum();
    let mut out = Array2::zeros((total, n_cols));
    let mut row = 0;
    for part in parts {
        out.slice_mut(ndarray::s![row..row + part.nrows(), ..])
            .assign(part);
        row += part.nrows();
    }
    Ok(out)
}

/// Lloyd's k-means, seeded by sampling `k` distinct rows as initial centers.
///
/// Empty clusters keep their previous center.
fn kmeans_centroids(
    data: ArrayView2<'_, f64>,
    k: usize,
    max_iter: u32,
    rng: &mut StdRng,
) -> Result<Array2<f64>, ConfigError> {
    let n = data.nrows();
    let d = data.ncols();
    if k > n {
        return Err(ConfigError::DictionaryExceedsSamples {
            requested: k,
            available: n,
        });
    }

    let init: Vec<usize> = sample(rng, n, k).into_vec();
    let mut centers = gather_rows(data, &init);
    let mut assign = vec![0usize; n];

    for _ in 0..max_iter.max(1) {
        let mut changed = false;
        for i in 0..n {
            let mut best = 0usize;
            let mut best_d2 = f64::INFINITY;
            for c in 0..k {
                let mut d2 = 0.0;
                for j in 0..d {
                    let delta = data[[i, j]] - centers[[c, j]];
                    d2 += delta * delta;
                }
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = c;
                }
            }
            if assign[i] != best {
                assign[i] = best;
                changed = true;
            }
        }

        let mut sums = Array2::<f64>::zeros((k, d));
        let mut counts = vec![0usize; k];
        for i in 0..n {
            let c = assign[i];
            counts[c] += 1;
            for j in 0..d {
                sums[[c, j]] += data[[i, j]];
            }
        }
        for c in 0..k {
            if counts[c] == 0 {
                continue;
            }
            let inv = 1.0 / counts[c] as f64;
            for j in 0..d {
                centers[[c, j]] = sums[[c, j]] * inv;
            }
        }

        if !changed {
            break;
        }
    }

    Ok(centers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;

    fn grid(n: usize, d: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, d), |(i, j)| (i * d + j) as f64)
    }

    #[test]
    fn resolve_size_fraction_and_count() {
        assert_eq!(resolve_size(0.5, 200), 100);
        assert_eq!(resolve_size(1.0, 200), 200);
        assert_eq!(resolve_size(20.0, 200), 20);
    }

    #[test]
    fn full_dictionary_preserves_order() {
        let x = grid(5, 2);
        let mut rng = StdRng::seed_from_u64(0);
        let dict =
            build_dictionary(x.view(), None, &DictionaryParams::default(), &mut rng).unwrap();
        assert_eq!(dict, x);
    }

    #[test]
    fn global_selection_draws_without_replacement() {
        let x = grid(30, 2);
        let params = DictionaryParams {
            size: Some(10.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(7);
        let dict = build_dictionary(x.view(), None, &params, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 10);

        // Every atom is an original sample, and no sample appears twice.
        let mut seen = std::collections::HashSet::new();
        for atom in dict.rows() {
            let idx = (atom[0] / 2.0) as usize;
            assert_eq!(x.row(idx), atom);
            assert!(seen.insert(idx));
        }
    }

    #[test]
    fn selection_is_deterministic_for_fixed_seed() {
        let x = grid(50, 3);
        let params = DictionaryParams {
            size: Some(0.4),
            ..Default::default()
        };
        let a = build_dictionary(x.view(), None, &params, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = build_dictionary(x.view(), None, &params, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn balanced_selection_takes_equal_counts() {
        let x = grid(30, 2);
        // Classes of size 10, 20.
        let labels: Vec<usize> = (0..30).map(|i| usize::from(i >= 10)).collect();
        let params = DictionaryParams {
            size: Some(8.0),
            strategy: DictionaryStrategy::Selection(GroupMode::Balanced),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let dict = build_dictionary(x.view(), Some(&labels), &params, &mut rng).unwrap();
        // 8 / 2 = 4 atoms per class; class-0 atoms come first.
        assert_eq!(dict.nrows(), 8);
        assert!(dict.rows().into_iter().take(4).all(|r| r[0] < 20.0));
        assert!(dict.rows().into_iter().skip(4).all(|r| r[0] >= 20.0));
    }

    #[test]
    fn stratified_selection_floors_per_group() {
        // Class sizes 97, 97, 106; fraction 0.4.
        // Per-group floors: 38 + 38 + 42 = 118, vs a naive global 120.
        let n = 300;
        let x = grid(n, 2);
        let mut labels = vec![0usize; 97];
        labels.extend(vec![1usize; 97]);
        labels.extend(vec![2usize; 106]);
        let params = DictionaryParams {
            size: Some(0.4),
            strategy: DictionaryStrategy::Selection(GroupMode::Stratified),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let dict = build_dictionary(x.view(), Some(&labels), &params, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 118);

        let global = DictionaryParams {
            size: Some(0.4),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let dict = build_dictionary(x.view(), None, &global, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 120);
    }

    #[test]
    fn stratified_keeps_at_least_one_atom_per_class() {
        let x = grid(102, 2);
        // Tiny class of 2 samples: floor(0.05 * 2) = 0, clamped to 1.
        let mut labels = vec![0usize; 100];
        labels.extend(vec![1usize; 2]);
        let params = DictionaryParams {
            size: Some(0.05),
            strategy: DictionaryStrategy::Selection(GroupMode::Stratified),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let dict = build_dictionary(x.view(), Some(&labels), &params, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 5 + 1);
    }

    #[test]
    fn stratified_fraction_is_not_refloored() {
        // 102 samples, classes 50/52, fraction 0.1: per-group 5 + 5.
        // Re-deriving the fraction from the floored total (10/102) would
        // shrink the 50-sample group to 4.
        let x = grid(102, 2);
        let mut labels = vec![0usize; 50];
        labels.extend(vec![1usize; 52]);
        let params = DictionaryParams {
            size: Some(0.1),
            strategy: DictionaryStrategy::Selection(GroupMode::Stratified),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let dict = build_dictionary(x.view(), Some(&labels), &params, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 10);
    }

    #[test]
    fn degenerate_sizes_are_rejected() {
        let x = grid(10, 2);
        // Negative, zero, non-finite, and fractions resolving to zero atoms.
        for bad in [-1.0, 0.0, f64::NAN, f64::INFINITY, 0.05] {
            let params = DictionaryParams {
                size: Some(bad),
                ..Default::default()
            };
            let mut rng = StdRng::seed_from_u64(0);
            let err = build_dictionary(x.view(), None, &params, &mut rng);
            assert!(matches!(err, Err(ConfigError::InvalidDictionarySize(_))));
        }
    }

    #[test]
    fn creation_returns_centroids_not_samples() {
        // Two tight clusters far apart; centroids land between members.
        let mut x = Array2::zeros((20, 1));
        for i in 0..10 {
            x[[i, 0]] = i as f64 * 0.01;
        }
        for i in 10..20 {
            x[[i, 0]] = 100.0 + (i - 10) as f64 * 0.01;
        }
        let params = DictionaryParams {
            size: Some(2.0),
            strategy: DictionaryStrategy::Creation {
                mode: GroupMode::Global,
                max_iter: 50,
            },
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let dict = build_dictionary(x.view(), None, &params, &mut rng).unwrap();
        assert_eq!(dict.nrows(), 2);
        let mut centers: Vec<f64> = dict.column(0).to_vec();
        centers.sort_by(|a, b| a.total_cmp(b));
        assert!((centers[0] - 0.045).abs() < 0.05);
        assert!((centers[1] - 100.045).abs() < 0.05);
    }

    #[test]
    fn oversized_request_is_a_config_error() {
        let x = grid(10, 2);
        let params = DictionaryParams {
            size: Some(11.0),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let err = build_dictionary(x.view(), None, &params, &mut rng);
        assert!(matches!(
            err,
            Err(ConfigError::DictionaryExceedsSamples { .. })
        ));
    }

    #[test]
    fn init_components_bypass_selection() {
        let x = grid(10, 2);
        let atoms = grid(3, 2);
        let params = DictionaryParams {
            size: Some(5.0),
            init_components: Some(atoms.clone()),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let dict = build_dictionary(x.view(), None, &params, &mut rng).unwrap();
        assert_eq!(dict, atoms);
    }
}
