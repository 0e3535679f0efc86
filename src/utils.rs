//! Parallelism plumbing shared across the crate.
//!
//! Per-output pursuits are embarrassingly parallel: they share read-only
//! kernel data and own their state exclusively. Components never build
//! thread pools themselves; they receive a [`Parallelism`] flag and the
//! pool is set up once at the API boundary via [`run_with_threads`].

use rayon::prelude::*;

/// Whether parallel execution is allowed.
///
/// When `Parallel`, components may use `rayon` parallel iterators; when
/// `Sequential`, they must iterate in order. Numerical results are identical
/// either way: pursuits never share mutable state and checkpoint aggregation
/// happens at a sequential barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel unless the current rayon pool is single-threaded)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map over independent work items, in parallel when allowed.
    ///
    /// Output order matches input order in both modes.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use all available cores)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build()
                .expect("Failed to create thread pool");
            pool.install(|| f(Parallelism::Parallel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallelism_from_threads() {
        assert!(!Parallelism::from_threads(1).is_parallel());
        assert!(Parallelism::from_threads(2).is_parallel());
        // Auto mode follows the ambient pool, which may be single-threaded.
        assert_eq!(
            Parallelism::from_threads(0).is_parallel(),
            rayon::current_num_threads() > 1
        );
    }

    #[test]
    fn maybe_par_map_preserves_order() {
        let seq: Vec<_> = Parallelism::Sequential.maybe_par_map(0..8usize, |i| i * i);
        let par: Vec<_> = Parallelism::Parallel.maybe_par_map(0..8usize, |i| i * i);
        assert_eq!(seq, par);
        assert_eq!(seq, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn run_with_threads_explicit() {
        let n = run_with_threads(2, |_| rayon::current_num_threads());
        assert_eq!(n, 2);
    }
}
