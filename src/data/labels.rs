//! One-vs-rest label binarization.

use ndarray::{Array2, ArrayView2};

/// Maps class labels to one-vs-rest 0/1 target columns and back.
///
/// Classes are remembered in ascending order. Binary problems collapse to a
/// single column whose positive class is the larger label, with a 0.5
/// decision threshold on the way back; multiclass decisions invert by
/// argmax over the per-class columns.
#[derive(Clone, Debug)]
pub struct LabelBinarizer {
    classes: Vec<i64>,
}

impl LabelBinarizer {
    /// Learn the class set from training labels.
    pub fn fit(labels: &[i64]) -> Self {
        let mut classes: Vec<i64> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    /// Distinct classes in ascending order.
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Number of pursuit outputs: one per class, collapsed to 1 for binary.
    pub fn n_outputs(&self) -> usize {
        if self.classes.len() <= 2 {
            1
        } else {
            self.classes.len()
        }
    }

    /// Position of each label in the class set.
    ///
    /// Labels unseen at fit map to `usize::MAX` and never match a predicted
    /// class, so they score as errors rather than panicking.
    pub fn class_indices(&self, labels: &[i64]) -> Vec<usize> {
        labels
            .iter()
            .map(|l| self.classes.binary_search(l).unwrap_or(usize::MAX))
            .collect()
    }

    /// Binarize labels into an output-major 0/1 target matrix
    /// `[n_outputs, n_samples]`.
    pub fn transform(&self, labels: &[i64]) -> Array2<f64> {
        let n = labels.len();
        let mut targets = Array2::zeros((self.n_outputs(), n));
        if self.classes.len() <= 2 {
            if let Some(&positive) = self.classes.last() {
                for (i, &l) in labels.iter().enumerate() {
                    if l == positive {
                        targets[[0, i]] = 1.0;
                    }
                }
            }
        } else {
            for (i, &l) in labels.iter().enumerate() {
                if let Ok(c) = self.classes.binary_search(&l) {
                    targets[[c, i]] = 1.0;
                }
            }
        }
        targets
    }

    /// Invert decision values `[n_outputs, n_samples]` back to labels.
    pub fn inverse_transform(&self, decisions: ArrayView2<'_, f64>) -> Vec<i64> {
        let n = decisions.ncols();
        let mut labels = Vec::with_capacity(n);
        if self.classes.len() <= 2 {
            let (negative, positive) = match self.classes.as_slice() {
                [] => return labels,
                [only] => (*only, *only),
                [first, .., last] => (*first, *last),
            };
            for i in 0..n {
                labels.push(if decisions[[0, i]] > 0.5 { positive } else { negative });
            }
        } else {
            for i in 0..n {
                let col = decisions.column(i);
                let mut best = 0usize;
                let mut best_val = f64::NEG_INFINITY;
                for (c, &v) in col.iter().enumerate() {
                    if v > best_val {
                        best_val = v;
                        best = c;
                    }
                }
                labels.push(self.classes[best]);
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn binary_collapses_to_one_column() {
        let lb = LabelBinarizer::fit(&[1, 0, 1, 1]);
        assert_eq!(lb.classes(), &[0, 1]);
        assert_eq!(lb.n_outputs(), 1);
        let t = lb.transform(&[1, 0, 1, 1]);
        assert_eq!(t, array![[1.0, 0.0, 1.0, 1.0]]);
    }

    #[test]
    fn binary_inverse_uses_half_threshold() {
        let lb = LabelBinarizer::fit(&[-1, 1]);
        let d = array![[0.49, 0.51, -3.0]];
        assert_eq!(lb.inverse_transform(d.view()), vec![-1, 1, -1]);
    }

    #[test]
    fn multiclass_one_hot_and_argmax_round_trip() {
        let labels = vec![2, 0, 1, 2];
        let lb = LabelBinarizer::fit(&labels);
        assert_eq!(lb.n_outputs(), 3);
        let t = lb.transform(&labels);
        assert_eq!(
            t,
            array![
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [1.0, 0.0, 0.0, 1.0]
            ]
        );
        assert_eq!(lb.inverse_transform(t.view()), labels);
    }

    #[test]
    fn unseen_labels_never_match() {
        let lb = LabelBinarizer::fit(&[0, 1, 2]);
        let idx = lb.class_indices(&[0, 7]);
        assert_eq!(idx[0], 0);
        assert_eq!(idx[1], usize::MAX);
    }
}
