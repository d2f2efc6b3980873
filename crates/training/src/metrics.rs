//! Classification metrics.

use burn::prelude::*;

/// Fraction of samples whose highest-scoring class matches the label.
///
/// `output` holds per-class scores `[batch, num_classes]`; `targets` holds
/// integer labels `[batch]`. Pure reduction, no side effects. An empty batch
/// yields 0.0.
pub fn accuracy<B: Backend>(output: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f32 {
    let total = targets.dims()[0];
    if total == 0 {
        return 0.0;
    }
    // argmax(1) returns [batch, 1]; flatten before comparing with [batch].
    let preds = output.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = preds
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct as f32 / total as f32
}

#[cfg(test)]
mod tests {
    use super::accuracy;
    use burn::tensor::{Int, Tensor, TensorData};
    use burn_ndarray::NdArray;

    type B = NdArray<f32>;

    fn scores(rows: Vec<Vec<f32>>) -> Tensor<B, 2> {
        let cols = rows[0].len();
        let n = rows.len();
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let device = Default::default();
        Tensor::<B, 2>::from_data(TensorData::new(flat, [n, cols]), &device)
    }

    fn labels(vals: Vec<i64>) -> Tensor<B, 1, Int> {
        let n = vals.len();
        let device = Default::default();
        Tensor::<B, 1, Int>::from_data(TensorData::new(vals, [n]), &device)
    }

    #[test]
    fn all_matches_give_one() {
        let out = scores(vec![
            vec![0.1, 0.9, 0.0],
            vec![0.8, 0.1, 0.1],
            vec![0.0, 0.2, 0.7],
        ]);
        let acc = accuracy(out, labels(vec![1, 0, 2]));
        assert!((acc - 1.0).abs() < 1e-6);
    }

    #[test]
    fn no_matches_give_zero() {
        let out = scores(vec![vec![0.9, 0.1], vec![0.9, 0.1]]);
        let acc = accuracy(out, labels(vec![1, 1]));
        assert!(acc.abs() < 1e-6);
    }

    #[test]
    fn invariant_under_argmax_preserving_scaling() {
        let rows = vec![vec![0.2, 0.5, 0.3], vec![0.6, 0.1, 0.3]];
        let targets = vec![1i64, 0];
        let base = accuracy(scores(rows.clone()), labels(targets.clone()));
        let scaled = accuracy(scores(rows).mul_scalar(37.5), labels(targets));
        assert!((base - scaled).abs() < 1e-6);
    }

    #[test]
    fn partial_matches_give_fraction() {
        let out = scores(vec![
            vec![0.9, 0.1],
            vec![0.9, 0.1],
            vec![0.1, 0.9],
            vec![0.9, 0.1],
        ]);
        let acc = accuracy(out, labels(vec![0, 1, 1, 0]));
        assert!((acc - 0.75).abs() < 1e-6);
    }
}
