use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix2, Zip};

/// A structure to retain squared distances between each pair of distinct rows of a
/// (n_obs, nx) matrix, used to compute symmetric covariance matrices
#[derive(Debug)]
pub struct DistanceMatrix<F: Float> {
    /// Squared distances as a (n_obs * (n_obs-1))/2 vector
    pub d: Array1<F>,
    /// Indices (i, j) with i < j of the rows in the original data array
    pub d_indices: Array2<usize>,
    /// Number of observations
    pub n_obs: usize,
}

impl<F: Float> DistanceMatrix<F> {
    /// Compute squared distances given points given as an array (n_obs, nx)
    pub fn new(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> DistanceMatrix<F> {
        let (d, d_indices) = Self::_cross_sq_distances(x);
        let n_obs = x.nrows();

        DistanceMatrix {
            d,
            d_indices,
            n_obs,
        }
    }

    fn _cross_sq_distances(x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> (Array1<F>, Array2<usize>) {
        let n_obs = x.nrows();
        let n_pairs = n_obs * n_obs.saturating_sub(1) / 2;
        let mut indices = Array2::<usize>::zeros((n_pairs, 2));
        let mut d = Array1::zeros(n_pairs);
        let mut idx = 0;
        for k in 0..n_obs.saturating_sub(1) {
            let xk = x.row(k);
            for i in (k + 1)..n_obs {
                indices[[idx, 0]] = k;
                indices[[idx, 1]] = i;
                d[idx] = sq_distance(&xk, &x.row(i));
                idx += 1;
            }
        }

        (d, indices)
    }
}

/// Squared euclidean distance between two points
pub(crate) fn sq_distance<F: Float>(a: &ArrayView1<F>, b: &ArrayView1<F>) -> F {
    a.iter().zip(b.iter()).fold(F::zero(), |acc, (&ai, &bi)| {
        let diff = ai - bi;
        acc + diff * diff
    })
}

/// Computes squared euclidean distances between each row of x and each row of y
/// resulting in a 2d array of shape (nrows(x), nrows(y)).
/// Rows of the result are computed in parallel.
/// *Panics* if x and y have not the same column numbers
pub fn pairwise_sq_distances<F: Float>(
    x: &ArrayBase<impl Data<Elem = F>, Ix2>,
    y: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Array2<F> {
    assert!(x.ncols() == y.ncols());

    let y = y.view();
    let mut result = Array2::zeros((x.nrows(), y.nrows()));
    Zip::from(result.rows_mut())
        .and(x.rows())
        .par_for_each(|mut d_row, x_row| {
            Zip::from(&mut d_row)
                .and(y.rows())
                .for_each(|dij, y_row| *dij = sq_distance(&x_row, &y_row));
        });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_pairwise_sq_distances() {
        let x = array![[-0.9486833], [-0.82219219]];
        let y = array![
            [-1.26491106],
            [-0.63245553],
            [0.],
            [0.63245553],
            [1.26491106]
        ];
        assert_abs_diff_eq!(
            &array![
                [0.1, 0.1, 0.9, 2.5, 4.9],
                [0.196, 0.036, 0.676, 2.116, 4.356]
            ],
            &pairwise_sq_distances(&x, &y),
            epsilon = 1e-6
        )
    }

    #[test]
    fn test_pairwise_sq_distances_multidim() {
        let x = array![[0., 0.], [1., 2.]];
        let y = array![[3., 4.]];
        assert_eq!(array![[25.], [8.]], pairwise_sq_distances(&x, &y));
    }

    #[test]
    fn test_pairwise_sq_distances_empty() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = array![[3., 4.], [1., 1.]];
        assert_eq!(&[0, 2], pairwise_sq_distances(&x, &y).shape());
        assert_eq!(&[2, 0], pairwise_sq_distances(&y, &x).shape());
    }

    #[test]
    fn test_distance_matrix() {
        let xt = array![[0.5], [1.2], [2.0], [3.0], [4.0]];
        let expected = (
            array![0.49, 2.25, 6.25, 12.25, 0.64, 3.24, 7.84, 1., 4., 1.],
            array![
                [0, 1],
                [0, 2],
                [0, 3],
                [0, 4],
                [1, 2],
                [1, 3],
                [1, 4],
                [2, 3],
                [2, 4],
                [3, 4]
            ],
        );
        let dm = DistanceMatrix::new(&xt);
        assert_abs_diff_eq!(expected.0, dm.d, epsilon = 1e-12);
        assert_eq!(expected.1, dm.d_indices);
        assert_eq!(5, dm.n_obs);
    }

    #[test]
    fn test_distance_matrix_single_point() {
        let dm = DistanceMatrix::new(&array![[1., 2., 3.]]);
        assert_eq!(0, dm.d.len());
        assert_eq!(&[0, 2], dm.d_indices.shape());
    }
}
