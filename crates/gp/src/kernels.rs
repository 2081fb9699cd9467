//! A module for the radial basis function (RBF) kernel used as prior covariance of the GP model.
//!
//! The kernel value between two points `x` and `x'` is:
//!
//! `k(x, x') = v^2 * exp( - |x - x'|^2 / (2 * l^2) )`
//!
//! where `v` is the signal variance parameter and `l` the length scale.

use crate::utils::{pairwise_sq_distances, DistanceMatrix};
use linfa::Float;
use ndarray::{Array2, ArrayBase, Data, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Radial basis function (a.k.a. squared exponential) kernel
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct RbfKernel<F: Float> {
    /// Signal variance parameter `v`, the kernel amplitude is `v^2`
    variance: F,
    /// Length scale `l`
    length_scale: F,
}

impl<F: Float> Default for RbfKernel<F> {
    fn default() -> Self {
        RbfKernel {
            variance: F::one(),
            length_scale: F::one(),
        }
    }
}

impl<F: Float> RbfKernel<F> {
    /// Constructor, no validation is done here:
    /// parameters are checked when building GP parameters.
    pub fn new(variance: F, length_scale: F) -> Self {
        RbfKernel {
            variance,
            length_scale,
        }
    }

    /// Signal variance parameter `v`
    pub fn variance(&self) -> F {
        self.variance
    }

    /// Length scale `l`
    pub fn length_scale(&self) -> F {
        self.length_scale
    }

    /// Kernel value `k(x, x)` of any point with itself, that is `v^2`
    pub fn amplitude(&self) -> F {
        self.variance * self.variance
    }

    /// Compute the kernel matrix between `a` (p, d) and `b` (q, d) points.
    /// Returns a (p, q) matrix.
    ///
    /// *Panics* if `a` and `b` have not the same number of columns
    pub fn value(
        &self,
        a: &ArrayBase<impl Data<Elem = F>, Ix2>,
        b: &ArrayBase<impl Data<Elem = F>, Ix2>,
    ) -> Array2<F> {
        let mut k = pairwise_sq_distances(a, b);
        let (amplitude, scale) = (self.amplitude(), self.scale());
        k.par_mapv_inplace(|d| amplitude * (d * scale).exp());
        k
    }

    /// Compute the symmetric kernel matrix of `a` (p, d) points with themselves.
    /// Only the strict upper triangle is evaluated then mirrored, the result is
    /// identical to `self.value(a, a)`.
    pub fn value_sym(&self, a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Array2<F> {
        let distances = DistanceMatrix::new(a);
        let amplitude = self.amplitude();
        let scale = self.scale();
        let mut k = Array2::<F>::eye(distances.n_obs).mapv(|v| v * amplitude);
        for (ij, d) in distances.d_indices.outer_iter().zip(distances.d.iter()) {
            let kij = amplitude * (*d * scale).exp();
            k[[ij[0], ij[1]]] = kij;
            k[[ij[1], ij[0]]] = kij;
        }
        k
    }

    /// Factor applied to squared distances inside the exponential
    fn scale(&self) -> F {
        F::cast(-0.5) / (self.length_scale * self.length_scale)
    }
}

impl<F: Float> fmt::Display for RbfKernel<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "RBF(variance={}, length_scale={})",
            self.variance, self.length_scale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_rbf_value() {
        let kernel = RbfKernel::new(2., 0.5);
        let a = array![[0., 0.], [1., 0.]];
        let b = array![[0., 1.], [1., 1.], [3., 0.]];
        let k = kernel.value(&a, &b);
        assert_eq!(&[2, 3], k.shape());
        // |a0 - b0|^2 = 1, exp(-1 / (2 * 0.25)) = exp(-2)
        let expected = array![
            [4. * f64::exp(-2.), 4. * f64::exp(-4.), 4. * f64::exp(-18.)],
            [4. * f64::exp(-4.), 4. * f64::exp(-2.), 4. * f64::exp(-8.)]
        ];
        assert_abs_diff_eq!(expected, k, epsilon = 1e-12);
    }

    #[test]
    fn test_rbf_amplitude_on_diagonal() {
        let kernel = RbfKernel::new(1.5, 3.);
        let a = array![[0.3], [-1.2], [7.0]];
        let k = kernel.value(&a, &a);
        for i in 0..3 {
            assert_eq!(2.25, k[[i, i]]);
        }
    }

    #[test]
    fn test_rbf_symmetric() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let a = Array::random_using((20, 3), Uniform::new(-5., 5.), &mut rng);
        let kernel = RbfKernel::new(1.3, 0.7);
        let k = kernel.value(&a, &a);
        for i in 0..20 {
            for j in 0..20 {
                assert_eq!(k[[i, j]], k[[j, i]]);
            }
        }
    }

    #[test]
    fn test_rbf_sym_fast_path() {
        let mut rng = Xoshiro256Plus::seed_from_u64(0);
        let a = Array::random_using((15, 4), Uniform::new(-2., 2.), &mut rng);
        let kernel = RbfKernel::new(0.8, 1.9);
        assert_eq!(kernel.value(&a, &a), kernel.value_sym(&a));
    }

    #[test]
    fn test_rbf_cross_swap() {
        let mut rng = Xoshiro256Plus::seed_from_u64(7);
        let a = Array::random_using((6, 2), Uniform::new(0., 10.), &mut rng);
        let b = Array::random_using((9, 2), Uniform::new(0., 10.), &mut rng);
        let kernel = RbfKernel::new(1., 2.);
        let kab = kernel.value(&a, &b);
        let kba = kernel.value(&b, &a);
        assert_eq!(kab, kba.t());
    }

    #[test]
    fn test_rbf_empty_inputs() {
        let kernel = RbfKernel::<f64>::default();
        let a = Array2::<f64>::zeros((0, 2));
        let b = array![[1., 2.], [3., 4.], [5., 6.]];
        assert_eq!(&[0, 3], kernel.value(&a, &b).shape());
        assert_eq!(&[3, 0], kernel.value(&b, &a).shape());
        assert_eq!(&[0, 0], kernel.value_sym(&a).shape());
    }

    #[test]
    fn test_rbf_deterministic() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let a = Array::random_using((50, 2), Uniform::new(-1., 1.), &mut rng);
        let kernel = RbfKernel::new(1., 0.3);
        assert_eq!(kernel.value(&a, &a), kernel.value(&a, &a));
    }

    #[test]
    fn test_rbf_display() {
        let kernel = RbfKernel::new(1., 0.5);
        assert_eq!("RBF(variance=1, length_scale=0.5)", kernel.to_string());
    }
}
