use crate::errors::{GpError, Result};
use crate::kernels::RbfKernel;
use crate::linalg;
use crate::parameters::{GpParams, GpValidParams};

use linfa::prelude::{DatasetBase, Fit, Float, PredictInplace};
use ndarray::{Array, Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_xoshiro::Xoshiro256Plus;

use log::{debug, warn};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Jitter added to the diagonal of the training covariance matrix
/// to keep it numerically invertible even for noiseless observations
pub const GP_JITTER: f64 = 1e-6;
/// Below this reciprocal condition estimate of the regularized covariance
/// a warning is logged (the fit still succeeds down to machine epsilon)
pub const GP_RCOND_WARNING: f64 = 1e-10;
/// Eigenvalues of the posterior covariance below this threshold are
/// considered null when sampling trajectories
pub const GP_SAMPLING_EIG_THRESHOLD: f64 = 1e-9;

/// Internal parameters computed Gp during training
/// used later on in prediction computations
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(deserialize = "F: Deserialize<'de>"))
)]
pub(crate) struct GpInnerParams<F: Float> {
    /// Training outputs minus the prior mean
    y_demeaned: Array1<F>,
    /// Kernel matrix of training inputs K(X, X)
    k_train: Array2<F>,
    /// Lower Cholesky factor of K(X, X) + (s^2 + jitter).I
    r_chol: Array2<F>,
    /// Gaussian Process weights (K(X, X) + (s^2 + jitter).I)^-1 . (y - m)
    alpha: Array1<F>,
}

/// Posterior predictive distribution of a [GaussianProcess] at a set of query points
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct GpPosterior<F: Float> {
    /// Posterior mean (m,)
    pub mean: Array1<F>,
    /// Posterior covariance (m, m), symmetric
    pub covariance: Array2<F>,
    /// Posterior variance (m,), the diagonal of `covariance`
    pub variance: Array1<F>,
}

impl<F: Float> GpPosterior<F> {
    fn empty() -> Self {
        GpPosterior {
            mean: Array1::zeros(0),
            covariance: Array2::zeros((0, 0)),
            variance: Array1::zeros(0),
        }
    }

    /// Number of query points
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Whether the posterior was computed for an empty set of query points
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

/// A GP regression is an interpolation method where the
/// interpolated values are modeled by a Gaussian process with a constant mean and
/// governed by a prior covariance kernel.
///
/// The interpolated output is modeled as stochastic process as follows:
///
/// `Y(x) = m + Z(x)`
///
/// where:
/// * `m` is the prior mean of the gaussian process, either given or taken as the mean of training outputs
/// * `Z(x)` the realization of a zero-mean gaussian process with covariance
///   `k(x, x') = v^2 * exp(-|x - x'|^2 / (2 * l^2))` (RBF kernel)
///
/// Observations are assumed corrupted by a gaussian noise of variance `s^2`.
///
/// # Implementation
///
/// * Based on [ndarray](https://github.com/rust-ndarray/ndarray)
///   and [linfa](https://github.com/rust-ml/linfa)
/// * Hyperparameters `v`, `l`, `s` and `m` are given, they are not estimated
/// * The regularized covariance `K(X, X) + (s^2 + jitter).I` is factorized once
///   using a Cholesky decomposition at training time, the jitter being [GP_JITTER].
/// * A fitted model is immutable: it can be shared between threads to make
///   concurrent predictions.
///
/// # Features
///
/// ## serializable
///
/// The `serializable` feature enables the serialization of GP models using the [`serde crate`](https://serde.rs/).
///
/// ## blas
///
/// The `blas` feature enables the use of BLAS/LAPACK linear algebra backend available with [`ndarray-linalg`](https://github.com/rust-ndarray/ndarray-linalg).
///
/// # Example
///
/// ```no_run
/// use rbf_gp::GaussianProcess;
/// use linfa::prelude::*;
/// use ndarray::{arr1, arr2, Array, Axis};
///
/// // training data
/// let xt = arr2(&[[0.0], [1.0], [2.0], [3.0], [4.0]]);
/// let yt = arr1(&[0.0, 1.0, 1.5, 0.9, 1.0]);
///
/// // GP with RBF kernel (v=1, l=0.5), small observation noise and
/// // prior mean taken as training outputs mean
/// let gp = GaussianProcess::params(1.0, 0.5)
///     .noise(Some(0.01))
///     .fit(&Dataset::new(xt, yt))
///     .expect("GP fitted");
///
/// // Use trained model for making predictions
/// let xtest = Array::linspace(0., 4., 26).insert_axis(Axis(1));
/// let posterior = gp.predict(&xtest).expect("GP prediction");
/// println!("mean = {}, variance = {}", posterior.mean, posterior.variance);
///```
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct GaussianProcess<F: Float> {
    /// Prior mean resolved at training time
    mean: F,
    /// Gaussian process internal fitted params
    inner_params: GpInnerParams<F>,
    /// Training dataset (input, output)
    pub(crate) training_data: (Array2<F>, Array1<F>),
    /// Parameters used to fit this model
    pub(crate) params: GpValidParams<F>,
}

impl<F: Float> fmt::Display for GaussianProcess<F> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let noise = match self.params.noise {
            Some(s) => format!("{s}"),
            None => "none".to_string(),
        };
        write!(
            f,
            "GP(kernel={}, mean={}, noise={})",
            self.params.kernel, self.mean, noise
        )
    }
}

impl<F: Float> GaussianProcess<F> {
    /// Gp parameters contructor given RBF kernel signal variance `v` and length scale `l`
    pub fn params(variance: F, length_scale: F) -> GpParams<F> {
        GpParams::new(variance, length_scale)
    }

    /// Predict the posterior distribution at m given `x` points of nx components specified as a (m, nx) matrix.
    /// Returns posterior mean (m,), covariance (m, m) and variance (m,).
    pub fn predict(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<GpPosterior<F>> {
        self.check_query(x)?;
        if x.nrows() == 0 {
            return Ok(GpPosterior::empty());
        }
        let now = Instant::now();
        let inners = &self.inner_params;
        let kernel = self.params.kernel();

        // cross covariance K(X, x) (n, m)
        let k_cross = kernel.value(&self.training_data.0, x);
        // prior covariance K(x, x) (m, m)
        let k_query = kernel.value_sym(x);

        let mean = k_cross.t().dot(&inners.alpha).mapv(|v| v + self.mean);

        // K(x, X).(K(X, X) + S)^-1.K(X, x) = V^t.V with V = L^-1.K(X, x)
        let v = linalg::solve_lower(&inners.r_chol, &k_cross)?;
        let cov = k_query - v.t().dot(&v);
        let half = F::cast(0.5);
        let covariance = (&cov + &cov.t()).mapv(|c| c * half);
        let variance = covariance.diag().to_owned();

        debug!(
            "GP prediction at {} points in {:?}",
            x.nrows(),
            now.elapsed()
        );
        Ok(GpPosterior {
            mean,
            covariance,
            variance,
        })
    }

    /// Predict posterior mean at m given `x` points of nx components specified as a (m, nx) matrix.
    /// Returns m scalar output values as a vector (m,).
    pub fn predict_mean(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_query(x)?;
        let k_cross = self.params.kernel().value(&self.training_data.0, x);
        Ok(k_cross
            .t()
            .dot(&self.inner_params.alpha)
            .mapv(|v| v + self.mean))
    }

    /// Predict posterior variance values at m given `x` points of nx components specified as a (m, nx) matrix.
    /// Returns m variance values as (m,) vector.
    ///
    /// Contrary to [GaussianProcess::predict], the full covariance matrix is not computed.
    pub fn predict_var(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<Array1<F>> {
        self.check_query(x)?;
        if x.nrows() == 0 {
            return Ok(Array1::zeros(0));
        }
        let kernel = self.params.kernel();
        let k_cross = kernel.value(&self.training_data.0, x);
        let v = linalg::solve_lower(&self.inner_params.r_chol, &k_cross)?;
        let amplitude = kernel.amplitude();
        Ok(v.mapv(|vi| vi * vi)
            .sum_axis(Axis(0))
            .mapv(|vv| amplitude - vv))
    }

    /// Sample the gaussian process posterior for `n_traj` trajectories at m given `x` points
    /// specified as a (m, nx) matrix. Returns a (m, n_traj) matrix.
    pub fn sample(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>, n_traj: usize) -> Result<Array2<F>> {
        let mut rng = Xoshiro256Plus::from_entropy();
        self.sample_with_rng(x, n_traj, &mut rng)
    }

    /// Sample the gaussian process posterior for `n_traj` trajectories using the given random generator.
    ///
    /// The posterior covariance is decomposed using its eigen values which is more robust
    /// than a cholesky decomposition as the covariance gets ill-conditioned when
    /// the number of x locations increases.
    pub fn sample_with_rng<R: Rng>(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        n_traj: usize,
        rng: &mut R,
    ) -> Result<Array2<F>> {
        let posterior = self.predict(x)?;
        if posterior.is_empty() {
            return Ok(Array2::zeros((0, n_traj)));
        }
        let n_eval = posterior.len();
        let (v, w) = linalg::eigh(posterior.covariance)?;
        let threshold = F::cast(GP_SAMPLING_EIG_THRESHOLD);
        let v = v.mapv(|ev| if ev < threshold { F::zero() } else { ev.sqrt() });
        let c = &w * &v;
        let ary = Array::random_using((n_eval, n_traj), StandardNormal, rng).mapv(|v: f64| F::cast(v));
        Ok(posterior.mean.insert_axis(Axis(1)) + c.dot(&ary))
    }

    /// RBF kernel of the model
    pub fn kernel(&self) -> &RbfKernel<F> {
        self.params.kernel()
    }

    /// Observation noise scale `s` if any
    pub fn noise(&self) -> Option<F> {
        self.params.noise()
    }

    /// Prior mean `m` used by the model (given one or mean of training outputs)
    pub fn prior_mean(&self) -> F {
        self.mean
    }

    /// Training inputs and outputs
    pub fn training_data(&self) -> &(Array2<F>, Array1<F>) {
        &self.training_data
    }

    /// Training outputs minus the prior mean
    pub fn demeaned_targets(&self) -> &Array1<F> {
        &self.inner_params.y_demeaned
    }

    /// Kernel matrix K(X, X) of training inputs (n, n)
    pub fn train_covariance(&self) -> &Array2<F> {
        &self.inner_params.k_train
    }

    /// Gaussian process weights `(K(X, X) + (s^2 + jitter).I)^-1 . (y - m)`
    pub fn alpha(&self) -> &Array1<F> {
        &self.inner_params.alpha
    }

    /// Inverse of the regularized training covariance `(K(X, X) + (s^2 + jitter).I)^-1`.
    /// Computed on demand from the Cholesky factor kept by the model.
    pub fn regularized_inverse(&self) -> Result<Array2<F>> {
        let r_chol = &self.inner_params.r_chol;
        let z = linalg::solve_lower(r_chol, &Array2::eye(r_chol.nrows()))?;
        linalg::solve_lower_t(r_chol, &z)
    }

    /// Retrieve input and output dimensions
    pub fn dims(&self) -> (usize, usize) {
        (self.training_data.0.ncols(), 1)
    }

    fn check_query(&self, x: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Result<()> {
        if x.ncols() != self.training_data.0.ncols() {
            return Err(GpError::DimensionError(format!(
                "Query points have {} components, expected {} as training inputs",
                x.ncols(),
                self.training_data.0.ncols()
            )));
        }
        Ok(())
    }
}

impl<F: Float> GpValidParams<F> {
    /// Train a GP given inputs `x` as a (n, nx) matrix and outputs `y` as a (n,) vector
    pub fn train(
        &self,
        x: &ArrayBase<impl Data<Elem = F>, Ix2>,
        y: &ArrayBase<impl Data<Elem = F>, Ix1>,
    ) -> Result<GaussianProcess<F>> {
        if x.nrows() == 0 {
            return Err(GpError::DimensionError(
                "At least one training point is required".to_string(),
            ));
        }
        if x.nrows() != y.len() {
            return Err(GpError::DimensionError(format!(
                "Training inputs have {} rows while training outputs have {} values",
                x.nrows(),
                y.len()
            )));
        }
        let now = Instant::now();
        let n_obs = x.nrows();

        let mean = match self.prior_mean() {
            Some(m) => m,
            None => y.sum() / F::cast(n_obs),
        };
        let y_demeaned = y.mapv(|v| v - mean);

        let k_train = self.kernel().value_sym(x);
        let s = self.noise().unwrap_or_else(F::zero);
        let reg = s * s + F::cast(GP_JITTER);
        let mut k_reg = k_train.to_owned();
        k_reg.diag_mut().mapv_inplace(|v| v + reg);

        let r_chol = linalg::cholesky(&k_reg)?;
        check_conditioning(&r_chol, k_reg)?;

        let z = linalg::solve_lower(&r_chol, &y_demeaned.view().insert_axis(Axis(1)))?;
        let alpha = linalg::solve_lower_t(&r_chol, &z)?.remove_axis(Axis(1));
        if alpha.iter().any(|v| !v.is_finite()) {
            return Err(GpError::SingularMatrixError(
                "Non finite GP weights from regularized covariance".to_string(),
            ));
        }

        debug!(
            "GP trained on {} points of dim {} (mean={}) in {:?}",
            n_obs,
            x.ncols(),
            mean,
            now.elapsed()
        );
        Ok(GaussianProcess {
            mean,
            inner_params: GpInnerParams {
                y_demeaned,
                k_train,
                r_chol,
                alpha,
            },
            training_data: (x.to_owned(), y.to_owned()),
            params: self.clone(),
        })
    }
}

/// Check the regularized covariance is usable: finite Cholesky factor and
/// reciprocal condition number `lambda_min / lambda_max` above machine epsilon.
fn check_conditioning<F: Float>(r_chol: &Array2<F>, k_reg: Array2<F>) -> Result<()> {
    if r_chol.iter().any(|v| !v.is_finite()) {
        return Err(GpError::SingularMatrixError(
            "Non finite values in regularized covariance factorization".to_string(),
        ));
    }
    let (eigvals, _) = linalg::eigh(k_reg)?;
    let lmin = *eigvals
        .min()
        .map_err(|e| GpError::SingularMatrixError(e.to_string()))?;
    let lmax = *eigvals
        .max()
        .map_err(|e| GpError::SingularMatrixError(e.to_string()))?;
    let rcond = lmin / lmax;
    if !(rcond > F::epsilon()) {
        return Err(GpError::SingularMatrixError(format!(
            "Regularized covariance is too ill conditioned (rcond={rcond})"
        )));
    }
    if rcond < F::cast(GP_RCOND_WARNING) {
        warn!("Regularized covariance is ill conditioned (rcond={rcond}), check length scale wrt training points spacing");
    }
    Ok(())
}

impl<F: Float, D: Data<Elem = F>> Fit<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>, GpError>
    for GpValidParams<F>
{
    type Object = GaussianProcess<F>;

    /// Fit GP with given hyperparameters
    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, ArrayBase<D, Ix1>>,
    ) -> Result<Self::Object> {
        self.train(dataset.records(), dataset.targets())
    }
}

impl<F, D> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for GaussianProcess<F>
where
    F: Float,
    D: Data<Elem = F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.predict_mean(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros((x.nrows(),))
    }
}

/// Gausssian Process adaptator to implement `linfa::Predict` trait for variance prediction.
pub struct GpVariancePredictor<'a, F>(pub &'a GaussianProcess<F>)
where
    F: Float;

impl<F, D> PredictInplace<ArrayBase<D, Ix2>, Array1<F>> for GpVariancePredictor<'_, F>
where
    F: Float,
    D: Data<Elem = F>,
{
    fn predict_inplace(&self, x: &ArrayBase<D, Ix2>, y: &mut Array1<F>) {
        assert_eq!(
            x.nrows(),
            y.len(),
            "The number of data points must match the number of output targets."
        );

        let values = self.0.predict_var(x).expect("GP Prediction");
        *y = values;
    }

    fn default_target(&self, x: &ArrayBase<D, Ix2>) -> Array1<F> {
        Array1::zeros(x.nrows())
    }
}
