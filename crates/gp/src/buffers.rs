//! Flat buffers interface to GP regression.
//!
//! Host environments (foreign bindings, WebAssembly, ...) usually exchange matrices
//! as flat row-major buffers of numbers along with explicit row and column counts.
//! This module converts such buffers to and from [ndarray] matrices, and provides
//! the one-shot [regress] call: train a GP and predict at query points.

use crate::algorithm::GaussianProcess;
use crate::errors::{GpError, Result};
use crate::parameters::GpParams;
use linfa::{Float, ParamGuard};
use ndarray::{Array2, ArrayBase, Axis, Data, Ix1, Ix2};
#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A (rows, cols) matrix stored as a flat row-major buffer
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(
        try_from = "RawMatrixBuffer<F>",
        bound(deserialize = "F: Deserialize<'de>")
    )
)]
pub struct MatrixBuffer<F: Float> {
    data: Vec<F>,
    rows: usize,
    cols: usize,
}

/// Unchecked serialized form of [MatrixBuffer]
#[cfg(feature = "serializable")]
#[derive(Deserialize)]
struct RawMatrixBuffer<F> {
    data: Vec<F>,
    rows: usize,
    cols: usize,
}

#[cfg(feature = "serializable")]
impl<F: Float> TryFrom<RawMatrixBuffer<F>> for MatrixBuffer<F> {
    type Error = GpError;

    fn try_from(raw: RawMatrixBuffer<F>) -> Result<Self> {
        MatrixBuffer::new(raw.data, raw.rows, raw.cols)
    }
}

impl<F: Float> MatrixBuffer<F> {
    /// Constructor checking that the buffer length is `rows * cols`
    pub fn new(data: Vec<F>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(GpError::DimensionError(format!(
                "Buffer of length {} cannot hold a ({rows}, {cols}) matrix",
                data.len()
            )));
        }
        Ok(MatrixBuffer { data, rows, cols })
    }

    /// Serialize a matrix in row-major order
    pub fn from_array(a: &ArrayBase<impl Data<Elem = F>, Ix2>) -> Self {
        MatrixBuffer {
            data: a.iter().cloned().collect(),
            rows: a.nrows(),
            cols: a.ncols(),
        }
    }

    /// Serialize a vector as a (n, 1) column matrix
    pub fn from_vector(v: &ArrayBase<impl Data<Elem = F>, Ix1>) -> Self {
        MatrixBuffer {
            data: v.to_vec(),
            rows: v.len(),
            cols: 1,
        }
    }

    /// Convert to a (rows, cols) matrix.
    ///
    /// *Panics* if the buffer length is not `rows * cols`, which cannot happen
    /// for buffers built with the provided constructors.
    pub fn to_array(&self) -> Array2<F> {
        assert_eq!(
            self.data.len(),
            self.rows * self.cols,
            "Buffer length must match rows * cols"
        );
        Array2::from_shape_vec((self.rows, self.cols), self.data.to_vec())
            .expect("row-major buffer of consistent length")
    }

    /// Flat row-major data
    pub fn data(&self) -> &[F] {
        &self.data
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Consume the buffer and return its flat data
    pub fn into_data(self) -> Vec<F> {
        self.data
    }
}

/// GP hyperparameters as given by a host environment
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(default)
)]
pub struct Hyperparameters<F: Float> {
    /// Kernel signal variance `v`
    pub variance: F,
    /// Kernel length scale `l`
    pub length_scale: F,
    /// Observation noise scale `s`, absent means noiseless observations
    pub noise: Option<F>,
    /// Prior mean `m`, absent means the mean of training outputs
    pub mean: Option<F>,
}

impl<F: Float> Default for Hyperparameters<F> {
    fn default() -> Self {
        Hyperparameters {
            variance: F::one(),
            length_scale: F::one(),
            noise: None,
            mean: None,
        }
    }
}

impl<F: Float> Hyperparameters<F> {
    /// Corresponding GP parameters
    pub fn params(&self) -> GpParams<F> {
        GaussianProcess::params(self.variance, self.length_scale)
            .noise(self.noise)
            .prior_mean(self.mean)
    }
}

/// Posterior distribution at m query points as flat buffers
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serializable", derive(Serialize, Deserialize))]
pub struct PosteriorBuffers<F: Float> {
    /// Posterior mean (m, 1)
    pub mean: MatrixBuffer<F>,
    /// Posterior covariance (m, m)
    pub covariance: MatrixBuffer<F>,
    /// Posterior variance (m, 1)
    pub variance: MatrixBuffer<F>,
}

/// Train a GP given training inputs `x` as a (n, nx) buffer, training outputs `y`
/// as a (n, 1) buffer and hyperparameters.
pub fn train<F: Float>(
    x: &MatrixBuffer<F>,
    y: &MatrixBuffer<F>,
    hyperparameters: &Hyperparameters<F>,
) -> Result<GaussianProcess<F>> {
    if y.cols() != 1 {
        return Err(GpError::DimensionError(format!(
            "Training outputs should be a column buffer, got {} columns",
            y.cols()
        )));
    }
    let params = hyperparameters.params().check()?;
    let yt = y.to_array().remove_axis(Axis(1));
    params.train(&x.to_array(), &yt)
}

/// Train a GP and compute its posterior distribution at `xt` query points
/// given as a (m, nx) buffer.
pub fn regress<F: Float>(
    x: &MatrixBuffer<F>,
    y: &MatrixBuffer<F>,
    xt: &MatrixBuffer<F>,
    hyperparameters: &Hyperparameters<F>,
) -> Result<PosteriorBuffers<F>> {
    train(x, y, hyperparameters)?.predict_buffers(xt)
}

/// Train a GP and draw `n_traj` posterior trajectories at `xt` query points
/// given as a (m, nx) buffer. Returns a (m, n_traj) buffer.
pub fn sample<F: Float>(
    x: &MatrixBuffer<F>,
    y: &MatrixBuffer<F>,
    xt: &MatrixBuffer<F>,
    n_traj: usize,
    hyperparameters: &Hyperparameters<F>,
) -> Result<MatrixBuffer<F>> {
    train(x, y, hyperparameters)?.sample_buffers(xt, n_traj)
}

impl<F: Float> GaussianProcess<F> {
    /// Predict the posterior distribution at query points given as a (m, nx) buffer
    pub fn predict_buffers(&self, xt: &MatrixBuffer<F>) -> Result<PosteriorBuffers<F>> {
        let posterior = self.predict(&xt.to_array())?;
        Ok(PosteriorBuffers {
            mean: MatrixBuffer::from_vector(&posterior.mean),
            covariance: MatrixBuffer::from_array(&posterior.covariance),
            variance: MatrixBuffer::from_vector(&posterior.variance),
        })
    }

    /// Draw `n_traj` posterior trajectories at query points given as a (m, nx) buffer.
    /// Returns a (m, n_traj) buffer, one trajectory per column.
    pub fn sample_buffers(&self, xt: &MatrixBuffer<F>, n_traj: usize) -> Result<MatrixBuffer<F>> {
        let trajs = self.sample(&xt.to_array(), n_traj)?;
        Ok(MatrixBuffer::from_array(&trajs))
    }
}
