//! This library implements [Gaussian Process](https://en.wikipedia.org/wiki/Gaussian_process) regression
//! with a radial basis function (RBF) kernel.
//!
//! Given training inputs and outputs, a GP model is fitted once using given hyperparameters
//! (kernel signal variance and length scale, observation noise, prior mean), then used to compute
//! the posterior distribution (mean, covariance and variance) at any number of query points.
//! The complexity of the training is O(N^3) in processing time and O(N^2) in memory where N
//! is the number of training points, the regularized training covariance matrix being
//! factorized once and for all using a Cholesky decomposition.
//!
//! GP regression is implemented by [GaussianProcess] parameterized by [GpParams].
//!
//! The [buffers] module provides a flat row-major buffers interface to be used
//! by host environments exchanging matrices as plain arrays of numbers.
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
mod algorithm;
pub mod buffers;
mod errors;
pub mod kernels;
mod linalg;
mod parameters;
mod utils;

pub use algorithm::*;
pub use errors::*;
pub use parameters::*;
pub use utils::{pairwise_sq_distances, DistanceMatrix};
