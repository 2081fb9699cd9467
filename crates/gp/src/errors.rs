use thiserror::Error;

/// A result type for GP regression algorithm
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when fitting or using a [`GaussianProcess`](crate::GaussianProcess)
#[derive(Error, Debug)]
pub enum GpError {
    /// When input shapes are inconsistent with each other
    #[error("Dimension error: {0}")]
    DimensionError(String),
    /// When kernel variance or length scale (or another hyperparameter) is invalid
    #[error("Hyperparameter error: {0}")]
    HyperparameterError(String),
    /// When the regularized training covariance cannot be factorized
    #[error("Singular matrix error: {0}")]
    SingularMatrixError(String),
    #[error(transparent)]
    /// When linear algebra computation fails
    LinalgError(#[from] linfa_linalg::LinalgError),
    /// When linear algebra computation fails
    #[cfg(feature = "blas")]
    #[error("Linalg BLAS error: {0}")]
    LinalgBlasError(#[from] ndarray_linalg::error::LinalgError),
    /// When a linfa error occurs
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
