//! Linear algebra routines used by GP fitting and prediction.
//!
//! Pure Rust [linfa-linalg](https://github.com/rust-ml/linfa-linalg) backend by default,
//! BLAS/LAPACK backend through [ndarray-linalg](https://github.com/rust-ndarray/ndarray-linalg)
//! when the `blas` feature is enabled.

use crate::errors::{GpError, Result};
use linfa::Float;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix2};

#[cfg(feature = "blas")]
use linfa::dataset::{WithLapack, WithoutLapack};
#[cfg(not(feature = "blas"))]
use linfa_linalg::{cholesky::*, eigh::*, triangular::*};
#[cfg(feature = "blas")]
use ndarray_linalg::{cholesky::*, eigh::*, triangular::*};

/// Lower triangular Cholesky factor `L` of a symmetric positive definite matrix `a`
/// such that `L.L^t = a`. Failure means `a` is not (numerically) positive definite.
pub(crate) fn cholesky<F: Float>(a: &Array2<F>) -> Result<Array2<F>> {
    #[cfg(not(feature = "blas"))]
    let chol = a.cholesky().map_err(|e| e.to_string());
    #[cfg(feature = "blas")]
    let chol = a
        .to_owned()
        .with_lapack()
        .cholesky(UPLO::Lower)
        .map(|c| c.without_lapack())
        .map_err(|e| e.to_string());

    chol.map_err(|msg| {
        GpError::SingularMatrixError(format!(
            "Cholesky decomposition of regularized covariance failed: {msg}"
        ))
    })
}

/// Solve `L.x = b` where `L` is lower triangular
pub(crate) fn solve_lower<F: Float>(
    l: &Array2<F>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    #[cfg(not(feature = "blas"))]
    let x = l.solve_triangular(b, UPLO::Lower)?;
    #[cfg(feature = "blas")]
    let x = l
        .to_owned()
        .with_lapack()
        .solve_triangular(UPLO::Lower, Diag::NonUnit, &b.to_owned().with_lapack())?
        .without_lapack();
    Ok(x)
}

/// Solve `L^t.x = b` where `L` is lower triangular
pub(crate) fn solve_lower_t<F: Float>(
    l: &Array2<F>,
    b: &ArrayBase<impl Data<Elem = F>, Ix2>,
) -> Result<Array2<F>> {
    #[cfg(not(feature = "blas"))]
    let x = l.t().solve_triangular(b, UPLO::Upper)?;
    #[cfg(feature = "blas")]
    let x = l
        .t()
        .to_owned()
        .with_lapack()
        .solve_triangular(UPLO::Upper, Diag::NonUnit, &b.to_owned().with_lapack())?
        .without_lapack();
    Ok(x)
}

/// Eigen decomposition of a symmetric matrix: returns (eigenvalues, eigenvectors as columns)
pub(crate) fn eigh<F: Float>(a: Array2<F>) -> Result<(Array1<F>, Array2<F>)> {
    #[cfg(not(feature = "blas"))]
    let (v, w) = a.eigh_into()?;
    #[cfg(feature = "blas")]
    let (v, w) = {
        let (v, w) = a.with_lapack().eigh(UPLO::Lower)?;
        (v.mapv(F::cast), w.without_lapack())
    };
    Ok((v, w))
}
