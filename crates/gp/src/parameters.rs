use crate::errors::{GpError, Result};
use crate::kernels::RbfKernel;
use linfa::{Float, ParamGuard};

#[cfg(feature = "serializable")]
use serde::{Deserialize, Serialize};

/// A set of validated GP parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serializable",
    derive(Serialize, Deserialize),
    serde(bound(
        serialize = "F: Serialize",
        deserialize = "F: Deserialize<'de>"
    ))
)]
pub struct GpValidParams<F: Float> {
    /// RBF kernel representing the prior covariance k(x, x')
    pub(crate) kernel: RbfKernel<F>,
    /// Observation noise scale `s`, the noise variance added to the training
    /// covariance diagonal is `s^2`. None means noiseless observations.
    pub(crate) noise: Option<F>,
    /// Prior mean of the process. None means the mean of training outputs is used.
    pub(crate) prior_mean: Option<F>,
}

impl<F: Float> Default for GpValidParams<F> {
    fn default() -> GpValidParams<F> {
        GpValidParams {
            kernel: RbfKernel::default(),
            noise: None,
            prior_mean: None,
        }
    }
}

impl<F: Float> GpValidParams<F> {
    /// Get kernel k(x, x')
    pub fn kernel(&self) -> &RbfKernel<F> {
        &self.kernel
    }

    /// Get observation noise scale
    pub fn noise(&self) -> Option<F> {
        self.noise
    }

    /// Get prior mean
    pub fn prior_mean(&self) -> Option<F> {
        self.prior_mean
    }
}

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [GP algorithm](struct.GaussianProcess.html).
///
/// Hyperparameters are given, not estimated: the kernel variance and length scale
/// are mandatory, noise and prior mean are optional.
pub struct GpParams<F: Float>(GpValidParams<F>);

impl<F: Float> GpParams<F> {
    /// A constructor for GP parameters given kernel signal variance `v` and length scale `l`
    pub fn new(variance: F, length_scale: F) -> GpParams<F> {
        Self(GpValidParams {
            kernel: RbfKernel::new(variance, length_scale),
            ..Default::default()
        })
    }

    /// A constructor for GP parameters from validated parameters
    pub fn new_from_valid(params: &GpValidParams<F>) -> Self {
        Self(params.clone())
    }

    /// Set kernel signal variance `v`.
    pub fn variance(mut self, variance: F) -> Self {
        self.0.kernel = RbfKernel::new(variance, self.0.kernel.length_scale());
        self
    }

    /// Set kernel length scale `l`.
    pub fn length_scale(mut self, length_scale: F) -> Self {
        self.0.kernel = RbfKernel::new(self.0.kernel.variance(), length_scale);
        self
    }

    /// Set observation noise scale `s`.
    ///
    /// `s^2` is added to the diagonal of the training covariance on top of
    /// the [jitter](crate::GP_JITTER). `None` means noiseless observations.
    pub fn noise(mut self, noise: Option<F>) -> Self {
        self.0.noise = noise;
        self
    }

    /// Set prior mean `m` of the process.
    ///
    /// When `None`, the mean of training outputs is used.
    pub fn prior_mean(mut self, prior_mean: Option<F>) -> Self {
        self.0.prior_mean = prior_mean;
        self
    }
}

impl<F: Float> From<GpValidParams<F>> for GpParams<F> {
    fn from(valid: GpValidParams<F>) -> Self {
        GpParams(valid)
    }
}

impl<F: Float> ParamGuard for GpParams<F> {
    type Checked = GpValidParams<F>;
    type Error = GpError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let kernel = self.0.kernel();
        // written as negations so that NaN is rejected too
        if !(kernel.variance() > F::zero()) {
            return Err(GpError::HyperparameterError(format!(
                "Kernel variance should be strictly positive, got {}",
                kernel.variance()
            )));
        }
        if !(kernel.length_scale() > F::zero()) {
            return Err(GpError::HyperparameterError(format!(
                "Kernel length scale should be strictly positive, got {}",
                kernel.length_scale()
            )));
        }
        if let Some(s) = self.0.noise {
            if !s.is_finite() {
                return Err(GpError::HyperparameterError(format!(
                    "Noise should be a finite value, got {s}"
                )));
            }
        }
        if let Some(m) = self.0.prior_mean {
            if !m.is_finite() {
                return Err(GpError::HyperparameterError(format!(
                    "Prior mean should be a finite value, got {m}"
                )));
            }
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = GpParams::new(1., 1.).check().expect("valid params");
        assert_eq!(RbfKernel::new(1., 1.), *params.kernel());
        assert_eq!(None, params.noise());
        assert_eq!(None, params.prior_mean());
    }

    #[test]
    fn test_builder() {
        let params = GpParams::new(1., 1.)
            .variance(2.)
            .length_scale(0.5)
            .noise(Some(-0.1))
            .prior_mean(Some(0.))
            .check()
            .expect("valid params");
        assert_eq!(2., params.kernel().variance());
        assert_eq!(0.5, params.kernel().length_scale());
        assert_eq!(Some(-0.1), params.noise());
        assert_eq!(Some(0.), params.prior_mean());

        let again = GpParams::new_from_valid(&params).check().unwrap();
        assert_eq!(params, again);
    }

    #[test]
    fn test_invalid_variance() {
        for v in [0., -1., f64::NAN] {
            let res = GpParams::new(v, 1.).check();
            assert!(matches!(res, Err(GpError::HyperparameterError(_))));
        }
    }

    #[test]
    fn test_invalid_length_scale() {
        for l in [0., -0.5, f64::NAN] {
            let res = GpParams::new(1., l).check_ref().map(|_| ());
            assert!(matches!(res, Err(GpError::HyperparameterError(_))));
        }
    }

    #[test]
    fn test_invalid_noise_or_mean() {
        let res = GpParams::new(1., 1.).noise(Some(f64::INFINITY)).check();
        assert!(matches!(res, Err(GpError::HyperparameterError(_))));
        let res = GpParams::new(1., 1.).prior_mean(Some(f64::NAN)).check();
        assert!(matches!(res, Err(GpError::HyperparameterError(_))));
    }
}
