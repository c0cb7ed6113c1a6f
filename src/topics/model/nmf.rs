// Non-negative matrix factorization with multiplicative updates.
//
// Minimizes ||X - WH||²_F subject to W, H >= 0 using the Lee & Seung
// update rules:
//
//   H <- H ⊙ (WᵀX) / (WᵀWH)
//   W <- W ⊙ (XHᵀ) / (WHHᵀ)
//
// Entries start positive and each update multiplies by a non-negative ratio,
// so non-negativity holds throughout. Convergence is checked every 10
// iterations on the relative drop in reconstruction error.

use ndarray::{Array2, Zip};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::{validate_topic_count, Factorization, TopicModel};
use crate::error::Result;

/// Guards the update ratios against division by zero.
const EPSILON: f64 = 1e-10;

/// How often (in iterations) the reconstruction error is evaluated.
const CHECK_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct Nmf {
    pub max_iter: usize,
    /// Stop once the relative error improvement falls below this
    pub tol: f64,
}

impl Default for Nmf {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-4,
        }
    }
}

impl TopicModel for Nmf {
    fn name(&self) -> &'static str {
        "nmf"
    }

    fn fit(&self, x: &Array2<f64>, k: usize, seed: u64) -> Result<Factorization> {
        validate_topic_count(x, k)?;
        let (n_docs, n_terms) = x.dim();

        // Random init scaled so WH starts near the magnitude of X
        let scale = (x.mean().unwrap_or(0.0) / k as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut h = Array2::from_shape_fn((k, n_terms), |_| scale * rng.random::<f64>());
        let mut w = Array2::from_shape_fn((n_docs, k), |_| scale * rng.random::<f64>());

        let error_at_init = frobenius_error(x, &w, &h);
        let mut previous_error = error_at_init;
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            n_iter = iter;

            let numerator = w.t().dot(x);
            let denominator = w.t().dot(&w).dot(&h);
            Zip::from(&mut h)
                .and(&numerator)
                .and(&denominator)
                .for_each(|h, &num, &den| *h *= num / (den + EPSILON));

            let numerator = x.dot(&h.t());
            let denominator = w.dot(&h.dot(&h.t()));
            Zip::from(&mut w)
                .and(&numerator)
                .and(&denominator)
                .for_each(|w, &num, &den| *w *= num / (den + EPSILON));

            if self.tol > 0.0 && iter % CHECK_EVERY == 0 {
                let error = frobenius_error(x, &w, &h);
                if error_at_init > 0.0 && (previous_error - error) / error_at_init < self.tol {
                    break;
                }
                previous_error = error;
            }
        }

        let reconstruction_err = frobenius_error(x, &w, &h);
        debug!(
            iterations = n_iter,
            reconstruction_err = reconstruction_err,
            "NMF converged"
        );

        Ok(Factorization {
            doc_topic: w,
            topic_term: h,
            n_iter,
            reconstruction_err: Some(reconstruction_err),
        })
    }
}

/// ||X - WH||_F
fn frobenius_error(x: &Array2<f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    let wh = w.dot(h);
    Zip::from(x)
        .and(&wh)
        .fold(0.0, |acc, &a, &b| acc + (a - b) * (a - b))
        .sqrt()
}
