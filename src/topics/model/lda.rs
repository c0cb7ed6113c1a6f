// Latent Dirichlet Allocation fit by batch variational Bayes.
//
// Each document is a mixture over k topics (variational parameter gamma,
// documents × k) and each topic a distribution over the vocabulary
// (variational parameter lambda, k × terms). One outer iteration runs the
// per-document E-step over the whole corpus and then sets
// lambda = eta + sufficient statistics.
//
// The TF-IDF weights are used as (fractional) term counts. Documents with
// no terms get an all-zero row in W.

use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma};
use tracing::debug;

use super::{validate_topic_count, Factorization, TopicModel};
use crate::error::{Result, TopicError};

/// Shape and scale of the Gamma draws used to initialize gamma and lambda.
const INIT_GAMMA_SHAPE: f64 = 100.0;
const INIT_GAMMA_SCALE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct Lda {
    /// Outer (corpus-level) iterations
    pub max_iter: usize,
    /// Inner iterations per document in the E-step
    pub max_doc_update_iter: usize,
    /// Stop a document's E-step when gamma's mean absolute change drops below this
    pub mean_change_tol: f64,
    /// Dirichlet prior on document-topic mixtures; 1/k when unset
    pub doc_topic_prior: Option<f64>,
    /// Dirichlet prior on topic-term distributions; 1/k when unset
    pub topic_word_prior: Option<f64>,
}

impl Default for Lda {
    fn default() -> Self {
        Self {
            max_iter: 10,
            max_doc_update_iter: 100,
            mean_change_tol: 1e-3,
            doc_topic_prior: None,
            topic_word_prior: None,
        }
    }
}

impl TopicModel for Lda {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn fit(&self, x: &Array2<f64>, k: usize, seed: u64) -> Result<Factorization> {
        validate_topic_count(x, k)?;
        let n_terms = x.ncols();
        let alpha = self.doc_topic_prior.unwrap_or(1.0 / k as f64);
        let eta = self.topic_word_prior.unwrap_or(1.0 / k as f64);

        let gamma_dist = Gamma::new(INIT_GAMMA_SHAPE, INIT_GAMMA_SCALE).map_err(|e| {
            TopicError::InvalidConfig {
                reason: format!("gamma initialization: {e}"),
            }
        })?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut lambda = Array2::from_shape_fn((k, n_terms), |_| gamma_dist.sample(&mut rng));
        let mut exp_elog_beta = exp_dirichlet_expectation(&lambda);

        for _ in 0..self.max_iter {
            let (_, sstats) = self.e_step(x, &exp_elog_beta, alpha, &gamma_dist, &mut rng);
            lambda = sstats * &exp_elog_beta + eta;
            exp_elog_beta = exp_dirichlet_expectation(&lambda);
        }

        // Final pass yields the document-topic distributions for the fitted topics
        let (mut doc_topic, _) = self.e_step(x, &exp_elog_beta, alpha, &gamma_dist, &mut rng);
        for mut row in doc_topic.rows_mut() {
            let sum = row.sum();
            if sum > 0.0 {
                row /= sum;
            }
        }

        debug!(iterations = self.max_iter, topics = k, "LDA fitted");

        Ok(Factorization {
            doc_topic,
            topic_term: lambda,
            n_iter: self.max_iter,
            reconstruction_err: None,
        })
    }
}

impl Lda {
    /// Variational E-step over every document.
    ///
    /// Returns gamma (documents × k) and the sufficient statistics for
    /// lambda (k × terms), not yet multiplied by exp(E[log beta]).
    fn e_step(
        &self,
        x: &Array2<f64>,
        exp_elog_beta: &Array2<f64>,
        alpha: f64,
        gamma_dist: &Gamma<f64>,
        rng: &mut StdRng,
    ) -> (Array2<f64>, Array2<f64>) {
        let (n_docs, n_terms) = x.dim();
        let k = exp_elog_beta.nrows();
        let mut doc_topic = Array2::<f64>::zeros((n_docs, k));
        let mut sstats = Array2::<f64>::zeros((k, n_terms));

        for (d, row) in x.axis_iter(Axis(0)).enumerate() {
            let ids: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v > 0.0)
                .map(|(i, _)| i)
                .collect();
            // No surviving terms: the row stays zero and the document
            // represents no topic
            if ids.is_empty() {
                continue;
            }

            let mut gamma_d: Array1<f64> = Array1::from_shape_fn(k, |_| gamma_dist.sample(&mut *rng));

            let cnts: Array1<f64> = ids.iter().map(|&i| row[i]).collect();
            let beta_d = exp_elog_beta.select(Axis(1), &ids);
            let mut exp_elog_theta_d = exp_dirichlet_expectation_1d(gamma_d.view());
            let mut phinorm = exp_elog_theta_d.dot(&beta_d) + f64::EPSILON;

            for _ in 0..self.max_doc_update_iter {
                let last_gamma = gamma_d.clone();
                let ratio = &cnts / &phinorm;
                gamma_d = &exp_elog_theta_d * &beta_d.dot(&ratio) + alpha;
                exp_elog_theta_d = exp_dirichlet_expectation_1d(gamma_d.view());
                phinorm = exp_elog_theta_d.dot(&beta_d) + f64::EPSILON;

                let mean_change = (&last_gamma - &gamma_d).mapv(f64::abs).mean().unwrap_or(0.0);
                if mean_change < self.mean_change_tol {
                    break;
                }
            }

            doc_topic.row_mut(d).assign(&gamma_d);

            let ratio = &cnts / &phinorm;
            for (t, &theta) in exp_elog_theta_d.iter().enumerate() {
                for (j, &id) in ids.iter().enumerate() {
                    sstats[[t, id]] += theta * ratio[j];
                }
            }
        }

        (doc_topic, sstats)
    }
}

/// exp(E[log X]) for X ~ Dir(row), applied to each row.
fn exp_dirichlet_expectation(params: &Array2<f64>) -> Array2<f64> {
    let mut out = params.clone();
    for mut row in out.rows_mut() {
        let psi_total = digamma(row.sum());
        row.mapv_inplace(|v| (digamma(v) - psi_total).exp());
    }
    out
}

fn exp_dirichlet_expectation_1d(params: ArrayView1<f64>) -> Array1<f64> {
    let psi_total = digamma(params.sum());
    params.mapv(|v| (digamma(v) - psi_total).exp())
}

/// Digamma function ψ(x) for x > 0, via recurrence up to x >= 6 followed by
/// the asymptotic series.
fn digamma(x: f64) -> f64 {
    let mut x = x;
    let mut result = 0.0;
    while x < 6.0 {
        result -= 1.0 / x;
        x += 1.0;
    }
    let f = 1.0 / (x * x);
    result + x.ln()
        - 0.5 / x
        - f * (1.0 / 12.0 - f * (1.0 / 120.0 - f * (1.0 / 252.0 - f * (1.0 / 240.0 - f / 132.0))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn corpus() -> Array2<f64> {
        array![
            [0.0, 0.7, 0.7, 0.0, 0.1],
            [0.0, 0.45, 0.9, 0.0, 0.0],
            [0.7, 0.0, 0.0, 0.7, 0.0],
            [0.45, 0.0, 0.0, 0.9, 0.1],
            [0.0, 0.0, 0.0, 0.0, 0.0],
        ]
    }

    #[test]
    fn test_digamma_known_values() {
        // ψ(1) = -γ (Euler–Mascheroni)
        assert!((digamma(1.0) + 0.577_215_664_901_532_9).abs() < 1e-10);
        // ψ(x + 1) = ψ(x) + 1/x
        assert!((digamma(3.5) - digamma(2.5) - 1.0 / 2.5).abs() < 1e-10);
        assert!((digamma(0.5) + 1.963_510_026_021_423_5).abs() < 1e-9);
    }

    #[test]
    fn test_shapes_and_normalized_doc_topics() {
        let x = corpus();
        let f = Lda::default().fit(&x, 3, 42).unwrap();
        assert_eq!(f.doc_topic.dim(), (5, 3));
        assert_eq!(f.topic_term.dim(), (3, 5));
        for row in f.doc_topic.rows().into_iter().take(4) {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert!(f.topic_term.iter().all(|&v| v > 0.0));
        assert!(f.reconstruction_err.is_none());
    }

    #[test]
    fn test_deterministic_for_seed() {
        let x = corpus();
        let a = Lda::default().fit(&x, 2, 11).unwrap();
        let b = Lda::default().fit(&x, 2, 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let x = corpus();
        let a = Lda::default().fit(&x, 2, 1).unwrap();
        let b = Lda::default().fit(&x, 2, 2).unwrap();
        assert_ne!(a.topic_term, b.topic_term);
    }

    #[test]
    fn test_empty_document_has_zero_row() {
        for seed in [1, 42, 7] {
            let f = Lda::default().fit(&corpus(), 2, seed).unwrap();
            assert!(f.doc_topic.row(4).iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_rejects_single_topic() {
        assert!(Lda::default().fit(&corpus(), 1, 42).is_err());
    }
}
