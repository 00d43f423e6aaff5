//! OLS estimator for the wage-change DiD model.
//!
//! Fits `dwage = b0 + b1*treated + b2*female + b3*(treated*female) + e` with
//! classical (homoskedastic, unclustered) standard errors. `b1` is the effect of
//! union entry for men, `b1 + b3` the effect for women.
//!
//! Each transition counts as an independent observation even when one person
//! contributes several; standard errors are not clustered by person.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use crate::domain::model::{
    Coefficient, DidEffect, DidEffects, DidRecord, OlsFit, RegressionOutcome,
};
use crate::utils::error::{DidError, Result};

pub const TERMS: [&str; 4] = ["Intercept", "treated", "female", "treated:female"];
pub const DEPENDENT: &str = "dwage";

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

/// Row-major design matrix and outcome vector. Rows with a non-finite outcome are dropped.
pub fn did_design(records: &[DidRecord]) -> (Vec<f64>, Vec<f64>, usize) {
    let mut x = Vec::with_capacity(records.len() * TERMS.len());
    let mut y = Vec::with_capacity(records.len());
    let mut dropped = 0usize;

    for record in records {
        let Some(dwage) = record.dwage.filter(|d| d.is_finite()) else {
            dropped += 1;
            continue;
        };
        let d = indicator(record.transition.treated);
        let f = indicator(record.transition.female);
        x.extend_from_slice(&[1.0, d, f, d * f]);
        y.push(dwage);
    }

    (x, y, dropped)
}

/// NaN variance (no residual df) stays NaN instead of collapsing to zero.
fn std_error_of(variance: f64) -> f64 {
    if variance.is_nan() {
        f64::NAN
    } else {
        variance.max(0.0).sqrt()
    }
}

fn two_sided_p(t: f64, t_dist: Option<&StudentsT>) -> f64 {
    match t_dist {
        Some(_) if t.is_infinite() => 0.0,
        Some(dist) if t.is_finite() => 2.0 * dist.sf(t.abs()),
        _ => f64::NAN,
    }
}

/// Fit OLS on a row-major design whose first column is the intercept.
pub fn fit_ols(x: &[f64], y: &[f64], names: &[&str], dependent: &str) -> Result<OlsFit> {
    let n = y.len();
    let k = names.len();
    if n == 0 {
        return Err(DidError::EstimationError {
            message: "no observations with a finite outcome".to_string(),
        });
    }
    if k == 0 || x.len() != n * k {
        return Err(DidError::EstimationError {
            message: format!(
                "design has wrong shape: expected {}x{} = {} values, got {}",
                n,
                k,
                n * k,
                x.len()
            ),
        });
    }

    let x_mat = DMatrix::from_row_slice(n, k, x);
    let y_vec = DVector::from_column_slice(y);

    // Moore-Penrose solve. An empty cell leaves a zero column; its coefficient is zero.
    let svd = x_mat.clone().svd(true, true);
    let max_sv = svd.singular_values.max();
    let tol = max_sv * n.max(k) as f64 * f64::EPSILON;
    let rank = svd.singular_values.iter().filter(|&&sv| sv > tol).count();
    if rank == 0 {
        return Err(DidError::EstimationError {
            message: "design matrix has rank zero".to_string(),
        });
    }
    if rank < k {
        tracing::warn!(
            "Design matrix is rank deficient ({} of {} columns); using the pseudo-inverse",
            rank,
            k
        );
    }
    let pinv_x = svd
        .pseudo_inverse(tol)
        .map_err(|e| DidError::EstimationError {
            message: format!("pseudo-inverse failed: {}", e),
        })?;
    let beta = &pinv_x * &y_vec;
    // pinv(X) pinv(X)' = pinv(X'X)
    let normalized_cov = &pinv_x * pinv_x.transpose();

    let y_hat = &x_mat * &beta;
    let resid = &y_vec - &y_hat;
    let rss: f64 = resid.iter().map(|r| r * r).sum();

    let df_resid = n.saturating_sub(rank);
    let df_model = rank - 1;
    let sigma2 = if df_resid > 0 {
        rss / df_resid as f64
    } else {
        f64::NAN
    };
    let cov = normalized_cov.scale(sigma2);

    let t_dist = if df_resid > 0 {
        StudentsT::new(0.0, 1.0, df_resid as f64).ok()
    } else {
        None
    };
    let t_crit = t_dist
        .as_ref()
        .map(|d| d.inverse_cdf(0.975))
        .unwrap_or(f64::NAN);

    let coefficients = names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let std_error = std_error_of(cov[(j, j)]);
            let t_stat = estimate / std_error;
            Coefficient {
                name: name.to_string(),
                estimate,
                std_error,
                t_stat,
                p_value: two_sided_p(t_stat, t_dist.as_ref()),
                ci_lower: estimate - t_crit * std_error,
                ci_upper: estimate + t_crit * std_error,
            }
        })
        .collect();

    // Centered R², the model carries an intercept.
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let tss: f64 = y.iter().map(|v| (v - y_mean) * (v - y_mean)).sum();
    let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
    let adj_r_squared = if df_resid > 0 {
        1.0 - (1.0 - r_squared) * (n as f64 - 1.0) / df_resid as f64
    } else {
        f64::NAN
    };

    let (f_stat, f_p_value) = if df_model > 0 && df_resid > 0 && tss > 0.0 {
        let f = ((tss - rss) / df_model as f64) / sigma2;
        let p = if f.is_infinite() {
            0.0
        } else {
            FisherSnedecor::new(df_model as f64, df_resid as f64)
                .map(|d| d.sf(f))
                .unwrap_or(f64::NAN)
        };
        (f, p)
    } else {
        (f64::NAN, f64::NAN)
    };

    let covariance = (0..k)
        .map(|i| (0..k).map(|j| cov[(i, j)]).collect())
        .collect();

    Ok(OlsFit {
        dependent: dependent.to_string(),
        coefficients,
        covariance,
        n_obs: n,
        n_dropped: 0,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_stat,
        f_p_value,
        rss,
        residual_variance: sigma2,
    })
}

pub fn fit_did(records: &[DidRecord]) -> Result<OlsFit> {
    let (x, y, dropped) = did_design(records);
    if dropped > 0 {
        tracing::warn!(
            "Dropping {} transitions with a non-finite {} before fitting",
            dropped,
            DEPENDENT
        );
    }
    let mut fit = fit_ols(&x, &y, &TERMS, DEPENDENT)?;
    fit.n_dropped = dropped;
    Ok(fit)
}

/// Estimate, standard error and test of `sum_j w_j * b_j`.
pub fn linear_combination(fit: &OlsFit, weights: &[f64], label: &str) -> DidEffect {
    let k = fit.coefficients.len().min(weights.len());
    let estimate: f64 = (0..k).map(|j| weights[j] * fit.coefficients[j].estimate).sum();
    let variance: f64 = (0..k)
        .flat_map(|i| (0..k).map(move |j| (i, j)))
        .map(|(i, j)| weights[i] * weights[j] * fit.covariance[i][j])
        .sum();
    let std_error = std_error_of(variance);
    let t_stat = estimate / std_error;
    let t_dist = if fit.df_resid > 0 {
        StudentsT::new(0.0, 1.0, fit.df_resid as f64).ok()
    } else {
        None
    };

    DidEffect {
        label: label.to_string(),
        estimate,
        std_error,
        t_stat,
        p_value: two_sided_p(t_stat, t_dist.as_ref()),
    }
}

pub fn did_effects(fit: &OlsFit) -> DidEffects {
    DidEffects {
        male: linear_combination(fit, &[0.0, 1.0, 0.0, 0.0], "Male (treated)"),
        female: linear_combination(fit, &[0.0, 1.0, 0.0, 1.0], "Female (treated + treated:female)"),
    }
}

/// Fit the model, turning estimation failures into a reportable outcome.
pub fn estimate(records: &[DidRecord]) -> RegressionOutcome {
    match fit_did(records) {
        Ok(fit) => {
            let effects = did_effects(&fit);
            tracing::info!(
                "DiD fit on {} transitions: male effect {:.4}, female effect {:.4}",
                fit.n_obs,
                effects.male.estimate,
                effects.female.estimate
            );
            RegressionOutcome::Fitted { fit, effects }
        }
        Err(e) => {
            tracing::warn!("Regression skipped: {}", e);
            RegressionOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcomes::derive_outcome;
    use crate::domain::model::{PersonId, TransitionRecord};

    fn record(person: i64, female: bool, treated: bool, dwage: Option<f64>) -> DidRecord {
        derive_outcome(TransitionRecord {
            person_id: PersonId::Numeric(person),
            wave_pre: 1,
            wave_post: 2,
            female,
            treated,
            wage_pre: dwage.map(|_| 10.0),
            wage_post: dwage.map(|d| 10.0 + d),
        })
    }

    /// Two rows per cell, spread ±0.5 around cell means MC=1, MT=3, FC=2, FT=6.
    fn balanced_sample() -> Vec<DidRecord> {
        let mut records = Vec::new();
        let cells = [(false, false, 1.0), (false, true, 3.0), (true, false, 2.0), (true, true, 6.0)];
        for (i, (female, treated, mean)) in cells.into_iter().enumerate() {
            records.push(record(i as i64, female, treated, Some(mean - 0.5)));
            records.push(record(i as i64 + 10, female, treated, Some(mean + 0.5)));
        }
        records
    }

    #[test]
    fn test_recovers_cell_mean_contrasts() {
        let fit = fit_did(&balanced_sample()).unwrap();

        let est: Vec<f64> = fit.coefficients.iter().map(|c| c.estimate).collect();
        let expected = [1.0, 2.0, 1.0, 2.0];
        for (got, want) in est.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {:?}", est);
        }
        assert_eq!(fit.n_obs, 8);
        assert_eq!(fit.df_resid, 4);
        assert_eq!(fit.df_model, 3);
        // Residuals are all ±0.5.
        assert!((fit.rss - 2.0).abs() < 1e-9);
        assert!((fit.residual_variance - 0.5).abs() < 1e-9);

        let names: Vec<&str> = fit.coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, TERMS.to_vec());

        for c in &fit.coefficients {
            assert!(c.std_error > 0.0);
            assert!((0.0..=1.0).contains(&c.p_value));
            assert!(c.ci_lower < c.estimate && c.estimate < c.ci_upper);
        }
        assert!(fit.r_squared > 0.0 && fit.r_squared < 1.0);
        assert!(fit.f_stat > 0.0);
        assert!((0.0..=1.0).contains(&fit.f_p_value));
    }

    #[test]
    fn test_did_effects() {
        let fit = fit_did(&balanced_sample()).unwrap();
        let effects = did_effects(&fit);

        assert!((effects.male.estimate - 2.0).abs() < 1e-9);
        assert!((effects.female.estimate - 4.0).abs() < 1e-9);

        // Var(b1 + b3) = V11 + V33 + 2 V13
        let v = &fit.covariance;
        let expected_se = (v[1][1] + v[3][3] + 2.0 * v[1][3]).sqrt();
        assert!((effects.female.std_error - expected_se).abs() < 1e-12);
        assert!((effects.male.std_error - fit.coefficients[1].std_error).abs() < 1e-12);
    }

    #[test]
    fn test_refit_is_deterministic() {
        let records = balanced_sample();
        let a = fit_did(&records).unwrap();
        let b = fit_did(&records).unwrap();

        for (ca, cb) in a.coefficients.iter().zip(&b.coefficients) {
            assert_eq!(ca.estimate.to_bits(), cb.estimate.to_bits());
            assert_eq!(ca.std_error.to_bits(), cb.std_error.to_bits());
        }
    }

    #[test]
    fn test_constant_outcome_one_row_per_cell() {
        let records = vec![
            record(1, false, false, Some(5.0)),
            record(2, false, true, Some(5.0)),
            record(3, true, false, Some(5.0)),
            record(4, true, true, Some(5.0)),
        ];

        let fit = fit_did(&records).unwrap();

        assert!(fit.rss.abs() < 1e-18);
        assert_eq!(fit.df_resid, 0);
        assert!(fit.coefficients[0].std_error.is_nan());
        assert!((fit.coefficients[0].estimate - 5.0).abs() < 1e-9);
        for c in &fit.coefficients[1..] {
            assert!(c.estimate.abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_outcome_has_zero_residual_variance() {
        let mut records = Vec::new();
        for person in 0..2 {
            for (female, treated) in [(false, false), (false, true), (true, false), (true, true)] {
                records.push(record(person, female, treated, Some(-1.25)));
            }
        }

        let fit = fit_did(&records).unwrap();

        assert_eq!(fit.df_resid, 4);
        assert!(fit.residual_variance.abs() < 1e-20);
    }

    #[test]
    fn test_non_finite_outcomes_are_dropped() {
        let mut records = balanced_sample();
        records.push(record(99, true, true, None));
        records.push(record(98, false, false, None));

        let fit = fit_did(&records).unwrap();

        assert_eq!(fit.n_obs, 8);
        assert_eq!(fit.n_dropped, 2);
        assert!((fit.coefficients[3].estimate - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_design_is_an_estimation_error() {
        let err = fit_did(&[]).unwrap_err();
        assert!(matches!(err, DidError::EstimationError { .. }));

        let only_missing = vec![record(1, false, true, None)];
        assert!(fit_did(&only_missing).is_err());
    }

    #[test]
    fn test_missing_cell_still_fits() {
        // No treated women: the interaction column is all zeros.
        let records = vec![
            record(1, false, false, Some(0.5)),
            record(2, false, false, Some(1.5)),
            record(3, false, true, Some(2.5)),
            record(4, false, true, Some(3.5)),
            record(5, true, false, Some(1.5)),
            record(6, true, false, Some(2.5)),
        ];

        let fit = fit_did(&records).unwrap();

        let est: Vec<f64> = fit.coefficients.iter().map(|c| c.estimate).collect();
        let expected = [1.0, 2.0, 1.0, 0.0];
        for (got, want) in est.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {:?}", est);
        }
        assert_eq!(fit.n_obs, 6);
        assert_eq!(fit.df_model, 2);
        assert_eq!(fit.df_resid, 3);
        assert!((fit.rss - 1.5).abs() < 1e-9);
        assert!(fit.coefficients[1].std_error > 0.0);
        assert!((0.0..=1.0).contains(&fit.coefficients[1].p_value));

        match estimate(&records) {
            RegressionOutcome::Fitted { effects, .. } => {
                assert!((effects.male.estimate - 2.0).abs() < 1e-9);
                assert!((effects.female.estimate - 2.0).abs() < 1e-9);
            }
            RegressionOutcome::Unavailable { reason } => panic!("unexpected: {}", reason),
        }
    }

    #[test]
    fn test_no_women_drops_two_columns_from_rank() {
        let records = vec![
            record(1, false, false, Some(1.0)),
            record(2, false, true, Some(2.0)),
            record(3, false, false, Some(1.5)),
        ];

        let fit = fit_did(&records).unwrap();

        assert_eq!(fit.df_model, 1);
        assert_eq!(fit.df_resid, 1);
        assert!((fit.coefficients[0].estimate - 1.25).abs() < 1e-9);
        assert!((fit.coefficients[1].estimate - 0.75).abs() < 1e-9);
        assert!(fit.coefficients[2].estimate.abs() < 1e-9);
    }

    #[test]
    fn test_tail_p_value_keeps_precision() {
        let dist = StudentsT::new(0.0, 1.0, 30.0).unwrap();
        let p = two_sided_p(40.0, Some(&dist));
        assert!(p > 0.0 && p < 1e-20, "p = {}", p);
    }

    #[test]
    fn test_estimate_reports_unavailable() {
        match estimate(&[]) {
            RegressionOutcome::Unavailable { reason } => {
                assert!(reason.contains("no observations"));
            }
            RegressionOutcome::Fitted { .. } => panic!("expected an unavailable fit"),
        }
    }
}
