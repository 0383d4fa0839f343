//! Property-based tests using proptest.
//!
//! These check invariants over generated inputs rather than specific values:
//!   - ID normalization scales numeric suffixes and rejects garbage
//!   - heritability samples stay in [0, 1] for non-negative variances
//!   - completed pedigrees have no dangling parents
//!   - HPD intervals lie within the sample range
//!   - effective sample sizes are finite and non-negative

use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use herit_core::diagnostics::hpd::hpd_interval;
use herit_core::diagnostics::spectrum::effective_size;
use herit_core::heritability::heritability_chain;
use herit_core::pedigree::Pedigree;
use herit_data::ids::{IdError, IdNormalizer};
use herit_data::tables::PedigreeRow;

// ---------------------------------------------------------------------------
// 1. ID normalization
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_normalize_scales_suffix(
        prefix in "[A-Z]{1,3}",
        sep in prop::sample::select(vec!["", "-", "_", "."]),
        n in 1i64..1_000_000,
    ) {
        let normalizer = IdNormalizer::default();
        let raw = format!("{}{}{}", prefix, sep, n);
        prop_assert_eq!(normalizer.normalize(&raw).unwrap(), n * 1000);
    }

    #[test]
    fn prop_explicit_prefixes(n in 1i64..100_000) {
        let normalizer = IdNormalizer::with_prefixes(["LS", "RS"], 1000);
        let ls = format!("LS{}", n);
        let rs = format!("RS-{}", n);
        let unknown = format!("XX{}", n);
        prop_assert_eq!(normalizer.normalize(&ls).unwrap(), n * 1000);
        prop_assert_eq!(normalizer.normalize(&rs).unwrap(), n * 1000);
        prop_assert!(normalizer.normalize(&unknown).is_err());
    }

    #[test]
    fn prop_zero_suffix_fails(
        prefix in "[A-Z]{1,3}",
        zeros in 1usize..5,
    ) {
        let normalizer = IdNormalizer::default();
        let raw = format!("{}-{}", prefix, "0".repeat(zeros));
        let is_zero = matches!(normalizer.normalize(&raw), Err(IdError::Zero { .. }));
        prop_assert!(is_zero);
    }

    #[test]
    fn prop_non_numeric_suffix_fails(
        prefix in "[A-Z]{1,3}",
        junk in "[0-9]{0,3}[a-z!#][0-9a-z]{0,3}",
    ) {
        let normalizer = IdNormalizer::default();
        let raw = format!("{}-{}", prefix, junk);
        prop_assert!(normalizer.normalize(&raw).is_err());
        // Deterministic failure.
        prop_assert_eq!(normalizer.normalize(&raw), normalizer.normalize(&raw));
    }
}

// ---------------------------------------------------------------------------
// 2. Heritability bounds
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_heritability_in_unit_interval(
        pairs in prop::collection::vec((0.0f64..100.0, 0.001f64..100.0), 1..200),
    ) {
        let (a, r): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let h = heritability_chain(&a, &r).unwrap();
        prop_assert_eq!(h.len(), a.len());
        for (i, &v) in h.iter().enumerate() {
            prop_assert!((0.0..=1.0).contains(&v), "h2[{}] = {}", i, v);
            prop_assert_eq!(v, a[i] / (a[i] + r[i]));
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Pedigree completion leaves no dangling references
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_completion_no_dangling(
        n in 1usize..40,
        n_dams in 1i64..8,
        with_sires in any::<bool>(),
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        // Offspring IDs below 1_000_000, parent IDs above, so no cycles.
        let rows: Vec<PedigreeRow> = (0..n)
            .map(|i| PedigreeRow {
                animal: (i as i64 + 1) * 1000,
                dam: Some(1_000_000 + rng.gen_range(0..n_dams) * 1000),
                sire: if with_sires && rng.gen_bool(0.5) {
                    Some(2_000_000 + rng.gen_range(0..3) * 1000)
                } else {
                    None
                },
            })
            .collect();

        let mut pedigree = Pedigree::from_rows(rows.clone());
        pedigree.sort_by_id();
        let completed = pedigree.complete(None);
        prop_assert!(completed.validate().is_ok());
        prop_assert!(completed.missing_parents().is_empty());

        for row in completed.rows() {
            for parent in row.parents() {
                prop_assert!(completed.contains(parent));
            }
        }
        for row in &rows {
            prop_assert_eq!(completed.get(row.animal), Some(row));
        }
        let added = completed.len() - rows.len();
        prop_assert_eq!(added, completed.stats().n_founders);
    }
}

// ---------------------------------------------------------------------------
// 4. Chain summaries
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_hpd_within_range(
        x in prop::collection::vec(-1e3f64..1e3, 1..300),
        prob in 0.5f64..0.99,
    ) {
        let (lo, hi) = hpd_interval(&x, prob).unwrap();
        let min = x.iter().copied().fold(f64::INFINITY, f64::min);
        let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(lo <= hi);
        prop_assert!(min <= lo && hi <= max);
    }

    #[test]
    fn prop_ess_finite_non_negative(
        n in 2usize..500,
        rho in -0.9f64..0.95,
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut prev = 0.0;
        let x: Vec<f64> = (0..n)
            .map(|_| {
                prev = rho * prev + rng.gen::<f64>() - 0.5;
                prev
            })
            .collect();
        let ess = effective_size(&x);
        prop_assert!(ess.is_finite());
        prop_assert!(ess >= 0.0);
    }
}
