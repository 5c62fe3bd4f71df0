//! Batch pipeline and quality gate behaviour
use std::sync::Arc;

use pharma_catalog_lib::application::{BatchRunner, PageInput, ProductExtractor};
use pharma_catalog_lib::domain::services::{Gate, QualityTracker};
use pharma_catalog_lib::infrastructure::{AppConfig, QualityConfig};
use pharma_catalog_lib::{CanonicalProduct, ValidationIssue};
use proptest::prelude::*;
use rstest::rstest;

const PROMOTIONAL: &str = include_str!("fixtures/promotional.html");
const REGULAR: &str = include_str!("fixtures/regular.html");

fn runner() -> BatchRunner {
    let extractor = Arc::new(ProductExtractor::new(&AppConfig::default()).unwrap());
    BatchRunner::new(extractor, QualityConfig::default())
}

fn product(i: usize) -> CanonicalProduct {
    CanonicalProduct { handle: format!("product-{}", i), sku: format!("SKU-{}", i), ..CanonicalProduct::default() }
}

#[rstest]
#[case(6, 100, 0.06, Gate::Fail)]
#[case(5, 100, 0.05, Gate::Pass)]
#[case(1, 19, 1.0 / 19.0, Gate::Pass)]
#[case(1, 2, 0.5, Gate::Fail)]
fn gate_arithmetic(#[case] errors: usize, #[case] total: usize, #[case] rate: f64, #[case] expected: Gate) {
    let mut tracker = QualityTracker::new(QualityConfig::default());
    for i in 0..total {
        let issues = if i < errors { vec![ValidationIssue::error("sku", "missing")] } else { vec![] };
        tracker.record(&product(i), &issues).unwrap();
    }
    let snapshot = tracker.finalize();
    assert_eq!(snapshot.total, total);
    assert_eq!(snapshot.errors, errors);
    assert!((snapshot.error_rate - rate).abs() < 1e-9, "error_rate {}", snapshot.error_rate);
    assert_eq!(snapshot.gate, expected);
}

#[test]
fn clean_batch_passes_and_counts_duplicates() {
    let runner = runner();
    let pages = vec![
        PageInput::new("https://benu.bg/la-roche-posay-effaclar-duo-40ml", PROMOTIONAL),
        PageInput::new("https://benu.bg/aspirin-500-mg-x20", REGULAR),
        PageInput::new("https://benu.bg/aspirin-500-mg-x20", REGULAR),
    ];
    let result = runner.run(&pages).unwrap();
    assert_eq!(result.succeeded(), 3);

    let snapshot = runner.finalize();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.errors, 0);
    assert_eq!(snapshot.gate, Gate::Pass);
    assert_eq!(snapshot.duplicate_handles, vec!["aspirin-500-mg-x20".to_string()]);
    assert_eq!(snapshot.duplicate_skus, vec!["ASP-500".to_string()]);
    assert_eq!(snapshot.price_min, Some(8.31));
    assert_eq!(snapshot.price_max, Some(35.19));
}

#[test]
fn chunks_accumulate_into_one_snapshot() {
    let runner = runner();
    runner.run(&[PageInput::new("https://benu.bg/a", REGULAR)]).unwrap();
    runner.run(&[PageInput::new("https://benu.bg/b", "")]).unwrap();

    let snapshot = runner.finalize();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.errors, 1);
    assert_eq!(snapshot.gate, Gate::Fail);
    assert!(snapshot.render_report().contains("Quality Report  [FAIL]"));
}

fn component_page(price: f64, discounted: f64) -> String {
    format!(
        r#"<html><body><h1>Продукт</h1><add-to-cart :product='{{"variants":[{{"price":{:.2},"discountedPrice":{:.2}}}]}}'></add-to-cart></body></html>"#,
        price, discounted
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn compare_at_only_when_strictly_above_selling_price(
        price in 1u32..100_000,
        discounted in 1u32..100_000,
    ) {
        let (price, discounted) = (f64::from(price) / 100.0, f64::from(discounted) / 100.0);
        let extractor = ProductExtractor::new(&AppConfig::default()).unwrap();
        let outcome = extractor.extract("https://benu.bg/p", component_page(price, discounted)).unwrap();
        let p = outcome.product;

        prop_assert_eq!(p.price_eur, Some(discounted));
        match p.compare_at_price_eur {
            Some(compare_at) => {
                prop_assert!(compare_at > discounted);
                prop_assert_eq!(compare_at, price);
            }
            None => prop_assert!(price <= discounted),
        }
    }

    #[test]
    fn gate_fails_iff_error_rate_exceeds_threshold(total in 1usize..200, errors_seed in 0usize..200) {
        let errors = errors_seed % (total + 1);
        let mut tracker = QualityTracker::new(QualityConfig::default());
        for i in 0..total {
            let issues = if i < errors { vec![ValidationIssue::error("brand", "missing")] } else { vec![] };
            tracker.record(&product(i), &issues).unwrap();
        }
        let snapshot = tracker.finalize();
        let expected = if errors as f64 / total as f64 > 0.05 { Gate::Fail } else { Gate::Pass };
        prop_assert_eq!(snapshot.gate, expected);
        prop_assert_eq!(snapshot.valid + snapshot.errors, total);
    }
}
