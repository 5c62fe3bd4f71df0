//! End-to-end extraction over saved product pages
use pharma_catalog_lib::application::ProductExtractor;
use pharma_catalog_lib::domain::product::section_keys;
use pharma_catalog_lib::domain::{ProductField, SourceKind};
use pharma_catalog_lib::infrastructure::AppConfig;
use pharma_catalog_lib::{ExtractionError, ExtractionOutcome};
use rstest::{fixture, rstest};

const PROMOTIONAL: &str = include_str!("fixtures/promotional.html");
const REGULAR: &str = include_str!("fixtures/regular.html");
const BARCODE_CONFLICT: &str = include_str!("fixtures/barcode_conflict.html");

#[fixture]
fn extractor() -> ProductExtractor {
    let mut config = AppConfig::default();
    config.extraction.known_brands = ["La Roche-Posay", "Nivea", "Vichy", "Bayer"]
        .iter()
        .map(|b| b.to_string())
        .collect();
    ProductExtractor::new(&config).unwrap()
}

fn checks(outcome: &ExtractionOutcome) -> Vec<&str> {
    outcome.findings.iter().map(|f| f.check.as_str()).collect()
}

#[rstest]
fn promotional_product_uses_component_prices(extractor: ProductExtractor) {
    let outcome = extractor
        .extract("https://benu.bg/la-roche-posay-effaclar-duo-40ml", PROMOTIONAL)
        .unwrap();
    let p = &outcome.product;

    assert_eq!(p.price_eur, Some(17.99));
    assert_eq!(p.price, Some(35.19));
    assert_eq!(p.compare_at_price_eur, Some(25.17));
    assert_eq!(p.compare_at_price, Some(49.23));
    assert!(p.is_on_promotion());
    assert!(!p.price_fallback_used);

    assert_eq!(p.title, "La Roche-Posay Effaclar Duo+ крем 40ml");
    assert_eq!(p.brand, "La Roche-Posay");
    assert_eq!(p.sku, "LRP-EFF-40");
    assert_eq!(p.barcode, "3337875598071");
    assert_eq!(p.category_path, vec!["Козметика", "Грижа за лице"]);
    assert_eq!(p.tags, p.category_path);
    assert_eq!(p.product_type, "Козметика");
    assert_eq!(p.availability, "В наличност");
    assert_eq!(p.handle, "la-roche-posay-effaclar-duo-40ml");
    assert_eq!(p.weight_grams, 60);
    assert_eq!(p.application_form, "Крем");
    assert_eq!(p.google_age_group, "adult");
    assert_eq!(p.google_product_category, "Health & Beauty > Health Care > Pharmacy");
    assert_eq!(p.google_mpn, "LRP-EFF-40");

    assert_eq!(p.images.len(), 1);
    assert!(p.images[0].source_url.ends_with("/images/products/12/effaclar-duo.webp"));
    assert_eq!(p.images[0].alt_text, "La Roche-Posay Effaclar Duo+ крем 40ml");

    assert_eq!(p.sections.get(section_keys::COMPOSITION), "Niacinamide, Piroctone Olamine");
    assert_eq!(p.sections.get(section_keys::MORE_INFO), "Баркод: 3337875598071");
    assert!(p.description.contains("<h3>Противопоказания</h3>"));
    assert!(p.seo_title.ends_with("| ViaPharma"));
    assert!(p.seo_description.starts_with("Купете La Roche-Posay Effaclar Duo+"));

    assert_eq!(p.extraction_method.source_of(ProductField::Price), Some(SourceKind::Component));
    assert_eq!(p.extraction_method.source_of(ProductField::Brand), Some(SourceKind::StructuredData));
    assert_eq!(p.extraction_method.source_of(ProductField::Weight), Some(SourceKind::Dom));

    assert!(outcome.findings.is_empty(), "{:?}", outcome.findings);
    assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
}

#[rstest]
fn regular_product_has_no_compare_at(extractor: ProductExtractor) {
    let outcome = extractor.extract("https://benu.bg/aspirin-500-mg-x20", REGULAR).unwrap();
    let p = &outcome.product;

    assert_eq!(p.price_eur, Some(4.25));
    assert_eq!(p.price, Some(8.31));
    assert_eq!(p.compare_at_price, None);
    assert_eq!(p.compare_at_price_eur, None);
    assert_eq!(p.brand, "Bayer");
    assert_eq!(p.category_path, vec!["Лекарства без рецепта", "Болка и температура"]);
    assert_eq!(p.application_form, "Таблетки");
    assert_eq!(p.weight_grams, 0);
    assert_eq!(p.sections.get(section_keys::CONTRAINDICATIONS), "Деца под 16 години.");
    assert_eq!(p.sections.get(section_keys::USAGE), "");

    assert!(outcome.findings.is_empty(), "{:?}", outcome.findings);
    assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
}

#[rstest]
fn malformed_component_falls_back_to_structured_data(extractor: ProductExtractor) {
    let broken = REGULAR.replace(
        "{&quot;variants&quot;:[{&quot;price&quot;:4.25,&quot;discountedPrice&quot;:4.25}]}",
        "{&quot;variants&quot;:[{&quot;price&quot;:4.25,",
    );
    let outcome = extractor.extract("https://benu.bg/aspirin-500-mg-x20", broken).unwrap();
    let p = &outcome.product;

    assert_eq!(p.price_eur, Some(4.25));
    assert!(p.price_fallback_used);
    assert_eq!(p.extraction_method.source_of(ProductField::Price), Some(SourceKind::StructuredData));
    assert_eq!(p.compare_at_price, None);
    assert!(checks(&outcome).is_empty());
}

#[rstest]
fn escaped_quotes_in_json_ld_text_keep_the_block(extractor: ProductExtractor) {
    let quoted = REGULAR.replace(
        r#""brand":"Bayer","#,
        r#""brand":"Bayer","description":"Таблетки &quot;Аспирин&quot; за болка","#,
    );
    let outcome = extractor.extract("https://benu.bg/aspirin-500-mg-x20", quoted).unwrap();
    let p = &outcome.product;

    assert_eq!(p.sku, "ASP-500");
    assert_eq!(p.barcode, "3800123456789");
    assert_eq!(p.extraction_method.source_of(ProductField::Sku), Some(SourceKind::StructuredData));
    assert_eq!(p.category_path, vec!["Лекарства без рецепта", "Болка и температура"]);
}

#[rstest]
fn barcode_conflict_keeps_structured_data_and_warns(extractor: ProductExtractor) {
    let outcome = extractor.extract("https://benu.bg/nivea-creme-150ml", BARCODE_CONFLICT).unwrap();

    assert_eq!(outcome.product.barcode, "4005808158409");
    assert_eq!(checks(&outcome), vec!["barcode", "section_composition"]);
    assert!(outcome.findings.iter().all(|f| f.severity == pharma_catalog_lib::domain::IssueSeverity::Warning));
    assert!(outcome.has_errors());
}

#[rstest]
fn mpn_is_never_a_barcode(extractor: ProductExtractor) {
    let without_gtin = BARCODE_CONFLICT.replace(r#""gtin13":"4005808158409","#, "");
    let outcome = extractor.extract("https://benu.bg/nivea-creme-150ml", without_gtin).unwrap();

    assert_eq!(outcome.product.barcode, "4005808158416");
    assert_eq!(outcome.product.extraction_method.source_of(ProductField::Barcode), Some(SourceKind::Dom));
    assert!(!checks(&outcome).contains(&"barcode"));
}

#[rstest]
fn extraction_is_deterministic(extractor: ProductExtractor) {
    let first = extractor.extract("https://benu.bg/x", PROMOTIONAL).unwrap();
    let second = extractor.extract("https://benu.bg/x", PROMOTIONAL).unwrap();
    assert_eq!(first.product, second.product);
    assert_eq!(first.findings, second.findings);
    assert_eq!(first.issues, second.issues);
}

#[rstest]
#[case("")]
#[case("   \n  ")]
#[case("plain text, no markup")]
fn empty_documents_fail_the_page(extractor: ProductExtractor, #[case] markup: &str) {
    let err = extractor.extract("https://benu.bg/x", markup).unwrap_err();
    assert!(matches!(err, ExtractionError::EmptyDocument { .. }));
}
