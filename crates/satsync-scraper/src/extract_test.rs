use super::*;

fn extractor() -> Extractor {
    Extractor::new("тов-").unwrap()
}

const RESULTS_URL: &str = "https://nnv.saturn.net/catalog/?s=103516";

/// A results page with two structured containers; only one carries the
/// requested article.
fn results_page() -> Html {
    Html::parse_document(
        r#"<html><body>
        <div class="catalog-list">
          <div class="catalog-item">
            <a class="name" href="/catalog/pilomaterialy/brusok-40x40/">Брусок строганый сухой 40х40х3000</a>
            <span class="article">тов-103516</span>
            <span class="price" data-price="249.90">249,90 ₽</span>
          </div>
          <div class="catalog-item">
            <a class="name" href="/catalog/pilomaterialy/brusok-50x50/">Брусок строганый сухой 50х50х3000</a>
            <span class="article">тов-103517</span>
            <span class="price" data-price="319.00">319 ₽</span>
          </div>
        </div>
        </body></html>"#,
    )
}

// ---------------------------------------------------------------------------
// Strategy 1: container scan
// ---------------------------------------------------------------------------

#[test]
fn container_scan_returns_the_requested_article_only() {
    let outcome = extractor().scan_result_containers("103516", &results_page(), RESULTS_URL);
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(found.sku, "103516");
    assert!((found.price - 249.9).abs() < 1e-9);
    assert_eq!(found.name, "Брусок строганый сухой 40х40х3000");
    assert_eq!(found.availability, satsync_core::Availability::InStock);
    assert_eq!(found.confidence, satsync_core::MatchConfidence::Confirmed);
}

#[test]
fn container_scan_never_matches_a_neighbouring_article() {
    // 103518 is absent; 103516/103517 are present. No cross-match allowed.
    let outcome = extractor().scan_result_containers("103518", &results_page(), RESULTS_URL);
    assert!(matches!(outcome, StrategyOutcome::NotFound));
}

#[test]
fn container_scan_flags_out_of_stock() {
    let html = Html::parse_document(
        r#"<div class="catalog-item">
             <a class="name" href="/catalog/a/b/">Брусок строганый 20х40</a>
             <span class="article">тов-007556</span>
             <span class="not-available">Нет в наличии</span>
             <span data-price="120">120 ₽</span>
           </div>"#,
    );
    let outcome = extractor().scan_result_containers("007556", &html, RESULTS_URL);
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(found.availability, satsync_core::Availability::OutOfStock);
}

#[test]
fn container_scan_skips_container_without_parseable_price() {
    let html = Html::parse_document(
        r#"<div class="catalog-item">
             <span class="article">тов-103516</span>
             <span data-price="по запросу">по запросу</span>
           </div>"#,
    );
    let outcome = extractor().scan_result_containers("103516", &html, RESULTS_URL);
    assert!(matches!(outcome, StrategyOutcome::NotFound));
}

#[test]
fn container_scan_uses_placeholder_when_name_is_noise() {
    let html = Html::parse_document(
        r#"<div class="catalog-item">
             <a class="name" href="/catalog/a/b/">шт.</a>
             <span class="article">тов-103516</span>
             <span data-price="249.90"></span>
           </div>"#,
    );
    let outcome = extractor().scan_result_containers("103516", &html, RESULTS_URL);
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    assert_eq!(found.name, "Товар 103516");
}

// ---------------------------------------------------------------------------
// Strategy 2: detail page
// ---------------------------------------------------------------------------

#[test]
fn detail_page_requires_literal_article_text() {
    // A priced page for a DIFFERENT product must be rejected even though it
    // has a perfectly extractable first price.
    let html = Html::parse_document(
        r#"<html><head><title>Брусок строганый сухой 50х50х3000</title></head>
        <body><h1>Брусок строганый сухой 50х50х3000</h1>
        <p>Артикул: тов-103517</p>
        <span data-price="319.00">319 ₽</span>
        </body></html>"#,
    );
    let outcome = extractor().extract_from_detail("103516", &html, "https://nnv.saturn.net/catalog/p/b/");
    assert!(matches!(outcome, StrategyOutcome::NotFound));
}

#[test]
fn detail_page_accepts_matching_article() {
    let html = Html::parse_document(
        r#"<html><head><title>Каталог</title></head>
        <body><h1>Брусок строганый сухой 40х40х3000</h1>
        <p>Артикул: тов-103516</p>
        <span data-price="249.90">249,90 ₽</span>
        </body></html>"#,
    );
    let outcome = extractor().extract_from_detail("103516", &html, "https://nnv.saturn.net/catalog/p/b/");
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    assert!((found.price - 249.9).abs() < 1e-9);
    assert_eq!(found.name, "Брусок строганый сухой 40х40х3000");
    assert_eq!(found.confidence, satsync_core::MatchConfidence::Confirmed);
}

#[test]
fn detail_page_name_falls_back_past_short_headings() {
    let html = Html::parse_document(
        r#"<html><head><title>Брусок строганый сухой 40х40х3000 купить в Нижнем Новгороде</title></head>
        <body><h1>Каталог</h1>
        <p>тов-103516</p>
        <span data-price="249.90"></span>
        </body></html>"#,
    );
    let outcome = extractor().extract_from_detail("103516", &html, "https://nnv.saturn.net/catalog/p/b/");
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    // h1 is too short to be a product title; the <title> wins.
    assert!(found.name.starts_with("Брусок строганый"));
}

// ---------------------------------------------------------------------------
// Strategy 3: text adjacency
// ---------------------------------------------------------------------------

#[test]
fn text_adjacency_finds_price_near_article_and_flags_heuristic() {
    let html = Html::parse_document(
        r#"<html><body>
        <table><tr>
          <td>тов-103516 Брусок строганый</td>
          <td><span data-price="249.90">249,90</span></td>
        </tr></table>
        </body></html>"#,
    );
    let outcome = extractor().scan_text_adjacency("103516", &html, RESULTS_URL);
    let StrategyOutcome::Matched(found) = outcome else {
        panic!("expected a match");
    };
    assert!((found.price - 249.9).abs() < 1e-9);
    assert_eq!(found.confidence, satsync_core::MatchConfidence::Heuristic);
    assert_eq!(found.availability, satsync_core::Availability::Unknown);
}

#[test]
fn text_adjacency_gives_up_beyond_ancestor_bound() {
    // The article text and the priced element only share the <body>, which
    // sits more than ten levels above the text node.
    let mut deep = String::from("<html><body><span data-price=\"99\"></span>");
    for _ in 0..12 {
        deep.push_str("<div>");
    }
    deep.push_str("тов-103516");
    for _ in 0..12 {
        deep.push_str("</div>");
    }
    deep.push_str("</body></html>");

    let html = Html::parse_document(&deep);
    let outcome = extractor().scan_text_adjacency("103516", &html, RESULTS_URL);
    assert!(matches!(outcome, StrategyOutcome::NotFound));
}

#[test]
fn absent_article_is_not_found_across_all_strategies() {
    let html = Html::parse_document(
        r"<html><body><p>По вашему запросу ничего не найдено</p></body></html>",
    );
    let ex = extractor();
    assert!(matches!(
        ex.scan_result_containers("103516", &html, RESULTS_URL),
        StrategyOutcome::NotFound
    ));
    assert!(matches!(
        ex.extract_from_detail("103516", &html, RESULTS_URL),
        StrategyOutcome::NotFound
    ));
    assert!(matches!(
        ex.scan_text_adjacency("103516", &html, RESULTS_URL),
        StrategyOutcome::NotFound
    ));
    assert!(ex.product_links(&html).is_empty());
}

// ---------------------------------------------------------------------------
// Link detection
// ---------------------------------------------------------------------------

#[test]
fn product_links_are_collected_deduplicated_and_bounded() {
    let html = Html::parse_document(
        r#"<body>
        <a href="/catalog/pilomaterialy/brusok-40x40/">a</a>
        <a href="/catalog/pilomaterialy/brusok-40x40/">duplicate</a>
        <a href="/catalog/pilomaterialy/">section, not product</a>
        <a href="/catalog/a/b/">b</a>
        <a href="/catalog/c/d/">c</a>
        <a href="/catalog/e/f/">beyond the bound</a>
        <a href="/o-kompanii/">unrelated</a>
        </body>"#,
    );
    let links = extractor().product_links(&html);
    assert_eq!(
        links,
        vec![
            "/catalog/pilomaterialy/brusok-40x40/",
            "/catalog/a/b/",
            "/catalog/c/d/",
        ]
    );
}

#[test]
fn product_link_shape_checks() {
    assert!(is_product_link("/catalog/pilomaterialy/brusok-40x40/"));
    assert!(is_product_link(
        "https://nnv.saturn.net/catalog/pilomaterialy/brusok-40x40/"
    ));
    assert!(is_product_link("/catalog/a/b/?from=search"));
    assert!(!is_product_link("/catalog/pilomaterialy/"));
    assert!(!is_product_link("/catalog/a/b/c/"));
    assert!(!is_product_link("/catalog/a/b"));
    assert!(!is_product_link("/news/2024/"));
}
