//! End-to-end runs of the scrape pipeline against in-memory sites.

use super::testing::{AlphaEngine, BetaEngine, MockTransport, detail, listing};
use super::*;
use std::sync::Arc;
use std::time::Duration;

const SEARCH: &str = "https://alpha.test/search?q=jumanji";

fn scraper(transport: &Arc<MockTransport>) -> Scraper {
    Scraper::new(Arc::clone(transport) as Arc<dyn Transport>)
}

fn alpha_search_site() -> MockTransport {
    MockTransport::new()
        .with_page(
            SEARCH,
            listing(&[
                ("Jumanji", "/m/1"),
                ("Jumanji 2", "/m/2"),
                ("Zathura", "/m/3"),
            ]),
        )
        .with_page(
            "https://alpha.test/m/1",
            detail(r#"<span class="size">700 MB</span><a class="file" href="/f/1.mp4">dl</a>"#),
        )
        .with_page(
            "https://alpha.test/m/2",
            detail(r#"<span class="size">1.2 GB</span><a class="file" href="/f/2.mp4">dl</a>"#),
        )
        .with_page(
            "https://alpha.test/m/3",
            detail(r#"<span class="size">650 MB</span><a class="file" href="/f/3.mp4">dl</a>"#),
        )
}

#[tokio::test]
async fn test_search_enriches_every_item() {
    let transport = Arc::new(alpha_search_site());
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.query, "jumanji");
    assert_eq!(result.titles(), vec!["Jumanji", "Jumanji 2", "Zathura"]);

    let indices: Vec<usize> = result.movies.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    for movie in &result.movies {
        assert_eq!(movie.enrichment, Enrichment::Enriched);
        assert_eq!(movie.source, "Alpha");
    }
    assert_eq!(result.movies[1].size, "1.2 GB");
    assert_eq!(
        result.movies[2].download_link.as_ref().unwrap().as_str(),
        "https://alpha.test/f/3.mp4"
    );
}

#[tokio::test]
async fn test_every_record_is_updated_by_its_own_detail_page() {
    let transport = Arc::new(alpha_search_site().with_delay(Duration::from_millis(5)));
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    let links: Vec<&str> = result
        .movies
        .iter()
        .map(|m| m.download_link.as_ref().unwrap().as_str())
        .collect();
    assert_eq!(
        links,
        vec![
            "https://alpha.test/f/1.mp4",
            "https://alpha.test/f/2.mp4",
            "https://alpha.test/f/3.mp4",
        ]
    );
}

#[tokio::test]
async fn test_unparseable_item_is_skipped_without_gap() {
    let transport = Arc::new(
        MockTransport::new().with_page(
            SEARCH,
            listing(&[("Jumanji", "/m/1"), ("BROKEN", "/m/x"), ("Zathura", "/m/3")]),
        ),
    );
    let movies = scraper(&transport)
        .scrape(&AlphaEngine::new(), &ScrapeRequest::search("jumanji", 1))
        .await
        .unwrap();

    let indices: Vec<usize> = movies.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(movies[1].title, "Zathura");
    assert_eq!(transport.fetch_count("https://alpha.test/m/x"), 0);
}

#[tokio::test]
async fn test_failed_detail_fetch_keeps_provisional_record() {
    let transport = Arc::new(alpha_search_site().with_error("https://alpha.test/m/2", "timeout"));
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    let failed = result.get_by_title("Jumanji 2").unwrap();
    assert_eq!(failed.enrichment, Enrichment::Provisional);
    assert!(failed.size.is_empty());
    assert_eq!(
        failed.download_link.as_ref().unwrap().as_str(),
        "https://alpha.test/m/2"
    );
    assert_eq!(
        result.get_by_title("Zathura").unwrap().enrichment,
        Enrichment::Enriched
    );
}

#[tokio::test]
async fn test_binary_detail_response_is_not_parsed() {
    let transport = Arc::new(
        MockTransport::new()
            .with_page(SEARCH, listing(&[("Jumanji", "/m/1.mp4")]))
            .with_binary("https://alpha.test/m/1.mp4"),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result.movies[0].enrichment, Enrichment::Provisional);
    assert_eq!(transport.fetch_count("https://alpha.test/m/1.mp4"), 1);
}

#[tokio::test]
async fn test_nested_chain_completes_before_return() {
    let transport = Arc::new(
        MockTransport::new()
            .with_delay(Duration::from_millis(2))
            .with_page(SEARCH, listing(&[("Jumanji", "/m/1")]))
            .with_page(
                "https://alpha.test/m/1",
                detail(r#"<a class="next" href="/dl/1">download page</a>"#),
            )
            .with_page(
                "https://alpha.test/dl/1",
                detail(r#"<a class="next" href="/host/1">mirror</a>"#),
            )
            .with_page(
                "https://alpha.test/host/1",
                detail(
                    r#"<span class="size">700 MB</span><a class="file" href="https://cdn.test/1.mp4">go</a>"#,
                ),
            ),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    let movie = &result.movies[0];
    assert_eq!(movie.size, "700 MB");
    assert_eq!(
        movie.download_link.as_ref().unwrap().as_str(),
        "https://cdn.test/1.mp4"
    );
    assert_eq!(
        transport.fetched(),
        vec![
            SEARCH,
            "https://alpha.test/m/1",
            "https://alpha.test/dl/1",
            "https://alpha.test/host/1",
        ]
    );
}

#[tokio::test]
async fn test_link_cycle_is_visited_once() {
    let transport = Arc::new(
        MockTransport::new()
            .with_page(SEARCH, listing(&[("Jumanji", "/m/1")]))
            .with_page(
                "https://alpha.test/m/1",
                detail(r#"<a class="next" href="/m/2">a</a>"#),
            )
            .with_page(
                "https://alpha.test/m/2",
                detail(r#"<a class="next" href="/m/1">b</a>"#),
            ),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(transport.fetch_count("https://alpha.test/m/1"), 1);
    assert_eq!(transport.fetch_count("https://alpha.test/m/2"), 1);
}

#[tokio::test]
async fn test_chain_stops_at_max_depth() {
    let mut site = MockTransport::new().with_page(SEARCH, listing(&[("Jumanji", "/d/0")]));
    for depth in 0..10 {
        site = site.with_page(
            &format!("https://alpha.test/d/{depth}"),
            detail(&format!(r#"<a class="next" href="/d/{}">next</a>"#, depth + 1)),
        );
    }
    let transport = Arc::new(site);
    let config = ScraperConfig {
        max_detail_depth: 2,
        ..ScraperConfig::default()
    };
    let scraper = Scraper::with_config(Arc::clone(&transport) as Arc<dyn Transport>, config);

    scraper
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    // depth 0, 1 and 2
    assert_eq!(transport.fetched().len(), 1 + 3);
    assert_eq!(transport.fetch_count("https://alpha.test/d/3"), 0);
}

#[tokio::test]
async fn test_detail_fetches_respect_concurrency_limit() {
    let items: Vec<(String, String)> = (0..12)
        .map(|i| (format!("Movie {i}"), format!("/m/{i}")))
        .collect();
    let borrowed: Vec<(&str, &str)> = items
        .iter()
        .map(|(t, h)| (t.as_str(), h.as_str()))
        .collect();
    let mut site = MockTransport::new()
        .with_delay(Duration::from_millis(10))
        .with_page(SEARCH, listing(&borrowed));
    for i in 0..12 {
        site = site.with_page(
            &format!("https://alpha.test/m/{i}"),
            detail(r#"<span class="size">1 MB</span>"#),
        );
    }
    let transport = Arc::new(site);
    let config = ScraperConfig {
        max_concurrent_requests: 3,
        ..ScraperConfig::default()
    };
    let scraper = Scraper::with_config(Arc::clone(&transport) as Arc<dyn Transport>, config);

    let result = scraper
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.len(), 12);
    assert!(result.movies.iter().all(|m| m.size == "1 MB"));
    assert!(transport.peak_in_flight() <= 3);
}

#[tokio::test]
async fn test_primary_fetch_failure_fails_run() {
    let transport = Arc::new(MockTransport::new().with_error(SEARCH, "connection refused"));
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await;

    assert!(matches!(result, Err(EngineError::Transport(_))));
    assert_eq!(transport.fetched().len(), 1);
}

#[tokio::test]
async fn test_empty_listing_is_empty_result() {
    let transport = Arc::new(
        MockTransport::new().with_page(SEARCH, "<html><body><p>No results</p></body></html>"),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(transport.fetched(), vec![SEARCH]);
}

#[tokio::test]
async fn test_series_episodes_and_partial_series() {
    let listing = r#"<html><body><ul class="results">
        <li class="item" data-series="1"><a href="/s/1">Lost</a></li>
        <li class="item" data-series="1"><a href="/s/2">Fringe</a></li>
    </ul></body></html>"#;
    let transport = Arc::new(
        MockTransport::new()
            .with_page(SEARCH, listing)
            .with_page(
                "https://alpha.test/s/1",
                detail(
                    r#"<ul><li class="episode"><a href="/e/1">Episode 01</a></li>
                       <li class="episode"><a href="/e/2">Episode 02</a></li></ul>"#,
                ),
            )
            .with_page("https://alpha.test/s/2", detail("<p>nothing here</p>")),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    let lost = result.get_by_title("Lost").unwrap();
    assert!(lost.is_series);
    assert_eq!(lost.enrichment, Enrichment::Enriched);
    assert_eq!(
        lost.series_download_links.keys().collect::<Vec<_>>(),
        vec!["Episode 01", "Episode 02"]
    );

    let fringe = result.get_by_title("Fringe").unwrap();
    assert!(fringe.series_download_links.is_empty());
    assert_eq!(fringe.enrichment, Enrichment::Partial);
}

#[tokio::test]
async fn test_duplicated_listing_links_are_fetched_once() {
    let transport = Arc::new(
        MockTransport::new()
            .with_page(
                SEARCH,
                listing(&[("Jumanji", "/m/1"), ("Jumanji (mirror)", "/m/1")]),
            )
            .with_page("https://alpha.test/m/1", detail("<p></p>")),
    );
    let result = scraper(&transport)
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.titles(), vec!["Jumanji"]);
    assert_eq!(transport.fetch_count("https://alpha.test/m/1"), 1);
}

#[tokio::test]
async fn test_list_mode_uses_listing_url_and_label() {
    let transport = Arc::new(
        MockTransport::new()
            .with_page("https://alpha.test/latest/2", listing(&[("Recent", "/m/9")]))
            .with_page("https://alpha.test/m/9", detail("<p></p>")),
    );
    let result = scraper(&transport)
        .list(&AlphaEngine::new(), 2)
        .await
        .unwrap();

    assert_eq!(result.query, "List of Recent Uploads - Page 2");
    assert_eq!(result.titles(), vec!["Recent"]);
}

#[tokio::test]
async fn test_unsupported_mode_is_rejected_before_fetching() {
    let transport = Arc::new(MockTransport::new());
    let result = scraper(&transport).list(&BetaEngine::new(), 1).await;

    assert!(matches!(result, Err(EngineError::InvalidMode { .. })));
    assert!(transport.fetched().is_empty());
}

#[tokio::test]
async fn test_concurrent_runs_on_one_adapter_do_not_interfere() {
    let transport = Arc::new(
        alpha_search_site()
            .with_page("https://alpha.test/latest/1", listing(&[("Recent", "/m/9")]))
            .with_page("https://alpha.test/m/9", detail(r#"<span class="size">9 MB</span>"#)),
    );
    let scraper = scraper(&transport);
    let adapter = AlphaEngine::new();

    let (search, list) = tokio::join!(
        scraper.search(&adapter, "jumanji", 1),
        scraper.list(&adapter, 1)
    );

    assert_eq!(search.unwrap().len(), 3);
    let list = list.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.movies[0].size, "9 MB");
}

fn beta_search_site() -> MockTransport {
    MockTransport::new()
        .with_page(
            "https://beta.test/find?q=jumanji",
            r#"<div class="hits"><div class="hit"><a href="/h/1">Jumanji</a></div></div>"#,
        )
        .with_page("https://beta.test/h/1", detail(r#"<span class="size">1 GB</span>"#))
}

fn challenge_scraper(
    plain: &Arc<MockTransport>,
    challenge: &Arc<MockTransport>,
) -> Scraper {
    let config = ScraperConfig {
        challenge_engines: vec!["beta".to_string()],
        ..ScraperConfig::default()
    };
    let challenge = Arc::clone(challenge);
    let factory: TransportFactory =
        Arc::new(move || Ok(Arc::clone(&challenge) as Arc<dyn Transport>));

    Scraper::with_config(Arc::clone(plain) as Arc<dyn Transport>, config)
        .with_challenge_transport(factory)
}

#[tokio::test]
async fn test_challenge_transport_used_for_primary_and_released() {
    let plain = Arc::new(beta_search_site());
    let challenge = Arc::new(beta_search_site());
    let scraper = challenge_scraper(&plain, &challenge);

    let result = scraper
        .search(&BetaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert_eq!(result.movies[0].size, "1 GB");
    assert_eq!(challenge.fetched(), vec!["https://beta.test/find?q=jumanji"]);
    assert_eq!(plain.fetched(), vec!["https://beta.test/h/1"]);
    assert_eq!(challenge.releases(), 1);
    assert_eq!(plain.releases(), 0);
}

#[tokio::test]
async fn test_challenge_transport_released_on_failure() {
    let plain = Arc::new(MockTransport::new());
    let challenge = Arc::new(
        MockTransport::new().with_error("https://beta.test/find?q=jumanji", "solver timeout"),
    );
    let scraper = challenge_scraper(&plain, &challenge);

    let result = scraper.search(&BetaEngine::new(), "jumanji", 1).await;

    assert!(result.is_err());
    assert_eq!(challenge.releases(), 1);
}

#[tokio::test]
async fn test_challenge_transport_released_when_run_is_cancelled() {
    let plain = Arc::new(MockTransport::new());
    let challenge = Arc::new(beta_search_site().with_delay(Duration::from_millis(200)));
    let scraper = challenge_scraper(&plain, &challenge);

    let engine = BetaEngine::new();
    let run = scraper.search(&engine, "jumanji", 1);
    let outcome = tokio::time::timeout(Duration::from_millis(20), run).await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(challenge.releases(), 1);
    assert!(plain.fetched().is_empty());
}

#[tokio::test]
async fn test_challenge_transport_not_used_for_other_engines() {
    let plain = Arc::new(alpha_search_site());
    let challenge = Arc::new(MockTransport::new());
    let scraper = challenge_scraper(&plain, &challenge);

    scraper
        .search(&AlphaEngine::new(), "jumanji", 1)
        .await
        .unwrap();

    assert!(challenge.fetched().is_empty());
    assert_eq!(challenge.releases(), 0);
}

#[test]
fn test_registry_lookup_ignores_case() {
    let registry = create_default_registry();

    assert_eq!(registry.names(), vec!["fzmovies", "netnaija", "tvseries"]);
    assert_eq!(registry.lookup("NetNaija").unwrap().id(), "netnaija");
    assert_eq!(registry.lookup("FZMOVIES").unwrap().name(), "FzMovies");
    assert!(registry.contains("TvSeries"));
}

#[test]
fn test_registry_unknown_engine() {
    let registry = create_default_registry();

    match registry.lookup("piratebay") {
        Err(EngineError::UnknownEngine(name)) => assert_eq!(name, "piratebay"),
        other => panic!("unexpected: {:?}", other.map(|a| a.name())),
    }
}

#[test]
fn test_registry_custom_engine() {
    let mut registry = EngineRegistry::new();
    registry.register("Alpha", || Box::new(AlphaEngine::new()));

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.lookup("alpha").unwrap().summary(), "Alpha (https://alpha.test/)");
    assert_eq!(registry.list_all().len(), 1);
}

#[test]
fn test_get_by_title_prefers_lowest_index() {
    let result = SearchResult::new(
        "jumanji",
        vec![
            Movie::new(0, "Alpha").with_title("Jumanji").with_year(Some(1995)),
            Movie::new(1, "Alpha").with_title("Jumanji").with_year(Some(2017)),
        ],
    );

    assert_eq!(result.get_by_title("Jumanji").unwrap().year, Some(1995));
    assert_eq!(result.index_of_title("Jumanji").unwrap(), 0);
    assert!(matches!(
        result.get_by_title("Zathura"),
        Err(EngineError::NotFound(_))
    ));
}
