//! Full search-to-download flow against mock arXiv endpoints:
//! search, cache, select, batch download, citations, history.

use std::time::Duration;

use paperhaul::fetch::{ArxivClient, SearchRequest};
use paperhaul::interactions::ActionKind;
use paperhaul::{
    CancelToken, Database, DownloadEngine, HttpClient, InteractionLog, PaperRecord, ResultsCache,
    RetryPolicy, SearchSession,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn feed(server_uri: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v5</id>
    <title>Attention Is All You Need</title>
    <summary>The dominant sequence transduction models.</summary>
    <published>2017-06-12T17:57:34Z</published>
    <author><name>Ashish Vaswani</name></author>
    <link title="pdf" href="{server_uri}/pdf/1706.03762.pdf" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <title>BERT: Pre-training of Deep Bidirectional Transformers</title>
    <summary>We introduce a new language representation model.</summary>
    <published>2018-10-11T00:50:01Z</published>
    <author><name>Jacob Devlin</name></author>
    <link title="pdf" href="{server_uri}/pdf/1810.04805.pdf" rel="related" type="application/pdf"/>
  </entry>
</feed>"#
    )
}

#[tokio::test]
async fn test_search_cache_download_cite_record() {
    let server = MockServer::start().await;
    let uri = server.uri();

    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("search_query", "transformers"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed(&uri)))
        .expect(1)
        .mount(&server)
        .await;
    for id in ["1706.03762", "1810.04805"] {
        Mock::given(method("GET"))
            .and(path(format!("/pdf/{id}.pdf")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'%'; 11 * 1024]))
            .mount(&server)
            .await;
    }

    // Search
    let arxiv = ArxivClient::new().with_base_url(format!("{uri}/api/query"));
    let records = arxiv
        .search(&SearchRequest::new("transformers"))
        .await
        .unwrap();
    assert_eq!(records.len(), 2);

    // Cache round trip: the second lookup never hits the API
    // (Mock expect(1) verifies that).
    let db = Database::new_in_memory().await.unwrap();
    let cache = ResultsCache::new(db.clone());
    cache.put("transformers", &records).await.unwrap();
    let cached = cache.get("transformers").await.unwrap().unwrap();
    assert_eq!(cached, records);

    // Download the cached records
    let engine = DownloadEngine::new(
        2,
        RetryPolicy::new(3, Duration::from_millis(10)),
        HttpClient::new(),
    )
    .unwrap();
    let root = tempfile::tempdir().unwrap();
    let batch = engine
        .download_batch(&cached, "transformers", root.path(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(batch.succeeded(), 2);
    assert!(batch.folder.join("Attention Is All You Need.pdf").exists());

    // Citation file covers both papers with their metadata
    let bib = std::fs::read_to_string(batch.citation_file.unwrap()).unwrap();
    assert!(bib.contains("title = {Attention Is All You Need}"));
    assert!(bib.contains("year = {2017}"));
    assert!(bib.contains("year = {2018}"));

    // Record interactions for the successful downloads
    let history = InteractionLog::new(db.clone());
    for result in batch.outcomes.iter().filter(|r| r.is_success()) {
        history
            .record("local", &result.arxiv_id, ActionKind::Download)
            .await
            .unwrap();
    }
    let count: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM user_interactions WHERE action = 'download'",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(count.0, 2);
}

fn paper(id: &str, title: &str) -> PaperRecord {
    PaperRecord {
        title: title.to_string(),
        authors: vec![],
        published: "2024-01-01".to_string(),
        summary: String::new(),
        arxiv_id: id.to_string(),
        pdf_url: None,
        category: None,
    }
}

#[tokio::test]
async fn test_explicit_selection_is_recorded_per_paper() {
    let db = Database::new_in_memory().await.unwrap();
    let history = InteractionLog::new(db.clone());

    let records = vec![
        paper("1706.03762", "Attention Is All You Need"),
        paper("1810.04805", "BERT"),
    ];
    let mut session = SearchSession::new("transformers", records);
    session.select("1810.04805");

    // Picking a subset is a user action; it lands in the history even if
    // the download never happens.
    for record in session.selected_records() {
        history
            .record_best_effort("local", &record.arxiv_id, ActionKind::Select)
            .await;
    }

    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT paper_id FROM user_interactions WHERE action = 'select'")
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(rows, vec![("1810.04805".to_string(),)]);
}
