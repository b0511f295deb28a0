use pretty_assertions::assert_eq;
use serde_json::json;
use solr_client::{
    xml_update, Client, ClientConfig, Params, PingAction, PollPolicy, RequestHook, RequestStats,
    SolrError, Timeout, UpdatePayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn books_client(server: &MockServer) -> Client {
    let config = ClientConfig::with_connection_url(format!("{}/solr/books", server.uri()));
    Client::new(config).unwrap()
}

#[tokio::test]
async fn select_sends_json_request_api_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/books/select"))
        .and(query_param("wt", "json"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"params": {"q": "title:rust", "rows": 5, "fq": ["lang:ko"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responseHeader": {"status": 0},
            "response": {"numFound": 2, "start": 0, "docs": [{"id": "1"}, {"id": "2"}]},
            "facet_counts": {"facet_fields": {"author": ["kim", 3, "lee", 1]}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = books_client(&server);
    let response = client
        .query(Params::new().q("title:rust").set("rows", 5).fq("lang:ko"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.num_found(), Some(2));
    assert_eq!(response.docs.len(), 2);
    assert_eq!(response.facet_fields()[0].0, "author");
    client.close().await;
}

#[tokio::test]
async fn server_error_keeps_message_and_trace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/books/select"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "responseHeader": {"status": 400},
            "error": {"msg": "undefined field foo", "trace": "SolrException at line 1", "code": 400}
        })))
        .mount(&server)
        .await;

    let err = books_client(&server)
        .query(Params::new().q("foo:bar"))
        .await
        .unwrap_err();

    match &err {
        SolrError::Server { status, .. } => assert_eq!(*status, 400),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "undefined field foo");
    assert_eq!(err.trace(), Some("SolrException at line 1"));
}

#[tokio::test]
async fn non_json_error_body_is_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/ping"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = books_client(&server)
        .ping(PingAction::Status, Params::new())
        .await
        .unwrap_err();
    assert_eq!(err.message().as_deref(), Some("Bad Gateway"));
    assert_eq!(err.trace(), None);
}

#[tokio::test]
async fn get_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/get"))
        .and(query_param("id", "book 1"))
        .and(query_param("fl", "id,title"))
        .and(header("accept", "application/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"doc": {"id": "book 1", "title": "러스트"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = books_client(&server)
        .get("book 1", Params::new().set("fl", vec!["id", "title"]))
        .await
        .unwrap();
    assert_eq!(response.doc.get("title"), Some(&json!("러스트")));
}

#[tokio::test]
async fn update_json_and_xml() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/solr/books/update"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!([{"id": "1", "title": "Rust"}])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})))
        .expect(1)
        .mount(&server)
        .await;

    let xml = xml_update::delete_by_ids(&["1"]).unwrap();
    Mock::given(method("POST"))
        .and(path("/solr/news/update"))
        .and(query_param("commitWithin", "1000"))
        .and(header("content-type", "text/xml"))
        .and(body_string(xml.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = books_client(&server);
    client
        .update(json!([{"id": "1", "title": "Rust"}]), Params::new())
        .await
        .unwrap();
    client
        .update(
            UpdatePayload::Xml(xml),
            Params::new().collection("news").set("commitWithin", 1000),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn hard_and_soft_commit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/update"))
        .and(query_param("commit", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/solr/books/update"))
        .and(query_param("softCommit", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"responseHeader": {"status": 0}})))
        .expect(1)
        .mount(&server)
        .await;

    let client = books_client(&server);
    client.commit(false, Params::new()).await.unwrap();
    client.commit(true, Params::new()).await.unwrap();
}

#[tokio::test]
async fn suggestions_from_suggest_handler() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/suggest"))
        .and(query_param("suggest.q", "rust lang"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "suggest": {"mySuggester": {"rust lang": {
                "numFound": 1,
                "suggestions": [{"term": "rust language", "weight": 3, "payload": "p1"}]
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = books_client(&server)
        .suggestions(Some("rust+lang"), false, Params::new())
        .await
        .unwrap();
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].term, "rust language");
    assert_eq!(result.suggestions[0].payload, json!("p1"));
}

#[tokio::test]
async fn ping_with_action() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/ping"))
        .and(query_param("distrib", "false"))
        .and(query_param("action", "disable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "disabled"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = books_client(&server)
        .ping("disable".parse().unwrap(), Params::new())
        .await
        .unwrap();
    assert_eq!(response.get("status"), Some(&json!("disabled")));
}

#[tokio::test]
async fn dataimport_polls_until_idle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/dataimport"))
        .and(query_param("command", "status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "busy"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/solr/books/dataimport"))
        .and(query_param("command", "status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "idle",
            "statusMessages": {"Total Documents Processed": "10"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let policy = PollPolicy {
        max_retries: 5,
        sleep_interval: Duration::from_millis(10),
    };
    let status_messages = books_client(&server)
        .check_dataimport_status(policy, Params::new())
        .await
        .unwrap();
    assert_eq!(status_messages, json!({"Total Documents Processed": "10"}));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "OK"}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig {
        timeout: Timeout::Total(0.2),
        ..ClientConfig::with_connection_url(format!("{}/solr/books", server.uri()))
    };
    let err = Client::new(config)
        .unwrap()
        .ping(PingAction::Status, Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SolrError::Timeout(_)));
}

#[tokio::test]
async fn request_stats_hook_counts_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/solr/books/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/solr/books/update"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let stats = Arc::new(RequestStats::new("solr_client"));
    let config = ClientConfig::with_connection_url(format!("{}/solr/books", server.uri()));
    let client = Client::with_hooks(config, vec![stats.clone() as Arc<dyn RequestHook>]).unwrap();

    client.setup().await;
    client.ping(PingAction::Status, Params::new()).await.unwrap();
    client.update(json!([]), Params::new()).await.unwrap_err();

    let cnt = stats.snapshot().await;
    assert_eq!(cnt.read_cnt, 1);
    assert_eq!(cnt.write_cnt, 1);
    assert_eq!(cnt.err_cnt, 1);

    // close 이후에도 다시 연결하여 사용 가능
    client.close().await;
    client.close().await;
    client.ping(PingAction::Status, Params::new()).await.unwrap();
}

/// 헤더를 바로 보내고 body chunk를 gap 간격으로 보내는 서버. 주소를 반환
async fn chunked_server(chunks: Vec<&'static str>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                  Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
            )
            .await
            .unwrap();

        for chunk in chunks {
            tokio::time::sleep(gap).await;
            let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
            if socket.write_all(frame.as_bytes()).await.is_err() {
                return;
            }
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    format!("http://{}/solr/books", addr)
}

const SLOW_BODY: [&str; 6] = [r#"{"status":"#, r#""OK""#, r#","a":1"#, r#","b":2"#, r#","c":3"#, "}"];

#[tokio::test]
async fn split_timeout_allows_slow_streaming_body() {
    // chunk 간격은 read보다 짧지만 전체 수신 시간은 connect + read를 넘음
    let url = chunked_server(SLOW_BODY.to_vec(), Duration::from_millis(250)).await;
    let config = ClientConfig {
        timeout: Timeout::Split {
            connect: 0.5,
            read: 0.5,
        },
        ..ClientConfig::with_connection_url(url)
    };

    let response = Client::new(config)
        .unwrap()
        .ping(PingAction::Status, Params::new())
        .await
        .unwrap();
    assert_eq!(response.get("status"), Some(&json!("OK")));
    assert_eq!(response.get("c"), Some(&json!(3)));
}

#[tokio::test]
async fn split_timeout_fails_on_stalled_chunk() {
    let url = chunked_server(SLOW_BODY.to_vec(), Duration::from_millis(1500)).await;
    let config = ClientConfig {
        timeout: Timeout::Split {
            connect: 0.5,
            read: 0.5,
        },
        ..ClientConfig::with_connection_url(url)
    };

    let err = Client::new(config)
        .unwrap()
        .ping(PingAction::Status, Params::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SolrError::Timeout(limit) if limit == Duration::from_millis(500)));
}
