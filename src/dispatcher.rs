use crate::config::Timeout;
use crate::dns_cache::CachingResolver;
use crate::error::{Result, SolrError};
use crate::hooks::RequestHook;
use async_trait::async_trait;
use hyper::body::HttpBody;
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::http::HeaderValue;
use hyper::{Body, Client, HeaderMap, Method, Request};
use log::debug;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

type HttpClient = Client<HttpConnector<CachingResolver>>;

const APPLICATION_JSON: &str = "application/json";
const TEXT_XML: &str = "text/xml";

/// 응답 상태코드와 body 원문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// update 핸들러로 보낼 데이터
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    /// application/json 으로 전송
    Json(Value),
    /// text/xml 로 원문 그대로 전송
    Xml(String),
}

impl From<Value> for UpdatePayload {
    fn from(value: Value) -> Self {
        UpdatePayload::Json(value)
    }
}

impl From<String> for UpdatePayload {
    fn from(value: String) -> Self {
        UpdatePayload::Xml(value)
    }
}

/// 실제 HTTP 요청을 담당.
/// <br>
/// 클라이언트는 상태코드와 body 원문만 사용하며 연결 관리 방식은 구현체에 맡김
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// body가 있으면 JSON Request API 방식으로 body와 함께 전송
    async fn get(&self, url: &str, body: Option<&Value>, headers: HeaderMap) -> Result<RawResponse>;

    async fn post(&self, url: &str, data: &UpdatePayload, headers: HeaderMap)
        -> Result<RawResponse>;

    /// 연결 pool을 미리 생성
    async fn setup(&self) {}

    /// 여러 번 호출해도 안전해야 함
    async fn close(&self);
}

/// hyper client를 사용하는 기본 Dispatcher
pub struct HyperDispatcher {
    client: Mutex<Option<HttpClient>>,
    timeout: Timeout,
    ttl_dns_cache: Duration,
    hooks: Vec<Arc<dyn RequestHook>>,
    log_target: String,
}

impl HyperDispatcher {
    pub fn new(
        timeout: Timeout,
        ttl_dns_cache: Duration,
        hooks: Vec<Arc<dyn RequestHook>>,
        log_target: impl Into<String>,
    ) -> Self {
        Self {
            client: Mutex::new(None),
            timeout,
            ttl_dns_cache,
            hooks,
            log_target: log_target.into(),
        }
    }

    /// 연결 pool이 없으면 생성. hyper Client는 clone해도 같은 pool을 공유함
    async fn client(&self) -> HttpClient {
        let mut client_lock = self.client.lock().await;
        client_lock
            .get_or_insert_with(|| {
                debug!(target: self.log_target.as_str(), "Creating Solr session connection...");
                let mut connector =
                    HttpConnector::new_with_resolver(CachingResolver::new(self.ttl_dns_cache));
                connector.set_connect_timeout(self.timeout.connect());
                Client::builder().build(connector)
            })
            .clone()
    }

    async fn send_request(&self, req: Request<Body>) -> Result<RawResponse> {
        let method = req.method().clone();
        let url = req.uri().to_string();

        for hook in &self.hooks {
            hook.on_request_start(&method, &url).await;
        }

        let start = Instant::now();
        let client = self.client().await;

        let result = match self.timeout.read() {
            // 응답 헤더까지 connect + read, 이후 body는 chunk 하나마다 read 안에 도착해야 함
            Some(read) => read_response(&client, req, Some(self.timeout.limit()), Some(read)).await,
            // 연결부터 body 수신까지 전체가 limit 안에 끝나야 함
            None => within(Some(self.timeout.limit()), read_response(&client, req, None, None)).await,
        };

        let elapsed = start.elapsed();
        for hook in &self.hooks {
            hook.on_request_end(&method, &url, &result, elapsed).await;
        }

        result
    }
}

/// limit이 있으면 그 안에 끝나지 않은 경우 Timeout 에러
async fn within<T>(limit: Option<Duration>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(SolrError::Timeout(limit)),
        },
        None => fut.await,
    }
}

async fn read_response(
    client: &HttpClient,
    req: Request<Body>,
    header_limit: Option<Duration>,
    chunk_limit: Option<Duration>,
) -> Result<RawResponse> {
    let response = within(header_limit, async {
        client.request(req).await.map_err(SolrError::from)
    })
    .await?;
    let status = response.status().as_u16();

    let mut body = response.into_body();
    let mut bytes = Vec::new();
    while let Some(chunk) = within(chunk_limit, async {
        body.data().await.transpose().map_err(SolrError::from)
    })
    .await?
    {
        bytes.extend_from_slice(&chunk);
    }

    Ok(RawResponse {
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn build_request(method: Method, url: &str, headers: HeaderMap, body: Body) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(url);

    for (header_name, header_value) in headers.iter() {
        builder = builder.header(header_name, header_value);
    }

    Ok(builder.body(body)?)
}

#[async_trait]
impl Dispatcher for HyperDispatcher {
    async fn get(
        &self,
        url: &str,
        body: Option<&Value>,
        mut headers: HeaderMap,
    ) -> Result<RawResponse> {
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
        }

        debug!(target: self.log_target.as_str(), "{}", url);
        debug!(target: self.log_target.as_str(), "{:?}", headers);

        let req = match body {
            Some(body) => {
                debug!(target: self.log_target.as_str(), "{}", body);
                // Solr JSON Request API. GET body는 중간 proxy에서 버려질 수 있어 POST 사용
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                let body = serde_json::to_vec(body)?;
                build_request(Method::POST, url, headers, Body::from(body))?
            }
            None => build_request(Method::GET, url, headers, Body::empty())?,
        };

        self.send_request(req).await
    }

    async fn post(
        &self,
        url: &str,
        data: &UpdatePayload,
        mut headers: HeaderMap,
    ) -> Result<RawResponse> {
        debug!(target: self.log_target.as_str(), "{}", url);

        let body = match data {
            UpdatePayload::Json(value) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
                Body::from(serde_json::to_vec(value)?)
            }
            UpdatePayload::Xml(xml) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_XML));
                Body::from(xml.clone())
            }
        };

        let req = build_request(Method::POST, url, headers, body)?;
        self.send_request(req).await
    }

    async fn setup(&self) {
        self.client().await;
    }

    async fn close(&self) {
        debug!(target: self.log_target.as_str(), "Closing Solr session connection...");
        // pool은 마지막 Client가 drop될 때 idle 연결과 함께 정리됨
        let mut client_lock = self.client.lock().await;
        *client_lock = None;
    }
}

#[test]
fn raw_response_success_test() {
    assert!(RawResponse::new(200, "{}").is_success());
    assert!(RawResponse::new(204, "").is_success());
    assert!(!RawResponse::new(404, "").is_success());
    assert!(!RawResponse::new(500, "").is_success());
}

#[test]
fn build_request_headers_test() {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));
    let req = build_request(
        Method::GET,
        "http://127.0.0.1:8983/solr/books/select?wt=json",
        headers,
        Body::empty(),
    )
    .unwrap();

    assert_eq!(req.method(), Method::GET);
    assert_eq!(req.uri().path(), "/solr/books/select");
    assert_eq!(req.headers()[ACCEPT], APPLICATION_JSON);
    assert!(build_request(Method::GET, "not a url with spaces", HeaderMap::new(), Body::empty()).is_err());
}
