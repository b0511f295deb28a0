use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, HyperDispatcher, RawResponse, UpdatePayload};
use crate::error::{Result, SolrError};
use crate::hooks::RequestHook;
use crate::params::{ParamValue, Params};
use crate::query_string::{encode, encode_value};
use crate::response::Response;
use hyper::HeaderMap;
use log::debug;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// 응답 형식. JSON만 지원
const RESPONSE_WRITER: &str = "json";

/// ping 핸들러 action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingAction {
    #[default]
    Status,
    Enable,
    Disable,
}

impl PingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PingAction::Status => "status",
            PingAction::Enable => "enable",
            PingAction::Disable => "disable",
        }
    }
}

impl fmt::Display for PingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PingAction {
    type Err = SolrError;

    fn from_str(action: &str) -> Result<Self> {
        match action.to_ascii_lowercase().as_str() {
            "status" => Ok(PingAction::Status),
            "enable" => Ok(PingAction::Enable),
            "disable" => Ok(PingAction::Disable),
            _ => Err(SolrError::InvalidPingAction(action.to_string())),
        }
    }
}

/// dataimport 상태 확인 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_retries: u32,
    pub sleep_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            sleep_interval: Duration::from_secs(60),
        }
    }
}

/// suggester 결과 한 건
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub term: String,
    pub payload: Value,
}

/// suggestions 호출 결과
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestions {
    pub response: Response,
    pub suggestions: Vec<Suggestion>,
}

enum DataImportStatus {
    Idle(Value),
    Busy(String),
}

/// Solr 클라이언트.
/// <br>
/// 핸들러마다 메서드 하나씩 제공. 설정은 생성 이후 변경되지 않으며
/// 연결 pool은 모든 호출이 공유함
pub struct Client {
    base_url: String,
    collection: Option<String>,
    log_target: String,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_hooks(config, Vec::new())
    }

    /// 요청마다 호출될 hook을 등록하여 생성
    pub fn with_hooks(config: ClientConfig, hooks: Vec<Arc<dyn RequestHook>>) -> Result<Self> {
        let dispatcher = HyperDispatcher::new(
            config.timeout,
            config.dns_ttl(),
            hooks,
            config.log_target.clone(),
        );
        Self::with_dispatcher(config, Arc::new(dispatcher))
    }

    /// timeout 값이 잘못된 경우 요청 전에 에러
    pub fn with_dispatcher(config: ClientConfig, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        config.timeout.validate()?;
        let (base_url, collection) = config.endpoint()?;

        Ok(Self {
            base_url,
            collection,
            log_target: config.log_target,
            dispatcher,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    /// 연결 pool을 미리 생성. 호출하지 않으면 첫 요청 시 생성됨
    pub async fn setup(&self) {
        self.dispatcher.setup().await;
    }

    /// 연결 pool 정리. 여러 번 호출해도 됨
    pub async fn close(&self) {
        self.dispatcher.close().await;
    }

    fn target(&self) -> &str {
        &self.log_target
    }

    /// 호출시 지정한 collection이 우선. 둘 다 없으면 에러
    fn collection<'a>(&'a self, params: &'a Params) -> Result<&'a str> {
        params
            .collection_name()
            .or(self.collection.as_deref())
            .ok_or(SolrError::MissingCollection)
    }

    fn handler_url(&self, collection: &str, handler: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, handler)
    }

    /// 2xx가 아니면 에러 응답을 해석하여 반환
    fn deserialize(raw: RawResponse) -> Result<Response> {
        if !raw.is_success() {
            return Err(SolrError::from_response(raw.status, &raw.body));
        }
        Ok(Response::from_body(raw.status, &raw.body)?)
    }

    async fn get_check_ok_deserialize(&self, url: &str) -> Result<Response> {
        let raw = self.dispatcher.get(url, None, HeaderMap::new()).await?;
        Self::deserialize(raw)
    }

    /// SearchHandler 검색.
    /// <br>
    /// select 핸들러는 파라미터를 JSON body({"params": {...}})로, 그 외는 query string으로 전달
    pub async fn query(&self, mut params: Params) -> Result<Response> {
        let handler = params.handler_or("select").to_string();
        debug!(target: self.target(), "Querying Solr {} handler...", handler);
        let collection = self.collection(&params)?.to_string();

        if !params.contains("q") {
            match params.remove("query") {
                Some(query) => params.insert("q", query),
                None => params.insert("q", "*"),
            }
        }

        let mut url = format!(
            "{}?wt={}",
            self.handler_url(&collection, &handler),
            RESPONSE_WRITER
        );

        if params.get("spellcheck").map_or(false, ParamValue::is_truthy) {
            // 기본 SpellingQueryConverter는 ASCII만 처리하므로 spellcheck.q를 명시해야 함
            if let Some(q) = params.get("q").cloned() {
                params.insert("spellcheck.q", q);
            }
            if let Some(dicts) = params.take_spellcheck_dicts() {
                if !params.contains("spellcheck.dictionary") {
                    params.insert("spellcheck.dictionary", ParamValue::List(dicts));
                }
            }
        }

        if params.is_prefer_local() {
            url.push_str("&shards.preference=replica.location:local");
        }

        let raw = if handler == "select" {
            let body = json!({ "params": params.to_json() });
            self.dispatcher.get(&url, Some(&body), HeaderMap::new()).await?
        } else {
            // mlt 등 일부 핸들러는 body의 params를 지원하지 않음
            url.push_str(&encode(&params));
            self.dispatcher.get(&url, None, HeaderMap::new()).await?
        };

        Self::deserialize(raw)
    }

    /// get 핸들러로 id 하나의 문서를 가져옴
    pub async fn get(&self, id: &str, params: Params) -> Result<Response> {
        let handler = params.handler_or("get");
        let collection = self.collection(&params)?;
        debug!(
            target: self.target(),
            "Getting document from Solr collection {} via handler {}...", collection, handler
        );

        let url = format!(
            "{}?id={}&wt={}{}",
            self.handler_url(collection, handler),
            encode_value(id),
            RESPONSE_WRITER,
            encode(&params)
        );
        self.get_check_ok_deserialize(&url).await
    }

    /// update 핸들러로 문서 추가/변경/삭제
    pub async fn update(&self, data: impl Into<UpdatePayload>, params: Params) -> Result<Response> {
        let handler = params.handler_or("update");
        let collection = self.collection(&params)?;
        debug!(
            target: self.target(),
            "Updating {} data in Solr via {} handler...", collection, handler
        );

        let url = format!(
            "{}?wt={}{}",
            self.handler_url(collection, handler),
            RESPONSE_WRITER,
            encode(&params)
        );
        let raw = self
            .dispatcher
            .post(&url, &data.into(), HeaderMap::new())
            .await?;
        Self::deserialize(raw)
    }

    pub async fn commit(&self, soft: bool, params: Params) -> Result<Response> {
        let handler = params.handler_or("update");
        let collection = self.collection(&params)?;
        debug!(
            target: self.target(),
            "Performing commit to Solr {} collection via {} handler...", collection, handler
        );

        let commit = if soft { "softCommit=true" } else { "commit=true" };
        let url = format!(
            "{}?{}&wt={}{}",
            self.handler_url(collection, handler),
            commit,
            RESPONSE_WRITER,
            encode(&params)
        );
        self.get_check_ok_deserialize(&url).await
    }

    /// SuggestComponent를 사용하는 핸들러 조회. query와 build 중 하나는 필요함
    /// <br>
    /// query의 +는 공백으로 취급
    pub async fn suggestions(
        &self,
        query: Option<&str>,
        build: bool,
        params: Params,
    ) -> Result<Suggestions> {
        let query = query.filter(|q| !q.is_empty()).map(|q| q.replace('+', " "));
        if query.is_none() && !build {
            return Err(SolrError::MissingSuggestInput);
        }

        let handler = params.handler_or("suggest");
        let collection = self.collection(&params)?;
        debug!(
            target: self.target(),
            "Querying Solr collection {} suggestions handler /{}...", collection, handler
        );

        let mut url = format!(
            "{}?wt={}",
            self.handler_url(collection, handler),
            RESPONSE_WRITER
        );
        if let Some(query) = &query {
            url.push_str("&suggest.q=");
            url.push_str(&encode_value(query));
        }
        if build {
            url.push_str("&suggest.build=true");
        }
        url.push_str(&encode(&params));

        let response = self.get_check_ok_deserialize(&url).await?;
        let suggestions = match &query {
            Some(query) => extract_suggestions(&response.raw, query),
            None => Vec::new(),
        };

        Ok(Suggestions {
            response,
            suggestions,
        })
    }

    /// DIH(data import handler) 호출. 완료를 기다리지 않음
    pub async fn dataimport(&self, params: Params) -> Result<Response> {
        let handler = params.handler_or("dataimport");
        debug!(target: self.target(), "Calling dataimport handler /{}...", handler);
        let collection = self.collection(&params)?;

        let url = format!(
            "{}?wt={}{}",
            self.handler_url(collection, handler),
            RESPONSE_WRITER,
            encode(&params)
        );
        self.get_check_ok_deserialize(&url).await
    }

    /// dataimport 상태가 idle이 될 때까지 확인하고 statusMessages를 반환.
    /// <br>
    /// 확인 중 발생한 요청/파싱 에러는 재시도 대상이며, 재시도 횟수를 다 쓰면 에러
    pub async fn check_dataimport_status(&self, policy: PollPolicy, params: Params) -> Result<Value> {
        debug!(target: self.target(), "Checking status of indexing...");
        let handler = params.handler_or("dataimport");
        let collection = self.collection(&params)?;

        let url = format!(
            "{}?command=status&wt={}{}",
            self.handler_url(collection, handler),
            RESPONSE_WRITER,
            encode(&params)
        );

        let mut retries = 0;
        let mut last_status: Option<String> = None;

        while retries < policy.max_retries {
            match self.dataimport_status(&url).await {
                Ok(DataImportStatus::Idle(status_messages)) => {
                    debug!(target: self.target(), "Indexing completed! {}", status_messages);
                    return Ok(status_messages);
                }
                Ok(DataImportStatus::Busy(status)) => {
                    debug!(target: self.target(), "Status {}, sleeping...", status);
                    last_status = Some(status);
                }
                Err(e) if e.is_transient() => {
                    debug!(target: self.target(), "Status not ready yet, sleeping... {}", e);
                }
                Err(e) => return Err(e),
            }

            retries += 1;
            if retries < policy.max_retries {
                tokio::time::sleep(policy.sleep_interval).await;
            }
        }

        Err(SolrError::DataImportUnverified {
            collection: collection.to_string(),
            waited: policy.sleep_interval * retries,
            retries,
            last_status,
        })
    }

    async fn dataimport_status(&self, url: &str) -> Result<DataImportStatus> {
        let raw = self.dispatcher.get(url, None, HeaderMap::new()).await?;
        let response = Self::deserialize(raw)?;

        let status = response
            .get("status")
            .and_then(Value::as_str)
            .ok_or(SolrError::MissingField("status"))?;

        if status == "idle" {
            let status_messages = response
                .get("statusMessages")
                .cloned()
                .ok_or(SolrError::MissingField("statusMessages"))?;
            Ok(DataImportStatus::Idle(status_messages))
        } else {
            Ok(DataImportStatus::Busy(status.to_string()))
        }
    }

    /// ping 핸들러로 노드 상태 확인 또는 enable/disable
    pub async fn ping(&self, action: PingAction, params: Params) -> Result<Response> {
        debug!(target: self.target(), "Pinging Solr...");
        let handler = params.handler_or("ping");
        let collection = self.collection(&params)?;

        let url = format!(
            "{}?distrib=false&action={}&wt={}{}",
            self.handler_url(collection, handler),
            action,
            RESPONSE_WRITER,
            encode(&params)
        );
        self.get_check_ok_deserialize(&url).await
    }
}

/// suggest.<component>.<query>.suggestions 에서 term, payload를 추출.
/// <br>
/// 해당 경로가 없거나 형식이 다른 component는 건너뜀
fn extract_suggestions(raw: &Value, query: &str) -> Vec<Suggestion> {
    let Some(components) = raw.get("suggest").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut suggestions = Vec::new();
    for component in components.values() {
        let Some(entries) = component
            .get(query)
            .and_then(|result| result.get("suggestions"))
            .and_then(Value::as_array)
        else {
            continue;
        };

        let parsed: Option<Vec<Suggestion>> = entries
            .iter()
            .map(|entry| {
                Some(Suggestion {
                    term: entry.get("term")?.as_str()?.to_string(),
                    payload: entry.get("payload")?.clone(),
                })
            })
            .collect();

        if let Some(parsed) = parsed {
            suggestions.extend(parsed);
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeout;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Recorded {
        method: &'static str,
        url: String,
        body: Option<Value>,
    }

    /// 미리 정해둔 응답을 순서대로 돌려주는 Dispatcher
    #[derive(Default)]
    struct ScriptedDispatcher {
        responses: Mutex<VecDeque<Result<RawResponse>>>,
        requests: Mutex<Vec<Recorded>>,
        closed: Mutex<u32>,
    }

    impl ScriptedDispatcher {
        fn new(responses: Vec<Result<RawResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                ..Self::default()
            })
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }

        fn next(&self, recorded: Recorded) -> Result<RawResponse> {
            self.requests.lock().unwrap().push(recorded);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(RawResponse::new(200, "{}")))
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn get(
            &self,
            url: &str,
            body: Option<&Value>,
            _headers: HeaderMap,
        ) -> Result<RawResponse> {
            self.next(Recorded {
                method: "GET",
                url: url.to_string(),
                body: body.cloned(),
            })
        }

        async fn post(
            &self,
            url: &str,
            data: &UpdatePayload,
            _headers: HeaderMap,
        ) -> Result<RawResponse> {
            let body = match data {
                UpdatePayload::Json(value) => value.clone(),
                UpdatePayload::Xml(xml) => Value::String(xml.clone()),
            };
            self.next(Recorded {
                method: "POST",
                url: url.to_string(),
                body: Some(body),
            })
        }

        async fn close(&self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    const BASE: &str = "http://127.0.0.1:8983/solr";

    fn client(dispatcher: Arc<ScriptedDispatcher>) -> Client {
        let config = ClientConfig::with_connection_url(format!("{}/books", BASE));
        Client::with_dispatcher(config, dispatcher).unwrap()
    }

    fn ok(body: Value) -> Result<RawResponse> {
        Ok(RawResponse::new(200, body.to_string()))
    }

    fn status(status: &str) -> Result<RawResponse> {
        ok(json!({"status": status, "statusMessages": {"Total Rows Fetched": "42"}}))
    }

    #[tokio::test]
    async fn query_select_sends_json_body_test() {
        let dispatcher = ScriptedDispatcher::new(vec![ok(
            json!({"response": {"numFound": 1, "docs": [{"id": "1"}]}}),
        )]);
        let client = client(dispatcher.clone());

        let response = client
            .query(Params::new().fq("type:book").set("rows", 10))
            .await
            .unwrap();
        assert_eq!(response.docs.len(), 1);

        let requests = dispatcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, format!("{}/books/select?wt=json", BASE));
        assert_eq!(
            requests[0].body,
            Some(json!({"params": {"fq": ["type:book"], "rows": 10, "q": "*"}}))
        );
    }

    #[tokio::test]
    async fn query_renames_query_to_q_test() {
        let dispatcher = ScriptedDispatcher::new(vec![]);
        let client = client(dispatcher.clone());

        client
            .query(Params::new().handler("mlt").set("query", "id:1").set("mlt.fl", "title"))
            .await
            .unwrap();

        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/mlt?wt=json&mlt.fl=title&q=id%3A1", BASE)
        );
        assert_eq!(dispatcher.requests()[0].body, None);
    }

    #[tokio::test]
    async fn query_spellcheck_and_prefer_local_test() {
        let dispatcher = ScriptedDispatcher::new(vec![]);
        let client = client(dispatcher.clone());

        client
            .query(
                Params::new()
                    .q("솔라")
                    .set("spellcheck", true)
                    .spellcheck_dicts(["default", "wordbreak"])
                    .prefer_local(true)
                    .collection("news"),
            )
            .await
            .unwrap();

        let request = &dispatcher.requests()[0];
        assert_eq!(
            request.url,
            format!(
                "{}/news/select?wt=json&shards.preference=replica.location:local",
                BASE
            )
        );
        assert_eq!(
            request.body,
            Some(json!({"params": {
                "q": "솔라",
                "spellcheck": true,
                "spellcheck.q": "솔라",
                "spellcheck.dictionary": ["default", "wordbreak"]
            }}))
        );
    }

    #[tokio::test]
    async fn query_keeps_explicit_spellcheck_dictionary_test() {
        let dispatcher = ScriptedDispatcher::new(vec![]);
        let client = client(dispatcher.clone());

        client
            .query(
                Params::new()
                    .q("rust")
                    .set("spellcheck", "on")
                    .set("spellcheck.dictionary", "custom")
                    .spellcheck_dicts(["default"]),
            )
            .await
            .unwrap();

        let body = dispatcher.requests()[0].body.clone().unwrap();
        assert_eq!(body["params"]["spellcheck.dictionary"], json!("custom"));
        assert_eq!(body["params"]["spellcheck.q"], json!("rust"));
    }

    #[tokio::test]
    async fn query_server_error_test() {
        let dispatcher = ScriptedDispatcher::new(vec![Ok(RawResponse::new(
            400,
            r#"{"error": {"msg": "undefined field foo", "trace": "at org.apache.solr"}}"#,
        ))]);
        let client = client(dispatcher);

        let err = client.query(Params::new().q("foo:bar")).await.unwrap_err();
        assert_eq!(err.message().as_deref(), Some("undefined field foo"));
        assert_eq!(err.trace(), Some("at org.apache.solr"));
    }

    #[tokio::test]
    async fn query_decode_error_test() {
        let dispatcher =
            ScriptedDispatcher::new(vec![Ok(RawResponse::new(200, "<html>not json</html>"))]);
        let client = client(dispatcher);

        let err = client.query(Params::new()).await.unwrap_err();
        assert!(matches!(err, SolrError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_collection_fails_before_io_test() {
        let dispatcher = ScriptedDispatcher::new(vec![]);
        let config = ClientConfig::default();
        let client = Client::with_dispatcher(config, dispatcher.clone()).unwrap();

        let err = client.query(Params::new()).await.unwrap_err();
        assert!(matches!(err, SolrError::MissingCollection));
        assert!(dispatcher.requests().is_empty());

        // 호출시 지정하면 사용 가능
        client.ping(PingAction::Status, Params::new().collection("books")).await.unwrap();
        assert_eq!(dispatcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn get_by_id_test() {
        let dispatcher = ScriptedDispatcher::new(vec![ok(json!({"doc": {"id": "a b"}}))]);
        let client = client(dispatcher.clone());

        let response = client
            .get("a b", Params::new().set("fl", vec!["id", "title"]))
            .await
            .unwrap();
        assert_eq!(response.doc.get("id"), Some(&json!("a b")));
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/get?id=a+b&wt=json&fl=id,title", BASE)
        );
    }

    #[tokio::test]
    async fn update_and_commit_test() {
        let dispatcher = ScriptedDispatcher::new(vec![
            ok(json!({"responseHeader": {"status": 0}})),
            ok(json!({"responseHeader": {"status": 0}})),
            ok(json!({"responseHeader": {"status": 0}})),
        ]);
        let client = client(dispatcher.clone());

        let docs = json!([{"id": "1", "title": "Rust"}]);
        client
            .update(docs.clone(), Params::new().set("commitWithin", 1000))
            .await
            .unwrap();
        client.commit(false, Params::new()).await.unwrap();
        client.commit(true, Params::new()).await.unwrap();

        let requests = dispatcher.requests();
        assert_eq!(
            requests[0],
            Recorded {
                method: "POST",
                url: format!("{}/books/update?wt=json&commitWithin=1000", BASE),
                body: Some(docs),
            }
        );
        assert_eq!(requests[1].url, format!("{}/books/update?commit=true&wt=json", BASE));
        assert_eq!(requests[2].url, format!("{}/books/update?softCommit=true&wt=json", BASE));
    }

    #[tokio::test]
    async fn update_error_test() {
        let dispatcher =
            ScriptedDispatcher::new(vec![Ok(RawResponse::new(500, "Internal Server Error"))]);
        let client = client(dispatcher);

        let err = client
            .update(UpdatePayload::Xml("<add/>".to_string()), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.message().as_deref(), Some("Internal Server Error"));
        assert_eq!(err.trace(), None);
    }

    #[tokio::test]
    async fn suggestions_test() {
        let dispatcher = ScriptedDispatcher::new(vec![ok(json!({
            "suggest": {
                "titleSuggester": {
                    "rust lang": {
                        "numFound": 2,
                        "suggestions": [
                            {"term": "rust language", "weight": 10, "payload": ""},
                            {"term": "rust lang book", "weight": 5, "payload": "b-1"}
                        ]
                    }
                },
                "authorSuggester": {
                    "other": {"numFound": 0, "suggestions": []}
                }
            }
        }))]);
        let client = client(dispatcher.clone());

        let result = client
            .suggestions(Some("rust+lang"), false, Params::new())
            .await
            .unwrap();

        assert_eq!(
            result.suggestions,
            vec![
                Suggestion {
                    term: "rust language".to_string(),
                    payload: json!("")
                },
                Suggestion {
                    term: "rust lang book".to_string(),
                    payload: json!("b-1")
                },
            ]
        );
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/suggest?wt=json&suggest.q=rust+lang", BASE)
        );
    }

    #[tokio::test]
    async fn suggestions_build_and_missing_input_test() {
        let dispatcher = ScriptedDispatcher::new(vec![ok(json!({"command": "build"}))]);
        let client = client(dispatcher.clone());

        let err = client
            .suggestions(None, false, Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SolrError::MissingSuggestInput));
        assert!(dispatcher.requests().is_empty());

        let result = client
            .suggestions(None, true, Params::new().handler("suggest_title"))
            .await
            .unwrap();
        assert!(result.suggestions.is_empty());
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/suggest_title?wt=json&suggest.build=true", BASE)
        );
    }

    #[test]
    fn extract_suggestions_skips_malformed_component_test() {
        let raw = json!({"suggest": {
            "a": {"q": {"suggestions": [{"term": "x", "payload": "1"}, {"weight": 3}]}},
            "b": {"q": {"suggestions": [{"term": "y", "payload": "2"}]}},
            "c": {"q": "unexpected"}
        }});

        assert_eq!(
            extract_suggestions(&raw, "q"),
            vec![Suggestion {
                term: "y".to_string(),
                payload: json!("2")
            }]
        );
        assert!(extract_suggestions(&json!({}), "q").is_empty());
    }

    #[tokio::test]
    async fn ping_test() {
        let dispatcher = ScriptedDispatcher::new(vec![ok(json!({"status": "OK"}))]);
        let client = client(dispatcher.clone());

        let response = client.ping(PingAction::Enable, Params::new()).await.unwrap();
        assert_eq!(response.get("status"), Some(&json!("OK")));
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/ping?distrib=false&action=enable&wt=json", BASE)
        );
    }

    #[test]
    fn ping_action_parse_test() {
        assert_eq!("status".parse::<PingAction>().unwrap(), PingAction::Status);
        assert_eq!("DISABLE".parse::<PingAction>().unwrap(), PingAction::Disable);

        let err = "restart".parse::<PingAction>().unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(err.to_string(), "INVALID_PING_ACTION: restart");
    }

    #[tokio::test]
    async fn dataimport_one_shot_test() {
        let dispatcher = ScriptedDispatcher::new(vec![status("busy")]);
        let client = client(dispatcher.clone());

        let response = client
            .dataimport(Params::new().set("command", "full-import").set("clean", false))
            .await
            .unwrap();
        assert_eq!(response.get("status"), Some(&json!("busy")));
        assert_eq!(dispatcher.requests().len(), 1);
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/dataimport?wt=json&command=full-import&clean=false", BASE)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dataimport_status_busy_then_idle_test() {
        let dispatcher =
            ScriptedDispatcher::new(vec![status("busy"), status("busy"), status("idle")]);
        let client = client(dispatcher.clone());
        let policy = PollPolicy {
            max_retries: 5,
            sleep_interval: Duration::from_secs(60),
        };

        let start = tokio::time::Instant::now();
        let status_messages = client
            .check_dataimport_status(policy, Params::new())
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(status_messages, json!({"Total Rows Fetched": "42"}));
        assert_eq!(dispatcher.requests().len(), 3);
        assert_eq!(
            dispatcher.requests()[0].url,
            format!("{}/books/dataimport?command=status&wt=json", BASE)
        );
        // 두 번 sleep
        assert!(elapsed >= Duration::from_secs(120));
        assert!(elapsed < Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn dataimport_status_exhausted_test() {
        let dispatcher = ScriptedDispatcher::new(vec![
            status("busy"),
            status("busy"),
            status("busy"),
            status("idle"),
        ]);
        let client = client(dispatcher.clone());
        let policy = PollPolicy {
            max_retries: 3,
            sleep_interval: Duration::from_secs(10),
        };

        let start = tokio::time::Instant::now();
        let err = client
            .check_dataimport_status(policy, Params::new())
            .await
            .unwrap_err();

        assert_eq!(dispatcher.requests().len(), 3);
        assert!(start.elapsed() < Duration::from_secs(30));
        match &err {
            SolrError::DataImportUnverified {
                collection,
                waited,
                retries,
                last_status,
            } => {
                assert_eq!(collection, "books");
                assert_eq!(*waited, Duration::from_secs(30));
                assert_eq!(*retries, 3);
                assert_eq!(last_status.as_deref(), Some("busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("books"));
        assert!(msg.contains("3 retries"));
    }

    #[tokio::test(start_paused = true)]
    async fn dataimport_status_swallows_transient_errors_test() {
        let dispatcher = ScriptedDispatcher::new(vec![
            Err(SolrError::Timeout(Duration::from_secs(4))),
            Ok(RawResponse::new(503, "Service Unavailable")),
            Ok(RawResponse::new(200, "garbage")),
            ok(json!({"importResponse": ""})),
            status("idle"),
        ]);
        let client = client(dispatcher.clone());
        let policy = PollPolicy {
            max_retries: 5,
            sleep_interval: Duration::from_secs(1),
        };

        let status_messages = client
            .check_dataimport_status(policy, Params::new())
            .await
            .unwrap();
        assert_eq!(status_messages["Total Rows Fetched"], json!("42"));
        assert_eq!(dispatcher.requests().len(), 5);
    }

    #[tokio::test]
    async fn dataimport_status_zero_retries_test() {
        let dispatcher = ScriptedDispatcher::new(vec![status("idle")]);
        let client = client(dispatcher.clone());
        let policy = PollPolicy {
            max_retries: 0,
            sleep_interval: Duration::from_secs(1),
        };

        let err = client
            .check_dataimport_status(policy, Params::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SolrError::DataImportUnverified { retries: 0, .. }));
        assert!(dispatcher.requests().is_empty());
    }

    #[test]
    fn invalid_timeout_rejected_test() {
        for timeout in [
            Timeout::Total(0.0),
            Timeout::Total(-3.0),
            Timeout::Split {
                connect: 1.0,
                read: f64::NAN,
            },
        ] {
            let config = ClientConfig {
                timeout,
                ..ClientConfig::with_connection_url(format!("{}/books", BASE))
            };
            let err = Client::new(config.clone()).err().unwrap();
            assert!(matches!(err, SolrError::InvalidConfig(_)), "{timeout:?}");
            assert!(err.is_configuration_error());

            let dispatcher = ScriptedDispatcher::new(vec![]);
            let err = Client::with_dispatcher(config, dispatcher.clone()).err().unwrap();
            assert!(matches!(err, SolrError::InvalidConfig(_)));
            assert!(dispatcher.requests().is_empty());
        }
    }

    #[tokio::test]
    async fn close_is_idempotent_test() {
        let dispatcher = ScriptedDispatcher::new(vec![]);
        let client = client(dispatcher.clone());

        client.close().await;
        client.close().await;
        assert_eq!(*dispatcher.closed.lock().unwrap(), 2);
    }
}
