use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolrError>;

/// 클라이언트에서 발생하는 모든 에러
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SolrError {
    /// Solr가 2xx 이외의 응답을 준 경우.
    /// <br>
    /// message는 보통 문자열이지만 Solr가 구조화된 값을 주는 경우도 있어 Value로 보관
    #[error("{}", render_message(.message))]
    Server {
        status: u16,
        message: Value,
        trace: Option<String>,
    },

    #[error("COLLECTION_NOT_PROVIDED")]
    MissingCollection,

    #[error("INVALID_PING_ACTION: {0}")]
    InvalidPingAction(String),

    #[error("query or build required for suggestions")]
    MissingSuggestInput,

    #[error("INVALID_CONFIG: {0}")]
    InvalidConfig(String),

    #[error("FAIL_GET_CONFIG: {0}")]
    Config(#[from] config::ConfigError),

    #[error("INVALID_URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("transport error: {0}")]
    Transport(#[from] hyper::Error),

    #[error("request build error: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    #[error("response decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("NOT_FOUND_FIELD: {0}")]
    MissingField(&'static str),

    #[error(
        "Unable to verify dataimport success on {collection} after {} seconds and {retries} retries and status message {}!",
        .waited.as_secs(),
        .last_status.as_deref().unwrap_or("none")
    )]
    DataImportUnverified {
        collection: String,
        waited: Duration,
        retries: u32,
        last_status: Option<String>,
    },
}

impl SolrError {
    /// 실패한 응답의 body로부터 에러를 만듦.
    /// <br>
    /// {"error": {"msg": ..., "trace": ...}} 형식이 아니면 body 원문을 message로 사용
    pub fn from_response(status: u16, body: &str) -> Self {
        let (message, trace) = match decode_error_envelope(body) {
            Some(decoded) => decoded,
            None => (Value::String(body.to_string()), None),
        };

        SolrError::Server {
            status,
            message,
            trace,
        }
    }

    /// Server 에러인 경우 message를 문자열로 돌려줌
    pub fn message(&self) -> Option<String> {
        match self {
            SolrError::Server { message, .. } => Some(render_message(message)),
            _ => None,
        }
    }

    pub fn trace(&self) -> Option<&str> {
        match self {
            SolrError::Server { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, SolrError::Server { .. })
    }

    /// I/O 이전에 발생하는 설정/호출 오류
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SolrError::MissingCollection
                | SolrError::InvalidPingAction(_)
                | SolrError::MissingSuggestInput
                | SolrError::InvalidConfig(_)
                | SolrError::Config(_)
                | SolrError::InvalidUrl(_)
        )
    }

    /// 재시도하면 결과가 달라질 수 있는 에러. dataimport 상태 확인 루프에서만 삼킴
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SolrError::Transport(_)
                | SolrError::Timeout(_)
                | SolrError::Server { .. }
                | SolrError::Decode(_)
                | SolrError::MissingField(_)
        )
    }
}

fn decode_error_envelope(body: &str) -> Option<(Value, Option<String>)> {
    let Ok(Value::Object(mut decoded)) = serde_json::from_str::<Value>(body) else {
        return None;
    };

    match decoded.remove("error") {
        Some(Value::Object(mut error)) => {
            let trace = match error.remove("trace") {
                Some(Value::String(trace)) => Some(trace),
                _ => None,
            };
            let message = match error.remove("msg") {
                Some(msg) => msg,
                None => Value::Object(error),
            };
            Some((message, trace))
        }
        // error 키가 없으면 디코딩된 전체를 message로 사용
        Some(other) => Some((other, None)),
        None => Some((Value::Object(decoded), None)),
    }
}

fn render_message(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[test]
fn extract_solr_error_envelope_test() {
    let body = r#"{"responseHeader":{"status":400},"error":{"msg":"undefined field foo","trace":"org.apache.solr.common.SolrException: undefined field foo","code":400}}"#;
    let err = SolrError::from_response(400, body);

    assert!(err.is_server_error());
    assert_eq!(err.message().unwrap(), "undefined field foo");
    assert_eq!(
        err.trace(),
        Some("org.apache.solr.common.SolrException: undefined field foo")
    );
    assert_eq!(err.to_string(), "undefined field foo");
}

#[test]
fn extract_error_without_msg_test() {
    let err = SolrError::from_response(500, r#"{"error":{"code":500}}"#);
    assert_eq!(err.message().unwrap(), r#"{"code":500}"#);
    assert_eq!(err.trace(), None);

    // error 키 자체가 없는 경우 디코딩된 전체가 message
    let err = SolrError::from_response(503, r#"{"status":"down"}"#);
    assert_eq!(err.message().unwrap(), r#"{"status":"down"}"#);
}

#[test]
fn extract_error_fallback_raw_body_test() {
    let body = "<html><body>502 Bad Gateway</body></html>";
    let err = SolrError::from_response(502, body);
    assert_eq!(err.message().unwrap(), body);
    assert_eq!(err.trace(), None);

    // JSON이지만 object가 아닌 경우도 원문 사용
    let err = SolrError::from_response(500, "[1,2]");
    assert_eq!(err.message().unwrap(), "[1,2]");

    let err = SolrError::from_response(500, "");
    assert_eq!(err.message().unwrap(), "");
}

#[test]
fn error_classification_test() {
    assert!(SolrError::MissingCollection.is_configuration_error());
    assert!(!SolrError::MissingCollection.is_transient());
    assert!(SolrError::MissingField("status").is_transient());
    assert!(SolrError::from_response(500, "boom").is_transient());

    let err = SolrError::DataImportUnverified {
        collection: "books".to_string(),
        waited: Duration::from_secs(180),
        retries: 3,
        last_status: Some("busy".to_string()),
    };
    let msg = err.to_string();
    assert!(msg.contains("books"));
    assert!(msg.contains("180 seconds"));
    assert!(msg.contains("3 retries"));
    assert!(msg.contains("busy"));
}
