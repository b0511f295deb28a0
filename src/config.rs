use crate::error::{Result, SolrError};
use serde::Deserialize;
use std::time::Duration;
use url::{Position, Url};

/// 요청 timeout (초 단위).
/// <br>
/// 설정 파일에서는 숫자 하나(전체 timeout) 또는 {connect, read} 로 지정
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timeout {
    Split { connect: f64, read: f64 },
    Total(f64),
}

impl Default for Timeout {
    fn default() -> Self {
        // TCP 재전송 고려시 connect는 4초가 적당하지만 대부분 너무 느림
        Timeout::Split {
            connect: 1.0,
            read: 3.0,
        }
    }
}

impl Timeout {
    /// 연결 timeout. 전체 timeout만 지정된 경우 None
    pub fn connect(&self) -> Option<Duration> {
        match self {
            Timeout::Split { connect, .. } => Some(secs(*connect)),
            Timeout::Total(_) => None,
        }
    }

    /// body chunk 하나를 기다리는 시간. 전체 timeout만 지정된 경우 None
    pub fn read(&self) -> Option<Duration> {
        match self {
            Timeout::Split { read, .. } => Some(secs(*read)),
            Timeout::Total(_) => None,
        }
    }

    /// Total: 연결 ~ body 수신 전체에 허용되는 시간.
    /// <br>
    /// Split: 응답 헤더를 받을 때까지 허용되는 시간 (connect + read)
    pub fn limit(&self) -> Duration {
        match self {
            Timeout::Split { connect, read } => secs(*connect) + secs(*read),
            Timeout::Total(total) => secs(*total),
        }
    }

    /// 0 이하, NaN, 무한대는 에러
    pub fn validate(&self) -> Result<()> {
        let values = match self {
            Timeout::Split { connect, read } => vec![*connect, *read],
            Timeout::Total(total) => vec![*total],
        };

        if values.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(SolrError::InvalidConfig(format!("timeout {:?}", self)));
        }
        Ok(())
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// 클라이언트 설정. 생성 후 변경되지 않음
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 지정된 경우 마지막 path를 collection, 나머지를 base url로 사용
    /// <br>
    /// ex) http://127.0.0.1:8983/solr/books
    pub connection_url: Option<String>,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub collection: Option<String>,
    pub timeout: Timeout,
    /// DNS 조회 결과 캐시 시간(초). 0이면 캐시하지 않음
    pub ttl_dns_cache: u64,
    /// 로그 target. 여러 클라이언트를 구분할 때 사용
    pub log_target: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connection_url: None,
            scheme: "http".to_string(),
            host: "127.0.0.1".to_string(),
            port: 80,
            collection: None,
            timeout: Timeout::default(),
            ttl_dns_cache: 3600,
            log_target: "solr_client".to_string(),
        }
    }
}

impl ClientConfig {
    /// 설정 파일(확장자 생략 가능)과 SOLR_ 로 시작하는 환경변수에서 설정을 읽음
    /// <br>
    /// ex) SOLR_COLLECTION=books, SOLR_TIMEOUT__CONNECT=2
    pub fn load(name: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(name))
            .add_source(
                config::Environment::with_prefix("SOLR")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let client_config: ClientConfig = config.try_deserialize()?;
        client_config.timeout.validate()?;
        Ok(client_config)
    }

    pub fn with_connection_url(connection_url: impl Into<String>) -> Self {
        Self {
            connection_url: Some(connection_url.into()),
            ..Self::default()
        }
    }

    /// (base url, 기본 collection)
    pub fn endpoint(&self) -> Result<(String, Option<String>)> {
        let Some(connection_url) = &self.connection_url else {
            let base_url = format!("{}://{}:{}/solr", self.scheme, self.host, self.port);
            return Ok((base_url, non_empty(self.collection.clone())));
        };

        let url = Url::parse(connection_url)?;
        let (base_path, collection) = url.path().rsplit_once('/').unwrap_or(("", url.path()));
        let base_url = format!("{}{}", &url[..Position::BeforePath], base_path);

        Ok((base_url, non_empty(Some(collection.to_string()))))
    }

    pub fn dns_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_dns_cache)
    }
}

fn non_empty(collection: Option<String>) -> Option<String> {
    collection.filter(|c| !c.is_empty())
}

#[test]
fn endpoint_from_parts_test() {
    let config = ClientConfig {
        host: "solr.local".to_string(),
        port: 8983,
        collection: Some("books".to_string()),
        ..ClientConfig::default()
    };
    assert_eq!(
        config.endpoint().unwrap(),
        ("http://solr.local:8983/solr".to_string(), Some("books".to_string()))
    );

    let config = ClientConfig {
        collection: Some(String::new()),
        ..ClientConfig::default()
    };
    assert_eq!(
        config.endpoint().unwrap(),
        ("http://127.0.0.1:80/solr".to_string(), None)
    );
}

#[test]
fn endpoint_from_connection_url_test() {
    let config = ClientConfig::with_connection_url("https://user:pw@search.example.com:8443/solr/books");
    assert_eq!(
        config.endpoint().unwrap(),
        (
            "https://user:pw@search.example.com:8443/solr".to_string(),
            Some("books".to_string())
        )
    );

    // 마지막이 /로 끝나면 collection 없음
    let config = ClientConfig::with_connection_url("http://localhost:8983/solr/");
    assert_eq!(
        config.endpoint().unwrap(),
        ("http://localhost:8983/solr".to_string(), None)
    );

    let config = ClientConfig::with_connection_url("not a url");
    assert!(matches!(config.endpoint(), Err(SolrError::InvalidUrl(_))));
}

#[test]
fn timeout_test() {
    let timeout = Timeout::default();
    assert_eq!(timeout.connect(), Some(Duration::from_secs(1)));
    assert_eq!(timeout.read(), Some(Duration::from_secs(3)));
    assert_eq!(timeout.limit(), Duration::from_secs(4));

    let timeout = Timeout::Total(2.5);
    assert_eq!(timeout.connect(), None);
    assert_eq!(timeout.read(), None);
    assert_eq!(timeout.limit(), Duration::from_millis(2500));

    assert!(Timeout::Total(-1.0).validate().is_err());
    assert!(Timeout::Total(0.0).validate().is_err());
    assert!(Timeout::Split { connect: 1.0, read: f64::NAN }.validate().is_err());
}

#[test]
fn deserialize_config_test() {
    let config: ClientConfig = serde_json::from_str(
        r#"{"host": "10.0.0.5", "port": 8983, "collection": "news", "timeout": 5, "ttl_dns_cache": 0}"#,
    )
    .unwrap();

    assert_eq!(config.timeout, Timeout::Total(5.0));
    assert_eq!(config.dns_ttl(), Duration::ZERO);
    assert_eq!(config.scheme, "http");
    assert_eq!(config.log_target, "solr_client");

    let config: ClientConfig =
        serde_json::from_str(r#"{"timeout": {"connect": 2, "read": 10}}"#).unwrap();
    assert_eq!(config.timeout, Timeout::Split { connect: 2.0, read: 10.0 });
}
