use crate::dispatcher::RawResponse;
use crate::error::Result;
use crate::hooks::RequestHook;
use async_trait::async_trait;
use hyper::Method;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// 작업횟수 카운트
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCnt {
    /// GET 요청 (select, get, ping, dataimport 등)
    pub read_cnt: u32,
    /// POST 요청 (update 및 JSON body 검색)
    pub write_cnt: u32,
    pub err_cnt: u32,
    pub duration_time_total: Duration,
    pub duration_time_min: Duration,
    pub duration_time_max: Duration,
}

impl WorkingCnt {
    pub const fn new() -> Self {
        Self {
            read_cnt: 0,
            write_cnt: 0,
            err_cnt: 0,
            duration_time_total: Duration::ZERO,
            duration_time_min: Duration::MAX,
            duration_time_max: Duration::ZERO,
        }
    }

    pub fn request_cnt(&self) -> u32 {
        self.read_cnt + self.write_cnt
    }
}

impl Default for WorkingCnt {
    fn default() -> Self {
        Self::new()
    }
}

/// 요청 수, 에러 수, 응답 시간을 집계하는 hook
pub struct RequestStats {
    cnt: Mutex<WorkingCnt>,
    log_target: String,
}

impl RequestStats {
    pub fn new(log_target: impl Into<String>) -> Self {
        Self {
            cnt: Mutex::new(WorkingCnt::new()),
            log_target: log_target.into(),
        }
    }

    pub async fn snapshot(&self) -> WorkingCnt {
        self.cnt.lock().await.clone()
    }

    /// 집계를 로그로 남기고 초기화
    pub async fn log_summary(&self) -> WorkingCnt {
        let target = self.log_target.as_str();
        let mut cnt_lock = self.cnt.lock().await;

        info!(
            target: target,
            "READ {}, WRITE {}, ERROR {}",
            cnt_lock.read_cnt, cnt_lock.write_cnt, cnt_lock.err_cnt
        );
        if cnt_lock.request_cnt() > 0 {
            info!(
                target: target,
                "REQUEST: Average {:.2}ms, MIN: {}ms, MAX: {}ms",
                cnt_lock.duration_time_total.as_millis() as f32 / cnt_lock.request_cnt() as f32,
                cnt_lock.duration_time_min.as_millis(),
                cnt_lock.duration_time_max.as_millis(),
            );
        }

        std::mem::take(&mut *cnt_lock)
    }

    /// interval 마다 log_summary를 호출하는 task를 띄움
    pub fn spawn_reporter(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.log_summary().await;
            }
        })
    }
}

#[async_trait]
impl RequestHook for RequestStats {
    async fn on_request_end(
        &self,
        method: &Method,
        url: &str,
        result: &Result<RawResponse>,
        elapsed: Duration,
    ) {
        let failed = match result {
            Ok(response) => !response.is_success(),
            Err(e) => {
                warn!(target: self.log_target.as_str(), "FAIL_REQUEST {} {}: {}", method, url, e);
                true
            }
        };

        let mut cnt_lock = self.cnt.lock().await;
        if method == Method::GET {
            cnt_lock.read_cnt += 1;
        } else {
            cnt_lock.write_cnt += 1;
        }
        if failed {
            cnt_lock.err_cnt += 1;
        }

        cnt_lock.duration_time_total += elapsed;
        if cnt_lock.duration_time_min > elapsed {
            cnt_lock.duration_time_min = elapsed;
        }
        if cnt_lock.duration_time_max < elapsed {
            cnt_lock.duration_time_max = elapsed;
        }
    }
}

#[tokio::test]
async fn request_stats_test() {
    let stats = RequestStats::new("solr_client");

    stats
        .on_request_end(
            &Method::GET,
            "http://localhost/solr/books/select",
            &Ok(RawResponse::new(200, "{}")),
            Duration::from_millis(10),
        )
        .await;
    stats
        .on_request_end(
            &Method::POST,
            "http://localhost/solr/books/update",
            &Ok(RawResponse::new(400, "{}")),
            Duration::from_millis(30),
        )
        .await;
    stats
        .on_request_end(
            &Method::GET,
            "http://localhost/solr/books/ping",
            &Err(crate::error::SolrError::Timeout(Duration::from_secs(3))),
            Duration::from_millis(20),
        )
        .await;

    let cnt = stats.snapshot().await;
    assert_eq!(cnt.read_cnt, 2);
    assert_eq!(cnt.write_cnt, 1);
    assert_eq!(cnt.err_cnt, 2);
    assert_eq!(cnt.duration_time_min, Duration::from_millis(10));
    assert_eq!(cnt.duration_time_max, Duration::from_millis(30));
    assert_eq!(cnt.duration_time_total, Duration::from_millis(60));

    // log_summary 후 초기화
    let logged = stats.log_summary().await;
    assert_eq!(logged, cnt);
    assert_eq!(stats.snapshot().await, WorkingCnt::new());
}

#[tokio::test(start_paused = true)]
async fn spawn_reporter_resets_summary_test() {
    let stats = Arc::new(RequestStats::new("solr_client"));
    let reporter = stats.clone().spawn_reporter(Duration::from_secs(60));

    stats
        .on_request_end(
            &Method::GET,
            "http://localhost/solr/books/ping",
            &Ok(RawResponse::new(200, "{}")),
            Duration::from_millis(5),
        )
        .await;
    assert_eq!(stats.snapshot().await.read_cnt, 1);

    // interval 전에는 유지
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(stats.snapshot().await.read_cnt, 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(stats.snapshot().await, WorkingCnt::new());

    reporter.abort();
}
