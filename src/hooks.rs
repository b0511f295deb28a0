use crate::dispatcher::RawResponse;
use crate::error::Result;
use async_trait::async_trait;
use hyper::Method;
use std::time::Duration;

/// 요청 전후로 호출되는 계측용 hook.
/// <br>
/// HyperDispatcher가 요청마다 등록된 순서대로 호출함
#[async_trait]
pub trait RequestHook: Send + Sync {
    async fn on_request_start(&self, _method: &Method, _url: &str) {}

    async fn on_request_end(
        &self,
        method: &Method,
        url: &str,
        result: &Result<RawResponse>,
        elapsed: Duration,
    );
}
