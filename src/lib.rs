//! 비동기 Solr HTTP 클라이언트.
//! <br>
//! select/get/update/commit/suggest/dataimport/ping 핸들러 호출과
//! 검색어 정리(clean), 응답 정규화를 제공

pub mod clean;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod dns_cache;
pub mod error;
pub mod hooks;
pub mod params;
pub mod query_string;
pub mod response;
pub mod setting_log;
pub mod stats;
pub mod xml_update;

pub use crate::clean::{clean, clean_query, truncate_utf8, CleanOptions};
pub use crate::client::{Client, PingAction, PollPolicy, Suggestion, Suggestions};
pub use crate::config::{ClientConfig, Timeout};
pub use crate::dispatcher::{Dispatcher, HyperDispatcher, RawResponse, UpdatePayload};
pub use crate::error::{Result, SolrError};
pub use crate::hooks::RequestHook;
pub use crate::params::{ParamValue, Params};
pub use crate::response::{Document, FacetCount, Response};
pub use crate::stats::{RequestStats, WorkingCnt};
