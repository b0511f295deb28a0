use log::{error, info, LevelFilter};
use solr_client::setting_log;
use solr_client::{Client, ClientConfig, Params, PingAction, RequestHook, RequestStats};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// 집계 로그 주기
const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// config 파일의 Solr 노드에 ping을 보내 상태를 확인.
/// <br>
/// ex) solr_client [status|enable|disable] [반복횟수]
/// <br>
/// SOLR_LOG_LEVEL=debug 로 클라이언트 로그 level 지정
#[tokio::main]
async fn main() -> ExitCode {
    let config = match ClientConfig::load("config") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let level = std::env::var("SOLR_LOG_LEVEL")
        .ok()
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    setting_log::setup_logger(&config.log_target, level).expect("Setup Logger Failed");

    let mut args = std::env::args().skip(1);
    let action = match args.next().map(|a| a.parse::<PingAction>()).transpose() {
        Ok(action) => action.unwrap_or_default(),
        Err(e) => {
            error!(target: config.log_target.as_str(), "{}", e);
            return ExitCode::FAILURE;
        }
    };
    let repeat = args.next().and_then(|r| r.parse::<u32>().ok()).unwrap_or(1);

    let stats = Arc::new(RequestStats::new(config.log_target.clone()));
    let client = match Client::with_hooks(config, vec![stats.clone() as Arc<dyn RequestHook>]) {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let target = client.log_target();
    info!(target: target, "solr ping starting... base url: {}", client.base_url());

    client.setup().await;
    let reporter = stats.clone().spawn_reporter(REPORT_INTERVAL);

    let mut failed = false;
    for seq in 0..repeat {
        if seq > 0 {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        match client.ping(action, Params::new()).await {
            Ok(response) => info!(
                target: target,
                "PING {} OK: {}",
                action,
                response.get("status").unwrap_or(&response.raw)
            ),
            Err(e) => {
                error!(target: target, "PING {} FAIL: {}", action, e);
                if let Some(trace) = e.trace() {
                    error!(target: target, "{}", trace);
                }
                failed = true;
            }
        }
    }

    reporter.abort();
    stats.log_summary().await;
    client.close().await;

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
