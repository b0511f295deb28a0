use log::{error, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::{Config, Handle};
use std::error::Error;
use std::path::{Path, PathBuf};

type BoxedError = Box<dyn Error + Send + Sync>;

const LOG_PATTERN: &str = "[{d(%Y-%m-%d %H:%M:%S)}] [{t}] [{l}] {m}{n}";
const LOG_DIR: &str = "log";

/// 클라이언트 log target 별 로거 설정.
/// <br>
/// 콘솔과 log/{log_target}.log 파일(5MB 단위로 5개까지 보관)에 기록.
/// log_target은 level을 따르고 그 외(hyper 등)는 Info 이상만 기록함.
/// 이미 설정된 logger가 있으면 에러
pub fn setup_logger(log_target: &str, level: LevelFilter) -> Result<Handle, BoxedError> {
    let config = build_config(Path::new(LOG_DIR), log_target, level)?;
    let handle = log4rs::init_config(config)?;

    std::panic::set_hook(Box::new(|panic_info| {
        if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            error!("panic occurred: {s:?}");
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            error!("panic occurred: {s:?}");
        } else {
            error!("panic occurred");
        }

        if let Some(location) = panic_info.location() {
            error!(
                "panic occurred in file '{}' at line {}",
                location.file(),
                location.line(),
            );
        }

        error!("panic debug info: {:?}", panic_info);
    }));

    Ok(handle)
}

/// log target으로 파일 경로 생성. 모듈 경로 형식(a::b)은 a_b로 바꿈
pub fn log_file_path(log_dir: &Path, log_target: &str) -> PathBuf {
    let file_name = match log_target.trim() {
        "" => "solr_client".to_string(),
        target => target.replace("::", "_").replace(['/', '\\'], "_"),
    };
    log_dir.join(format!("{file_name}.log"))
}

fn build_config(log_dir: &Path, log_target: &str, level: LevelFilter) -> Result<Config, BoxedError> {
    let log_file = log_file_path(log_dir, log_target);
    let roller_pattern = format!("{}.{{}}", log_file.display());

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();
    let fixed_window_roller = FixedWindowRoller::builder().build(&roller_pattern, 5)?;

    let size_trigger = SizeTrigger::new(500_0000); // 대략 5MB
    let compound_policy =
        CompoundPolicy::new(Box::new(size_trigger), Box::new(fixed_window_roller));
    let file_appender = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file, Box::new(compound_policy))?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .appender(Appender::builder().build("file_appender", Box::new(file_appender)))
        .logger(Logger::builder().build(log_target, level))
        .build(
            Root::builder()
                .appenders(["stdout", "file_appender"])
                .build(LevelFilter::Info.min(level)),
        )?;

    Ok(config)
}

#[test]
fn log_file_path_test() {
    let log_dir = Path::new("log");
    assert_eq!(
        log_file_path(log_dir, "solr_client"),
        Path::new("log/solr_client.log")
    );
    assert_eq!(
        log_file_path(log_dir, "search::solr"),
        Path::new("log/search_solr.log")
    );
    assert_eq!(log_file_path(log_dir, " "), Path::new("log/solr_client.log"));
}

#[test]
fn build_config_test() {
    let log_dir = std::env::temp_dir().join(format!("solr_client_log_{}", std::process::id()));
    let config = build_config(&log_dir, "books_client", LevelFilter::Debug).unwrap();

    let logger = &config.loggers()[0];
    assert_eq!(logger.name(), "books_client");
    assert_eq!(logger.level(), LevelFilter::Debug);
    assert_eq!(config.root().level(), LevelFilter::Info);
    assert!(log_dir.join("books_client.log").exists());

    // Info보다 낮게 지정하면 root도 함께 낮춤
    let config = build_config(&log_dir, "books_client", LevelFilter::Warn).unwrap();
    assert_eq!(config.root().level(), LevelFilter::Warn);

    let _ = std::fs::remove_dir_all(&log_dir);
}
