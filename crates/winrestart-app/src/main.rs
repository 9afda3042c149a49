//! # winrestart-app
//!
//! windows-restart 바이너리 진입점.
//! DI 와이어링, 실행 모드 분기, 라이프사이클 관리.

mod lifecycle;
mod output;
mod sampler;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use winrestart_core::config::AppConfig;
use winrestart_core::config_manager::ConfigManager;
use winrestart_monitor::bridge::{create_platform_launcher, ConsoleSessionBridge};
use winrestart_monitor::collector::SampleCollector;
use winrestart_monitor::identity::host_identity;
use winrestart_monitor::privilege::TokenPrivilegeClassifier;
use winrestart_monitor::probes::NativeProbes;
use winrestart_monitor::update_status::create_update_status_provider;
use winrestart_storage::create_default_store;
use winrestart_storage::tracker::RestartStateTracker;

use crate::lifecycle::LifecycleManager;
use crate::output::{spawn_stdout_writer, OUTPUT_CAPACITY};
use crate::sampler::{Sampler, SamplingMode};
use crate::scheduler::{Scheduler, TickSchedule};

/// Windows 재시작 필요 상태 모니터
///
/// 주기적으로 머신 상태를 샘플링해 stdout에 JSON 한 줄씩 출력한다.
#[derive(Parser, Debug)]
#[command(name = "windows-restart")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 현재 컨텍스트에서 샘플 1회 수집 후 종료 (콘솔 세션 위임 없음)
    #[arg(long, conflicts_with = "debug")]
    once: bool,

    /// 즉시 1회 실행 후 종료 (위임 없음, 기본 로그 레벨 debug)
    #[arg(long)]
    debug: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l')]
    log_level: Option<String>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

impl Args {
    /// 단발 실행 모드. None이면 주기 실행
    fn single_shot(&self) -> Option<SamplingMode> {
        if self.debug {
            Some(SamplingMode::Debug)
        } else if self.once {
            Some(SamplingMode::Once)
        } else {
            None
        }
    }

    fn log_level(&self) -> &str {
        let default = if self.debug { "debug" } else { "info" };
        self.log_level.as_deref().unwrap_or(default)
    }

    /// 콘솔 세션 위임 프로세스 인자
    fn delegate_args(&self) -> Vec<String> {
        let mut args = vec!["--once".to_string()];
        if let Some(path) = &self.config {
            args.push("--config".to_string());
            args.push(path.display().to_string());
        }
        args
    }
}

/// tracing 초기화. stdout은 레코드 전용이므로 로그는 stderr
fn init_tracing(level: &str) {
    let log_filter = format!(
        "windows_restart={level},winrestart_core={level},winrestart_monitor={level},winrestart_storage={level}"
    );
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();
}

/// 설정 로드. 실패 시 기본값
fn load_config(path: Option<PathBuf>) -> AppConfig {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    match manager {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        Err(e) => {
            warn!("설정 로드 실패: 기본값 사용: {e}");
            AppConfig::default_config()
        }
    }
}

/// 어댑터 생성 (DI 와이어링)
fn build_sampler(args: &Args, config: &AppConfig) -> Result<Sampler> {
    // 1. 수집기 (probe + 업데이트 서비스)
    let collector = SampleCollector::new(host_identity(), Arc::new(NativeProbes::new()))
        .with_update_status(create_update_status_provider(config.update_query_timeout()));

    // 2. 재시작 상태 추적기
    let data_dir = ConfigManager::data_dir().unwrap_or_else(|e| {
        warn!("데이터 디렉토리 확인 실패: 임시 디렉토리 사용: {e}");
        std::env::temp_dir()
    });
    let tracker = RestartStateTracker::new(create_default_store(&data_dir));

    // 3. 콘솔 세션 브리지 (같은 실행 파일을 --once로 위임)
    let program = std::env::current_exe().context("실행 파일 경로 확인 실패")?;
    let bridge = ConsoleSessionBridge::new(create_platform_launcher(), program, args.delegate_args())
        .with_timeout(config.bridge_timeout())
        .with_temp_dir(Some(config.bridge_temp_dir()));

    Ok(Sampler::new(
        collector,
        tracker,
        Arc::new(TokenPrivilegeClassifier::new()),
        Arc::new(bridge),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level());

    let mode = args.single_shot();
    info!(?mode, "windows-restart 시작");

    let config = load_config(args.config.clone());
    let sampler = Arc::new(build_sampler(&args, &config)?);

    let (output_tx, output_rx) = mpsc::channel(OUTPUT_CAPACITY);
    let writer = spawn_stdout_writer(output_rx);

    match mode {
        Some(mode) => {
            if let Some(record) = sampler.execute(mode).await {
                output_tx
                    .send(record)
                    .await
                    .map_err(|_| anyhow!("출력 채널 닫힘"))?;
            }
        }
        None => {
            let schedule = if config.schedule.randomize_offset {
                TickSchedule::randomized(config.period())
            } else {
                TickSchedule::new(config.period(), Duration::ZERO)
            };

            let lifecycle = Arc::new(LifecycleManager::new());
            let shutdown_rx = lifecycle.subscribe();
            let signal_task = {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.wait_for_signal().await })
            };

            Scheduler::new(sampler, schedule, output_tx.clone())
                .run(shutdown_rx)
                .await;
            signal_task.abort();
        }
    }

    // 송신자를 모두 닫아 출력 태스크가 남은 레코드를 비우고 끝나도록
    drop(output_tx);
    writer.await?;

    info!("windows-restart 종료");
    Ok(())
}
