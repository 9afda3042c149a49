//! 애플리케이션 설정 구조체.
//!
//! 샘플링 주기, 브리지 타임아웃, 업데이트 서비스 조회 타임아웃 등
//! 런타임 설정을 정의한다. [`crate::config_manager`]가 JSON 파일에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 스케줄 설정
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// 세션 브리지 설정
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// 업데이트 서비스 조회 설정
    #[serde(default)]
    pub update: UpdateConfig,
}

// ============================================================
// 스케줄 설정
// ============================================================

/// 스케줄 설정: 주기와 프로세스별 위상 오프셋
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 샘플링 주기 (초)
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    /// 시작 시 주기 내 임의 위상(분 단위) 선택
    #[serde(default = "default_true")]
    pub randomize_offset: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period_secs: default_period_secs(),
            randomize_offset: true,
        }
    }
}

// ============================================================
// 브리지 설정
// ============================================================

/// 세션 브리지 설정: 위임 프로세스 대기 시간, 임시 경로
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// 위임 프로세스 종료 대기 한도 (밀리초)
    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,
    /// 채널 파일과 스크래치 디렉토리를 만들 위치 (None = 시스템 임시 디렉토리)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_bridge_timeout_ms(),
            temp_dir: None,
        }
    }
}

// ============================================================
// 업데이트 서비스 설정
// ============================================================

/// 업데이트 서비스 조회 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// 조회 한도 (밀리초)
    #[serde(default = "default_update_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_update_query_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// 기본 설정
    pub fn default_config() -> Self {
        Self {
            schedule: ScheduleConfig::default(),
            bridge: BridgeConfig::default(),
            update: UpdateConfig::default(),
        }
    }

    /// 샘플링 주기를 Duration으로 반환
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.schedule.period_secs.max(1))
    }

    /// 브리지 대기 한도를 Duration으로 반환
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.timeout_ms)
    }

    /// 업데이트 서비스 조회 한도를 Duration으로 반환
    pub fn update_query_timeout(&self) -> Duration {
        Duration::from_millis(self.update.query_timeout_ms)
    }

    /// 브리지 임시 경로 (설정 없으면 시스템 임시 디렉토리)
    pub fn bridge_temp_dir(&self) -> PathBuf {
        self.bridge
            .temp_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_period_secs() -> u64 {
    3_600
}

fn default_bridge_timeout_ms() -> u64 {
    10_000
}

fn default_update_query_timeout_ms() -> u64 {
    60_000
}
