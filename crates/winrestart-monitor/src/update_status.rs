//! Windows Update 서비스 조회 어댑터.
//!
//! `Microsoft.Update.SystemInfo` / `Microsoft.Update.AutoUpdate` 자동화 객체를
//! `powershell.exe`로 생성하고 결과를 JSON 한 줄로 받는다.
//! 조회는 제한 시간 안에서 한 번만 시도한다.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;
use winrestart_core::error::CoreError;
use winrestart_core::models::update::{UpdateSettings, UpdateStatus};
use winrestart_core::ports::probe::UpdateStatusProvider;

/// 업데이트 상태를 JSON으로 출력하는 PowerShell 스크립트
///
/// WUA 날짜는 UTC 값이지만 Kind가 지정되지 않으므로 UTC로 지정한 뒤 ISO-8601로 출력.
const QUERY_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
function Format-UtcDate($value) {
    if ($null -eq $value) { return $null }
    $date = [datetime]$value
    if ($date.Year -le 1900) { return $null }
    return [datetime]::SpecifyKind($date, [System.DateTimeKind]::Utc).ToString('o')
}
$systemInfo = New-Object -ComObject Microsoft.Update.SystemInfo
$autoUpdate = New-Object -ComObject Microsoft.Update.AutoUpdate
$results = $autoUpdate.Results
$settings = $autoUpdate.Settings
[pscustomobject]@{
    RebootRequired = [bool]$systemInfo.RebootRequired
    LastSearchSuccessDate = Format-UtcDate $results.LastSearchSuccessDate
    LastInstallationSuccessDate = Format-UtcDate $results.LastInstallationSuccessDate
    ServiceEnabled = [bool]$autoUpdate.ServiceEnabled
    NotificationLevel = [int]$settings.NotificationLevel
    ReadOnly = [bool]$settings.ReadOnly
    Required = [bool]$settings.Required
    ScheduledInstallationDay = [int]$settings.ScheduledInstallationDay
    ScheduledInstallationTime = [int]$settings.ScheduledInstallationTime
    IncludeRecommendedUpdates = [bool]$settings.IncludeRecommendedUpdates
    NonAdministratorsElevated = [bool]$settings.NonAdministratorsElevated
    FeaturedUpdatesEnabled = [bool]$settings.FeaturedUpdatesEnabled
} | ConvertTo-Json -Compress
"#;

/// 스크립트 출력 형식
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawUpdateStatus {
    reboot_required: bool,
    last_search_success_date: Option<String>,
    last_installation_success_date: Option<String>,
    service_enabled: bool,
    notification_level: i64,
    read_only: bool,
    required: bool,
    scheduled_installation_day: i64,
    scheduled_installation_time: i64,
    include_recommended_updates: bool,
    non_administrators_elevated: bool,
    featured_updates_enabled: bool,
}

/// PowerShell 기반 업데이트 서비스 조회: `UpdateStatusProvider` 포트 구현
pub struct PowerShellUpdateStatus {
    timeout: Duration,
}

impl PowerShellUpdateStatus {
    /// 새 조회 어댑터 생성
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl UpdateStatusProvider for PowerShellUpdateStatus {
    async fn query_status(&self) -> Result<UpdateStatus, CoreError> {
        let mut command = Command::new("powershell.exe");
        command
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                QUERY_SCRIPT,
            ])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| CoreError::ExecutionTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })?
            .map_err(|e| CoreError::UpdateService {
                message: format!("powershell.exe 실행 실패: {e}"),
                detail: format!("{e:?}"),
            })?;

        if !output.status.success() {
            return Err(CoreError::UpdateService {
                message: format!("powershell.exe 종료 상태 {}", output.status),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("업데이트 서비스 응답: {}", stdout.trim());
        parse_status(&stdout)
    }
}

/// 스크립트 출력(JSON)을 `UpdateStatus`로 변환
pub fn parse_status(json: &str) -> Result<UpdateStatus, CoreError> {
    let raw: RawUpdateStatus =
        serde_json::from_str(json.trim()).map_err(|e| CoreError::UpdateService {
            message: format!("응답 파싱 실패: {e}"),
            detail: json.trim().to_string(),
        })?;

    Ok(UpdateStatus {
        restart_required: raw.reboot_required,
        last_check_date: parse_utc(raw.last_search_success_date.as_deref()),
        last_install_date: parse_utc(raw.last_installation_success_date.as_deref()),
        enabled: raw.service_enabled,
        settings: UpdateSettings {
            notification_level: raw.notification_level,
            read_only: raw.read_only,
            required: raw.required,
            scheduled_installation_day: raw.scheduled_installation_day,
            scheduled_installation_time: raw.scheduled_installation_time,
            include_recommended_updates: raw.include_recommended_updates,
            non_administrators_elevated: raw.non_administrators_elevated,
            featured_updates_enabled: raw.featured_updates_enabled,
        },
    })
}

fn parse_utc(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?;
    match DateTime::parse_from_rfc3339(value) {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            debug!("날짜 파싱 실패 ({value}): {e}");
            None
        }
    }
}

/// 현재 플랫폼의 업데이트 서비스 조회 어댑터 생성
///
/// Windows 외 플랫폼은 업데이트 서비스가 없으므로 None.
pub fn create_update_status_provider(timeout: Duration) -> Option<Arc<dyn UpdateStatusProvider>> {
    if cfg!(target_os = "windows") {
        Some(Arc::new(PowerShellUpdateStatus::new(timeout)))
    } else {
        debug!("업데이트 서비스 미지원 플랫폼: 조회 생략");
        None
    }
}
