//! 현재 사용자로 위임 프로세스 실행 (콘솔 세션 개념이 없는 플랫폼).

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use winrestart_core::error::CoreError;
use winrestart_core::ports::bridge::{DelegateLauncher, DelegateProcess, DelegateRequest};

/// 로컬 자식 프로세스 실행기
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalLauncher;

impl LocalLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DelegateLauncher for LocalLauncher {
    fn platform(&self) -> &str {
        "local"
    }

    async fn launch(&self, request: DelegateRequest) -> Result<Box<dyn DelegateProcess>, CoreError> {
        let child = Command::new(&request.program)
            .args(&request.args)
            .envs(request.env_overrides.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::from(request.stdout))
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CoreError::LaunchFailed(format!("{}: {e}", request.program.display()))
            })?;

        Ok(Box::new(LocalProcess { child }))
    }
}

struct LocalProcess {
    child: Child,
}

#[async_trait]
impl DelegateProcess for LocalProcess {
    async fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<i32>, CoreError> {
        match tokio::time::timeout(timeout, self.child.wait()).await {
            // 시그널 종료는 종료 코드가 없으므로 -1
            Ok(status) => Ok(Some(status?.code().unwrap_or(-1))),
            Err(_) => Ok(None),
        }
    }

    async fn terminate(&mut self) -> Result<(), CoreError> {
        self.child.kill().await?;
        Ok(())
    }
}
