//! JSON 파일 저장소.
//!
//! 레지스트리가 없는 플랫폼용. 형식: `{"restart_required_since": <epoch 초>}`.
//! 파일이 없거나 해석할 수 없으면 저장값 없음으로 본다.
//! 쓰기는 같은 디렉토리의 임시 파일을 rename 하는 방식이라 중간 상태가 남지 않는다.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use winrestart_core::error::CoreError;
use winrestart_core::ports::state::RestartStateStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
    #[serde(default)]
    restart_required_since: Option<i64>,
}

/// 파일 기반 `RestartStateStore` 구현
#[derive(Debug, Clone)]
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 저장 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<PersistedState, CoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PersistedState::default()),
            Err(e) => {
                return Err(CoreError::StateStorage(format!(
                    "상태 파일 읽기 실패: {}: {e}",
                    self.path.display()
                )))
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => Ok(state),
            Err(e) => {
                // 다음 save/clear가 덮어쓴다
                warn!("상태 파일 파싱 실패, 저장값 없음으로 처리: {}: {e}", self.path.display());
                Ok(PersistedState::default())
            }
        }
    }

    fn write_atomic(&self, dir: &Path, content: &str) -> std::io::Result<()> {
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl RestartStateStore for JsonFileStateStore {
    fn load(&self) -> Result<Option<i64>, CoreError> {
        Ok(self.read()?.restart_required_since)
    }

    fn save(&self, epoch_secs: i64) -> Result<(), CoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| {
            CoreError::StateStorage(format!("디렉토리 생성 실패: {}: {e}", dir.display()))
        })?;

        let state = PersistedState {
            restart_required_since: Some(epoch_secs),
        };
        let content = serde_json::to_string_pretty(&state)?;
        self.write_atomic(dir, &content).map_err(|e| {
            CoreError::StateStorage(format!("상태 파일 저장 실패: {}: {e}", self.path.display()))
        })?;

        debug!("재시작 상태 저장: {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), CoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::StateStorage(format!(
                "상태 파일 삭제 실패: {}: {e}",
                self.path.display()
            ))),
        }
    }
}
