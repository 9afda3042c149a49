//! 레코드 출력.
//!
//! 샘플러가 만든 레코드를 `mpsc` 채널로 받아 stdout에 한 줄씩 쓴다.
//! 로그는 stderr로 가므로 stdout에는 레코드만 남는다.

use std::io::Write;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use winrestart_core::error::CoreError;

use crate::sampler::Record;

/// 출력 채널 용량
pub const OUTPUT_CAPACITY: usize = 16;

/// 레코드 직렬 출력기
pub struct RecordWriter<W> {
    writer: W,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 레코드 1건 출력 후 flush
    pub fn write_record(&mut self, record: &Record) -> Result<(), CoreError> {
        let line = record.to_line()?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    /// 채널이 닫힐 때까지 레코드 출력
    pub async fn drain(mut self, mut rx: mpsc::Receiver<Record>) -> W {
        while let Some(record) = rx.recv().await {
            match self.write_record(&record) {
                Ok(()) => debug!("레코드 출력 완료"),
                Err(e) => error!("레코드 출력 실패: {e}"),
            }
        }
        self.writer
    }
}

/// stdout 출력 태스크 시작
pub fn spawn_stdout_writer(rx: mpsc::Receiver<Record>) -> JoinHandle<()> {
    tokio::spawn(async move {
        RecordWriter::new(std::io::stdout()).drain(rx).await;
    })
}
