//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! `winrestart-monitor`, `winrestart-storage`가 이 trait들을 구현하며,
//! `winrestart-app`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 프로세스 실행/대기가 걸린 trait은 `async_trait` 매크로를 사용한다.

pub mod bridge;
pub mod privilege;
pub mod probe;
pub mod state;
