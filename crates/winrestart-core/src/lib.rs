//! # winrestart-core
//!
//! windows-restart 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 샘플, 실행 컨텍스트, 업데이트 상태 등 도메인 데이터
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (probe, 권한, 브리지, 상태 저장소)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

/// 출력 레코드의 서비스 이름
pub const SERVICE_NAME: &str = "windows-restart";

/// 출력 레코드 종류
pub const RECORD_NAME: &str = "monitor";
