//! windows-restart 도메인 모델.
//!
//! 틱마다 생성되는 샘플과 probe가 돌려주는 원시 값 타입을 정의한다.

pub mod context;
pub mod machine;
pub mod sample;
pub mod update;
