//! 샘플 모델.
//!
//! 한 틱의 관측 결과. 점(`.`)으로 네임스페이스를 나눈 문자열 키와
//! 스칼라 값(문자열, 정수, 불리언, null)의 정렬된 맵이다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::machine::HostIdentity;
use crate::{RECORD_NAME, SERVICE_NAME};

/// 샘플 필드 값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl SampleValue {
    /// 불리언 값이면 반환
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for SampleValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SampleValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SampleValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for SampleValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for SampleValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<usize> for SampleValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for SampleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SampleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<SampleValue>> From<Option<T>> for SampleValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

/// 한 시점의 머신 상태 관측 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sample {
    fields: BTreeMap<String, SampleValue>,
}

impl Sample {
    /// 빈 샘플 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 식별 필드(호스트, 서비스 이름, 레코드 종류)만 채운 샘플 생성
    pub fn with_identity(identity: &HostIdentity) -> Self {
        let mut sample = Self::new();
        sample.insert("meta.local_hostname", identity.hostname.as_str());
        sample.insert("meta.local_platform", identity.platform.as_str());
        if let Some(version) = &identity.version {
            sample.insert("meta.local_version", version.as_str());
        }
        if let Some(os) = &identity.os {
            sample.insert("meta.local_os", os.as_str());
        }
        sample.insert("service_name", SERVICE_NAME);
        sample.insert("name", RECORD_NAME);
        sample
    }

    /// 필드 설정 (같은 키가 있으면 덮어씀)
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<SampleValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// 필드 조회
    pub fn get(&self, key: &str) -> Option<&SampleValue> {
        self.fields.get(key)
    }

    /// 필드 존재 여부
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 키 목록 (정렬 순서)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// 한 줄 JSON으로 직렬화
    pub fn to_json_line(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }
}
