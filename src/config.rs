//! 전송 설정

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result, DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_BUFFER_SIZE, DEFAULT_SEPARATOR};

/// 헤더 프레이밍 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// `u32 BE 이름 길이 | UTF-8 이름 | u64 BE 크기`
    ///
    /// 정확한 길이만큼 읽으므로 세그먼트 경계에 영향받지 않는다.
    #[default]
    LengthPrefixed,

    /// `이름 SEPARATOR 크기` (기존 스크립트와 동일한 포맷)
    ///
    /// 헤더를 한 번의 read로 받는다고 가정한다. 헤더와 본문이 한 번에
    /// 도착하면 MalformedHeader로 실패한다.
    Separator,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::LengthPrefixed => f.write_str("length-prefixed"),
            Framing::Separator => f.write_str("separator"),
        }
    }
}

impl FromStr for Framing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "length-prefixed" | "length" => Ok(Framing::LengthPrefixed),
            "separator" | "legacy" => Ok(Framing::Separator),
            other => Err(Error::InvalidConfig(format!(
                "알 수 없는 프레이밍: {other} (length-prefixed | separator)"
            ))),
        }
    }
}

/// 송수신 공통 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 본문 청크 크기 (바이트)
    pub chunk_size: usize,

    /// 헤더 최대 크기 (바이트)
    /// Separator 프레이밍에서는 헤더 read 버퍼 크기,
    /// LengthPrefixed 프레이밍에서는 이름 길이 상한
    pub header_buffer_size: usize,

    /// 이름과 크기를 구분하는 토큰 (양쪽이 일치해야 함)
    pub separator: String,

    /// 헤더 프레이밍
    pub framing: Framing,

    /// 연결 타임아웃 (None이면 OS 기본값)
    pub connect_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_buffer_size: DEFAULT_HEADER_BUFFER_SIZE,
            separator: DEFAULT_SEPARATOR.to_string(),
            framing: Framing::LengthPrefixed,
            connect_timeout: None,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 기존 스크립트와 호환되는 설정
    pub fn legacy() -> Self {
        Self {
            framing: Framing::Separator,
            ..Self::default()
        }
    }

    /// 대용량 배치 읽기용 설정 (10KB 청크)
    pub fn batch() -> Self {
        Self {
            chunk_size: 10240,
            ..Self::default()
        }
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size는 0보다 커야 함".into()));
        }
        if self.header_buffer_size == 0 {
            return Err(Error::InvalidConfig(
                "header_buffer_size는 0보다 커야 함".into(),
            ));
        }
        if self.separator.is_empty() {
            return Err(Error::InvalidConfig("separator가 비어 있음".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let config = Config::default();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.framing, Framing::LengthPrefixed);
        assert!(config.connect_timeout.is_none());

        assert_eq!(Config::legacy().framing, Framing::Separator);
        assert_eq!(Config::legacy().separator, "<SEPERATOR>");
        assert_eq!(Config::batch().chunk_size, 10240);
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            chunk_size: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = Config {
            separator: String::new(),
            ..Config::legacy()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_framing_parse() {
        assert_eq!("separator".parse::<Framing>().unwrap(), Framing::Separator);
        assert_eq!(
            "length-prefixed".parse::<Framing>().unwrap(),
            Framing::LengthPrefixed
        );
        assert_eq!(Framing::Separator.to_string(), "separator");
        assert!("json".parse::<Framing>().is_err());
    }
}
