//! 바이너리 공통 인자 및 로깅 설정

use std::time::Duration;

use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Framing};

/// 송수신 양쪽이 일치해야 하는 전송 옵션
#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    /// 기존 스크립트 호환 프리셋 (separator 프레이밍)
    #[arg(long, env = "SFT_LEGACY")]
    pub legacy: bool,

    /// 본문 청크 크기 (바이트)
    #[arg(long, env = "SFT_CHUNK_SIZE")]
    pub chunk_size: Option<usize>,

    /// 헤더 버퍼 크기 (바이트)
    #[arg(long, env = "SFT_HEADER_BUFFER_SIZE")]
    pub header_buffer_size: Option<usize>,

    /// 이름/크기 구분 토큰
    #[arg(long, env = "SFT_SEPARATOR")]
    pub separator: Option<String>,

    /// 헤더 프레이밍 (length-prefixed | separator)
    #[arg(long, env = "SFT_FRAMING")]
    pub framing: Option<Framing>,

    /// 진행 바 끄기
    #[arg(long, env = "SFT_NO_PROGRESS")]
    pub no_progress: bool,
}

impl TransferArgs {
    /// 프리셋 위에 명시된 옵션을 덮어씀
    pub fn to_config(&self) -> Config {
        let mut config = if self.legacy {
            Config::legacy()
        } else {
            Config::default()
        };

        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(header_buffer_size) = self.header_buffer_size {
            config.header_buffer_size = header_buffer_size;
        }
        if let Some(separator) = &self.separator {
            config.separator = separator.clone();
        }
        if let Some(framing) = self.framing {
            config.framing = framing;
        }
        config
    }
}

/// 초 단위 타임아웃 파싱
pub fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("양수 초 단위 값 필요: {s}"));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// tracing 구독자 설정 (RUST_LOG, 기본 info)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
