//! # SFT (Simple File Transfer)
//!
//! TCP 기반 단일 파일 점대점 전송
//!
//! ## 핵심 특징
//! - **단일 연결**: 연결 하나, 파일 하나, 재시도 없음
//! - **헤더 + 본문**: 이름/크기 헤더 뒤에 원시 바이트 스트림
//! - **두 가지 프레이밍**: 길이 접두 (기본), 구분자 (기존 스크립트 호환)
//! - **스트리밍**: 고정 크기 버퍼만 사용, 파일 전체를 메모리에 올리지 않음
//! - **경로 정리**: 수신 이름에서 디렉터리 성분 제거

pub mod cli;
pub mod config;
pub mod error;
pub mod header;
pub mod progress;
pub mod receiver;
pub mod sender;
pub mod stats;

pub use config::{Config, Framing};
pub use error::{Error, Result};
pub use header::{sanitize_name, TransferHeader};
pub use progress::{BarObserver, NoopObserver, ProgressObserver};
pub use receiver::{receive_from, Listener, ReceivedFile};
pub use sender::{send_to, SentFile, Sender};
pub use stats::TransferStats;

/// 기본 청크 크기 (바이트)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 기본 헤더 버퍼 크기 (바이트)
pub const DEFAULT_HEADER_BUFFER_SIZE: usize = 4096;

/// 기본 구분 토큰 (기존 송수신 스크립트와 같은 철자)
pub const DEFAULT_SEPARATOR: &str = "<SEPERATOR>";

/// 기본 포트
pub const DEFAULT_PORT: u16 = 5000;
