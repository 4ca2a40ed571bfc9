//! 에러 타입 정의

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// SFT 전송 에러 타입
///
/// 모든 에러는 한 번의 전송 시도에 국한되며, 재시도 없이 호출자에게 바로 전달된다.
#[derive(Error, Debug)]
pub enum Error {
    /// 로컬 파일시스템 에러 (출력 파일 생성/쓰기, 원본 파일 읽기)
    #[error("IO 에러: {0}")]
    Io(#[from] io::Error),

    /// 전송 계층 에러 (bind/accept/connect/소켓 읽기·쓰기)
    #[error("연결 에러 ({context}): {source}")]
    Connection {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    /// 헤더 파싱 실패. 연결은 더 이상 사용할 수 없다.
    #[error("잘못된 헤더: {reason}")]
    MalformedHeader { reason: String },

    /// 선언된 크기에 도달하기 전에 피어가 연결을 닫음
    #[error("불완전한 전송: {name} expected {expected} bytes, got {received} bytes")]
    IncompleteTransfer {
        name: String,
        expected: u64,
        received: u64,
    },

    #[error("원본 파일 없음: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// 헤더로 표현할 수 없는 파일 이름 (송신측)
    #[error("유효하지 않은 파일 이름 {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("유효하지 않은 설정: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// 전송 계층 에러 생성용 헬퍼 (`map_err(Error::connection("read"))`)
    pub fn connection(context: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Connection { context, source }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedHeader {
            reason: reason.into(),
        }
    }

    /// 프로세스 종료 코드
    ///
    /// 0은 성공에 예약되어 있으므로 에러는 항상 2 이상이다.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidName { .. } => 2,
            Error::MalformedHeader { .. } => 3,
            Error::IncompleteTransfer { .. } => 4,
            Error::SourceNotFound { .. } => 5,
            Error::Connection { .. } => 6,
            Error::Io(_) => 7,
        }
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
