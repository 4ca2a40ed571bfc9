//! 송신자 (이니시에이터측)
//!
//! - 원본 파일 메타데이터로 헤더 생성
//! - 헤더를 한 번에 쓰고 본문을 청크 단위로 스트리밍
//! - 단일 연결 시도, 재시도 없음

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::header::TransferHeader;
use crate::progress::ProgressObserver;
use crate::stats::TransferStats;
use crate::{Config, Error, Result};

/// 송신 완료 결과
#[derive(Debug, Clone)]
pub struct SentFile {
    /// 헤더에 실린 파일 이름
    pub name: String,

    /// 헤더에 선언한 크기
    pub declared_size: u64,

    /// 전송 통계 (실제로 보낸 본문 바이트)
    pub stats: TransferStats,
}

impl SentFile {
    pub fn bytes(&self) -> u64 {
        self.stats.bytes
    }
}

/// 헤더와 본문을 writer에 기록
///
/// 본문은 원본이 EOF에 도달할 때까지 보낸다. 헤더 작성 이후 원본 크기가
/// 바뀌면 선언된 크기와 실제 전송량이 달라질 수 있다.
pub async fn send_to<W, R>(
    writer: &mut W,
    source: &mut R,
    header: &TransferHeader,
    config: &Config,
    observer: &dyn ProgressObserver,
) -> Result<TransferStats>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    config.validate()?;

    let header_bytes = header.encode(config)?;
    writer
        .write_all(&header_bytes)
        .await
        .map_err(Error::connection("write header"))?;
    debug!("헤더 전송: {} bytes", header_bytes.len());

    observer.on_start(&header.name, header.size);
    let result = copy_body(writer, source, config.chunk_size, observer).await;
    observer.on_finish();
    let stats = result?;

    writer.flush().await.map_err(Error::connection("flush"))?;
    Ok(stats)
}

async fn copy_body<W, R>(
    writer: &mut W,
    source: &mut R,
    chunk_size: usize,
    observer: &dyn ProgressObserver,
) -> Result<TransferStats>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut stats = TransferStats::new();
    let mut buf = vec![0u8; chunk_size];

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            break;
        }

        // write_all은 부분 쓰기를 내부에서 재시도한다
        writer
            .write_all(&buf[..n])
            .await
            .map_err(Error::connection("write body"))?;
        stats.record(n);
        observer.on_progress(n as u64);
    }

    Ok(stats)
}

/// 파일 송신자
#[derive(Debug, Clone, Default)]
pub struct Sender {
    config: Config,
}

impl Sender {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 파일 하나를 `host:port`로 전송
    ///
    /// 원본 확인과 헤더 생성이 연결보다 먼저 이루어지므로, 원본이 없으면
    /// 연결을 시도하지 않는다.
    pub async fn send_file(
        &self,
        host: &str,
        port: u16,
        path: impl AsRef<Path>,
        observer: &dyn ProgressObserver,
    ) -> Result<SentFile> {
        let path = path.as_ref();
        self.config.validate()?;

        let (mut source, header) = open_source(path).await?;
        // 연결 전에 헤더가 프레이밍 가능한지 확인
        header.encode(&self.config)?;

        let mut stream = self.connect(host, port).await?;
        info!("[+] Connected to {}:{}", host, port);

        let stats = send_to(&mut stream, &mut source, &header, &self.config, observer).await?;
        stream
            .shutdown()
            .await
            .map_err(Error::connection("shutdown"))?;

        if stats.bytes != header.size {
            debug!(
                "선언 크기와 실제 전송량 불일치: declared={}, sent={}",
                header.size, stats.bytes
            );
        }

        Ok(SentFile {
            name: header.name,
            declared_size: header.size,
            stats,
        })
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        info!("[+] Connecting to {}:{}", host, port);

        let connect = TcpStream::connect((host, port));
        let stream = match self.config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connect)
                .await
                .map_err(|_| Error::connection("connect")(io::ErrorKind::TimedOut.into()))?,
            None => connect.await,
        };

        stream.map_err(Error::connection("connect"))
    }
}

/// 원본 파일을 열고 메타데이터로 헤더 생성
async fn open_source(path: &Path) -> Result<(File, TransferHeader)> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_file() {
        return Err(Error::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::InvalidName {
            name: path.display().to_string(),
            reason: "UTF-8 파일 이름이 아님".into(),
        })?
        .to_string();

    let file = File::open(path).await?;
    Ok((file, TransferHeader::new(name, metadata.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingObserver;
    use crate::progress::NoopObserver;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_send_writes_header_then_body() {
        let header = TransferHeader::new("hello.txt", 11);
        let mut source: &[u8] = b"hello world";
        let mut wire: Vec<u8> = Vec::new();
        let observer = RecordingObserver::default();

        let config = Config {
            chunk_size: 4,
            ..Config::legacy()
        };
        let stats = send_to(&mut wire, &mut source, &header, &config, &observer)
            .await
            .unwrap();

        assert_eq!(stats.bytes, 11);
        assert_eq!(stats.chunks, 3);
        assert_eq!(&wire[..], b"hello.txt<SEPERATOR>11hello world");
        assert_eq!(observer.total.load(Ordering::SeqCst), 11);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_length_prefixed_round_trips_through_header_decoder() {
        let header = TransferHeader::new("a.bin", 3);
        let mut source: &[u8] = &[1, 2, 3];
        let mut wire: Vec<u8> = Vec::new();

        send_to(&mut wire, &mut source, &header, &Config::default(), &NoopObserver)
            .await
            .unwrap();

        let mut reader = wire.as_slice();
        let decoded = TransferHeader::read_from(&mut reader, &Config::default())
            .await
            .unwrap();
        assert_eq!(decoded, header);
        assert_eq!(reader, &[1u8, 2, 3][..]);
    }

    #[tokio::test]
    async fn test_send_stops_at_source_eof() {
        // 선언보다 짧은 원본은 있는 만큼만 보냄
        let header = TransferHeader::new("grown.log", 100);
        let mut source: &[u8] = b"only this";
        let mut wire: Vec<u8> = Vec::new();

        let stats = send_to(&mut wire, &mut source, &header, &Config::default(), &NoopObserver)
            .await
            .unwrap();
        assert_eq!(stats.bytes, 9);
    }

    #[tokio::test]
    async fn test_unframable_name_writes_nothing() {
        let header = TransferHeader::new("x<SEPERATOR>y", 1);
        let mut source: &[u8] = b"z";
        let mut wire: Vec<u8> = Vec::new();

        let err = send_to(&mut wire, &mut source, &header, &Config::legacy(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
        assert!(wire.is_empty());
    }

    #[tokio::test]
    async fn test_open_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dsa.pdf");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let (_file, header) = open_source(&path).await.unwrap();
        assert_eq!(header, TransferHeader::new("dsa.pdf", 1234));

        let err = open_source(&dir.path().join("missing.pdf")).await.unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));

        let err = open_source(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }
}
