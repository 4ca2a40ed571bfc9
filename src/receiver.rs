//! 수신자 (리스너측)
//!
//! - 연결 하나당 헤더 하나, 파일 하나
//! - 고정 크기 버퍼로 본문을 파일에 스트리밍
//! - 짧은 전송은 에러로 보고하되 부분 파일은 남겨 둠

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::header::{sanitize_name, TransferHeader};
use crate::progress::ProgressObserver;
use crate::stats::TransferStats;
use crate::{Config, Error, Result};

/// 수신 완료된 파일
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    /// 정리된 파일 이름
    pub name: String,

    /// 실제로 쓰인 경로
    pub path: PathBuf,

    /// 전송 통계
    pub stats: TransferStats,
}

impl ReceivedFile {
    /// 수신한 바이트 수
    pub fn bytes(&self) -> u64 {
        self.stats.bytes
    }
}

/// 스트림 하나에서 파일 하나를 수신
///
/// 헤더가 잘못되었으면 파일을 만들지 않는다. 선언된 크기 이후의 바이트는 읽지 않는다.
pub async fn receive_from<R>(
    reader: &mut R,
    config: &Config,
    output_dir: &Path,
    observer: &dyn ProgressObserver,
) -> Result<ReceivedFile>
where
    R: AsyncRead + Unpin,
{
    config.validate()?;

    let header = TransferHeader::read_from(reader, config).await?;
    let name = sanitize_name(&header.name)?;
    let path = output_dir.join(&name);

    let mut file = File::create(&path).await?;
    debug!("출력 파일 생성: {}", path.display());

    observer.on_start(&name, header.size);
    let result = copy_body(reader, &mut file, header.size, config.chunk_size, observer).await;
    observer.on_finish();

    // 짧은 전송이어도 받은 만큼은 디스크에 남김
    file.flush().await?;
    let stats = result?;

    if stats.bytes < header.size {
        return Err(Error::IncompleteTransfer {
            name,
            expected: header.size,
            received: stats.bytes,
        });
    }

    Ok(ReceivedFile { name, path, stats })
}

async fn copy_body<R>(
    reader: &mut R,
    file: &mut File,
    size: u64,
    chunk_size: usize,
    observer: &dyn ProgressObserver,
) -> Result<TransferStats>
where
    R: AsyncRead + Unpin,
{
    let mut stats = TransferStats::new();
    let mut buf = vec![0u8; chunk_size];

    while stats.bytes < size {
        let want = (size - stats.bytes).min(chunk_size as u64) as usize;
        let n = reader
            .read(&mut buf[..want])
            .await
            .map_err(Error::connection("read body"))?;
        if n == 0 {
            warn!("피어가 조기 종료: {}/{} bytes", stats.bytes, size);
            break;
        }

        file.write_all(&buf[..n]).await?;
        stats.record(n);
        observer.on_progress(n as u64);
    }

    Ok(stats)
}

/// accept 실패 후 재시도까지 대기 시간
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// EMFILE 등 지속되는 accept 에러에서 루프가 바쁘게 돌지 않도록 대기
async fn wait_after_accept_error(e: &io::Error) {
    warn!(
        "accept 실패: {} ({}ms 후 재시도)",
        e,
        ACCEPT_RETRY_DELAY.as_millis()
    );
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}

/// TCP 리스너
pub struct Listener {
    listener: TcpListener,
    config: Arc<Config>,
    output_dir: Arc<PathBuf>,
}

impl Listener {
    /// 주소 바인딩
    pub async fn bind(
        host: &str,
        port: u16,
        output_dir: impl Into<PathBuf>,
        config: Config,
    ) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(Error::connection("bind"))?;
        let output_dir = output_dir.into();

        info!(
            "Listening on {} (framing: {}, chunk size: {} bytes, output: {})",
            listener.local_addr().map_err(Error::connection("bind"))?,
            config.framing,
            config.chunk_size,
            output_dir.display()
        );

        Ok(Self {
            listener,
            config: Arc::new(config),
            output_dir: Arc::new(output_dir),
        })
    }

    /// 실제 바인딩된 주소 (포트 0 바인딩 시 사용)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(Error::connection("local_addr"))
    }

    /// 연결 하나를 받아 파일 하나를 수신
    pub async fn accept_one(&self, observer: &dyn ProgressObserver) -> Result<ReceivedFile> {
        let (mut stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(Error::connection("accept"))?;
        info!("{} is connected.", addr);

        let received = receive_from(&mut stream, &self.config, &self.output_dir, observer).await?;
        info!(
            "Received {} ({} bytes) from {}",
            received.name,
            received.bytes(),
            addr
        );
        Ok(received)
    }

    /// 연결을 무한히 받아 각각 독립된 태스크에서 처리
    ///
    /// 연결 사이에 공유되는 상태는 리스닝 소켓과 불변 설정뿐이다.
    /// 개별 전송 실패는 로그만 남기고 다음 연결을 계속 받는다. 반환하지 않는다.
    pub async fn serve<F, O>(self, make_observer: F) -> Infallible
    where
        F: Fn() -> O,
        O: ProgressObserver + 'static,
    {
        loop {
            let (mut stream, addr) = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    wait_after_accept_error(&e).await;
                    continue;
                }
            };
            info!("{} is connected.", addr);

            let config = self.config.clone();
            let output_dir = self.output_dir.clone();
            let observer = make_observer();

            tokio::spawn(async move {
                match receive_from(&mut stream, &config, &output_dir, &observer).await {
                    Ok(received) => info!(
                        "Received {} ({} bytes) from {} | {}",
                        received.name,
                        received.bytes(),
                        addr,
                        received.stats.summary()
                    ),
                    Err(e) => warn!("{} 전송 실패: {}", addr, e),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::tests::RecordingObserver;
    use crate::progress::NoopObserver;
    use std::sync::atomic::Ordering;
    use tokio_test::io::Builder;

    fn wire(name: &str, body: &[u8], declared: u64) -> Vec<u8> {
        let mut bytes = TransferHeader::new(name, declared)
            .encode_length_prefixed()
            .to_vec();
        bytes.extend_from_slice(body);
        bytes
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_receive_writes_exact_body() {
        let dir = tempfile::tempdir().unwrap();
        let body = payload(10_000);
        let observer = RecordingObserver::default();

        let stream = wire("data.bin", &body, body.len() as u64);
        let received = receive_from(
            &mut stream.as_slice(),
            &Config::default(),
            dir.path(),
            &observer,
        )
        .await
        .unwrap();

        assert_eq!(received.name, "data.bin");
        assert_eq!(received.bytes(), 10_000);
        assert_eq!(std::fs::read(dir.path().join("data.bin")).unwrap(), body);

        assert_eq!(
            *observer.started.lock().unwrap(),
            Some(("data.bin".to_string(), 10_000))
        );
        assert_eq!(observer.total.load(Ordering::SeqCst), 10_000);
        assert_eq!(observer.calls.load(Ordering::SeqCst), 3);
        assert_eq!(observer.finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_accept_error_backs_off() {
        let start = std::time::Instant::now();
        wait_after_accept_error(&io::Error::from_raw_os_error(24)).await;
        assert!(start.elapsed() >= ACCEPT_RETRY_DELAY);
    }

    #[tokio::test]
    async fn test_receive_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let stream = wire("empty.txt", &[], 0);

        let received = receive_from(&mut stream.as_slice(), &Config::default(), dir.path(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(received.bytes(), 0);
        assert_eq!(std::fs::metadata(&received.path).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_chunk_size_does_not_change_result() {
        let body = payload(50_000);
        let stream = wire("chunks.bin", &body, body.len() as u64);

        for chunk_size in [1, 4096, 1_000_000] {
            let dir = tempfile::tempdir().unwrap();
            let config = Config {
                chunk_size,
                ..Config::default()
            };
            let received = receive_from(&mut stream.as_slice(), &config, dir.path(), &NoopObserver)
                .await
                .unwrap();

            assert_eq!(received.bytes(), body.len() as u64, "chunk_size={chunk_size}");
            assert_eq!(std::fs::read(&received.path).unwrap(), body);
        }
    }

    #[tokio::test]
    async fn test_bytes_past_declared_size_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let stream = wire("short.txt", b"hello world", 5);

        let received = receive_from(&mut stream.as_slice(), &Config::default(), dir.path(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&received.path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_short_transfer_keeps_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = payload(700);
        let stream = wire("partial.bin", &body, 1000);

        let err = receive_from(&mut stream.as_slice(), &Config::default(), dir.path(), &NoopObserver)
            .await
            .unwrap_err();

        match err {
            Error::IncompleteTransfer {
                name,
                expected,
                received,
            } => {
                assert_eq!(name, "partial.bin");
                assert_eq!(expected, 1000);
                assert_eq!(received, 700);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(std::fs::read(dir.path().join("partial.bin")).unwrap(), body);
    }

    #[tokio::test]
    async fn test_malformed_header_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();

        let mut missing_separator = Builder::new().read(b"report.txt 42").build();
        let err = receive_from(&mut missing_separator, &Config::legacy(), dir.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));

        let mut bad_size = Builder::new().read(b"report.txt<SEPERATOR>4x2").build();
        let err = receive_from(&mut bad_size, &Config::legacy(), dir.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { .. }));

        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_legacy_framing_receive() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = Builder::new()
            .read(b"dsa.pdf<SEPERATOR>11")
            .read(b"hello ")
            .read(b"world")
            .build();

        let received = receive_from(&mut stream, &Config::legacy(), dir.path(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(received.bytes(), 11);
        assert_eq!(std::fs::read(dir.path().join("dsa.pdf")).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_legacy_short_transfer_writes_received_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = Builder::new()
            .read(b"movie.mp4<SEPERATOR>100")
            .read(&[7u8; 30])
            .read(&[9u8; 12])
            .build();

        let err = receive_from(&mut stream, &Config::legacy(), dir.path(), &NoopObserver)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::IncompleteTransfer {
                expected: 100,
                received: 42,
                ..
            }
        ));
        assert_eq!(std::fs::metadata(dir.path().join("movie.mp4")).unwrap().len(), 42);
    }

    #[tokio::test]
    async fn test_traversal_name_stays_in_output_dir() {
        let root = tempfile::tempdir().unwrap();
        let output_dir = root.path().join("inbox");
        std::fs::create_dir(&output_dir).unwrap();

        let stream = wire("../../etc/passwd", b"root:x:0:0", 10);
        let received = receive_from(&mut stream.as_slice(), &Config::default(), &output_dir, &NoopObserver)
            .await
            .unwrap();

        assert_eq!(received.name, "passwd");
        assert_eq!(received.path, output_dir.join("passwd"));
        assert!(!root.path().join("passwd").exists());
        assert!(!root.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_rerun_overwrites_destination() {
        let dir = tempfile::tempdir().unwrap();

        let first = wire("same.txt", b"a much longer first version", 27);
        receive_from(&mut first.as_slice(), &Config::default(), dir.path(), &NoopObserver)
            .await
            .unwrap();

        let second = wire("same.txt", b"v2", 2);
        receive_from(&mut second.as_slice(), &Config::default(), dir.path(), &NoopObserver)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("same.txt")).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_read() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            chunk_size: 0,
            ..Config::default()
        };
        let mut empty: &[u8] = &[];
        let err = receive_from(&mut empty, &config, dir.path(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
