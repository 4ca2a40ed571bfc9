//! 전송 통계

use std::time::{Duration, Instant};

/// 한 번의 전송에 대한 통계
#[derive(Debug, Clone)]
pub struct TransferStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 처리한 본문 바이트
    pub bytes: u64,

    /// 처리한 청크 수
    pub chunks: u64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            bytes: 0,
            chunks: 0,
        }
    }

    /// 청크 하나 기록
    pub fn record(&mut self, size: usize) {
        self.bytes += size as u64;
        self.chunks += 1;
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 처리율 (bytes/sec)
    pub fn throughput(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / elapsed
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Bytes: {} | Chunks: {} | Throughput: {:.2} MB/s",
            self.elapsed().as_secs_f64(),
            self.bytes,
            self.chunks,
            self.throughput() / 1_000_000.0,
        )
    }
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}
