//! SFT 클라이언트 (송신자) - Simple File Transfer
//!
//! 리스너에 연결해 헤더를 보내고 파일 본문을 스트리밍한다.
//!
//! 사용법:
//!   cargo run --release --bin sft-client -- [OPTIONS] <SOURCE>
//!
//! 예시:
//!   # 기본 전송
//!   cargo run --release --bin sft-client -- --host 192.168.1.100 dsa.pdf
//!
//!   # 기존 스크립트(수신측)로 전송, 3초 연결 타임아웃
//!   cargo run --release --bin sft-client -- --legacy --connect-timeout 3 dsa.pdf

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use sft::cli::{init_tracing, parse_secs, TransferArgs};
use sft::{BarObserver, NoopObserver, ProgressObserver, Sender, DEFAULT_PORT};

/// SFT Client - TCP 단일 파일 송신
#[derive(Debug, Parser)]
#[command(name = "sft-client", version, about)]
struct ClientArgs {
    /// 전송할 파일 경로
    #[arg(env = "SFT_SOURCE_PATH")]
    source: PathBuf,

    /// 서버 주소
    #[arg(long, env = "SFT_REMOTE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// 서버 포트
    #[arg(short, long, env = "SFT_REMOTE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// 연결 타임아웃 (초, 기본: 없음)
    #[arg(long, env = "SFT_CONNECT_TIMEOUT", value_parser = parse_secs)]
    connect_timeout: Option<Duration>,

    #[command(flatten)]
    transfer: TransferArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = ClientArgs::parse();

    let mut config = args.transfer.to_config();
    config.connect_timeout = args.connect_timeout;

    info!("SFT Client starting...");

    let observer: Box<dyn ProgressObserver> = if args.transfer.no_progress {
        Box::new(NoopObserver)
    } else {
        Box::new(BarObserver::new("Sending"))
    };

    let sender = Sender::new(config);
    match sender
        .send_file(&args.host, args.port, &args.source, observer.as_ref())
        .await
    {
        Ok(sent) => {
            if sent.bytes() != sent.declared_size {
                warn!(
                    "{} changed during transfer: declared {} bytes, sent {} bytes",
                    sent.name,
                    sent.declared_size,
                    sent.bytes()
                );
            }
            info!("Sent {} ({} bytes)", sent.name, sent.bytes());
            info!("{}", sent.stats.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
