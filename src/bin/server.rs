//! SFT 서버 (수신자) - Simple File Transfer
//!
//! 연결 하나를 받아 헤더를 해석하고 본문을 파일로 저장한다.
//! `--serve`를 주면 연결마다 독립된 태스크로 계속 수신한다.
//!
//! 사용법:
//!   cargo run --release --bin sft-server -- [OPTIONS]
//!
//! 예시:
//!   # 파일 하나 수신 후 종료
//!   cargo run --release --bin sft-server -- --port 5000 --output-dir ./inbox
//!
//!   # 기존 스크립트(송신측)와 호환, 계속 수신
//!   cargo run --release --bin sft-server -- --legacy --serve

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use indicatif::MultiProgress;
use tracing::{error, info};

use sft::cli::{init_tracing, TransferArgs};
use sft::{BarObserver, Listener, NoopObserver, ProgressObserver, DEFAULT_PORT};

/// SFT Server - TCP 단일 파일 수신
#[derive(Debug, Parser)]
#[command(name = "sft-server", version, about)]
struct ServerArgs {
    /// 바인드 주소
    #[arg(long, env = "SFT_BIND_HOST", default_value = "0.0.0.0")]
    host: String,

    /// 바인드 포트
    #[arg(short, long, env = "SFT_BIND_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// 수신 파일 저장 디렉터리
    #[arg(short, long, env = "SFT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// 연결을 계속 받음 (기본: 파일 하나 수신 후 종료)
    #[arg(long, env = "SFT_SERVE")]
    serve: bool,

    #[command(flatten)]
    transfer: TransferArgs,
}

/// 모든 연결의 진행 바는 하나의 MultiProgress에 붙는다
fn observer(no_progress: bool, bars: &MultiProgress) -> Box<dyn ProgressObserver> {
    if no_progress {
        Box::new(NoopObserver)
    } else {
        Box::new(BarObserver::in_group("Receiving", bars))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = ServerArgs::parse();
    let config = args.transfer.to_config();

    info!("SFT Server starting...");

    let listener = match Listener::bind(&args.host, args.port, &args.output_dir, config).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let no_progress = args.transfer.no_progress;
    let bars = MultiProgress::new();
    if args.serve {
        match listener.serve(move || observer(no_progress, &bars)).await {}
    }

    match listener.accept_one(observer(no_progress, &bars).as_ref()).await {
        Ok(received) => {
            info!("Saved to {}", received.path.display());
            info!("{}", received.stats.summary());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Transfer failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
