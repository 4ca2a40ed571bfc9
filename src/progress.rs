//! 진행 상황 관찰자
//!
//! 전송 루프는 청크마다 `on_progress(delta)`를 호출한다. 프로토콜 자체는
//! 관찰자 구현에 관여하지 않는다.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// 전송 진행 콜백
pub trait ProgressObserver: Send + Sync {
    /// 헤더 처리 직후 한 번 호출
    fn on_start(&self, _name: &str, _total: u64) {}

    /// 청크 하나가 처리될 때마다 호출
    fn on_progress(&self, delta: u64);

    /// 전송 루프 종료 시 호출 (성공/실패 무관)
    fn on_finish(&self) {}
}

impl<T: ProgressObserver + ?Sized> ProgressObserver for Box<T> {
    fn on_start(&self, name: &str, total: u64) {
        (**self).on_start(name, total)
    }

    fn on_progress(&self, delta: u64) {
        (**self).on_progress(delta)
    }

    fn on_finish(&self) {
        (**self).on_finish()
    }
}

/// 아무것도 하지 않는 관찰자
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _delta: u64) {}
}

/// 터미널 진행 바
pub struct BarObserver {
    bar: ProgressBar,
    verb: &'static str,
}

impl BarObserver {
    /// `verb`는 바 앞에 붙는 동작 이름 ("Sending", "Receiving")
    pub fn new(verb: &'static str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar, verb }
    }

    /// 동시에 여러 전송이 진행될 때 같은 그룹에 바를 추가해 출력이 겹치지 않게 함
    pub fn in_group(verb: &'static str, group: &MultiProgress) -> Self {
        let Self { bar, verb } = Self::new(verb);
        Self {
            bar: group.add(bar),
            verb,
        }
    }
}

impl ProgressObserver for BarObserver {
    fn on_start(&self, name: &str, total: u64) {
        self.bar.set_length(total);
        self.bar.set_message(format!("{} {}", self.verb, name));
    }

    fn on_progress(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn on_finish(&self) {
        self.bar.finish();
    }
}
