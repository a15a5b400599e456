//! 任务进度句柄
//!
//! 导入导出调用期间借用，调用方可在另一线程读取进度或请求中止。

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;

/// 进度与取消
pub trait TaskProgress: Send + Sync {
    /// 当前步骤说明，仅用于显示
    fn set_step(&self, step: &str);

    /// 进度百分比 0..=100
    fn set_value(&self, percent: i32);

    fn value(&self) -> i32;

    /// 是否请求中止（协作式取消）
    fn is_abort_requested(&self) -> bool;
}

/// 基于原子变量的进度句柄
#[derive(Debug, Default)]
pub struct Progress {
    value: AtomicI32,
    abort_requested: AtomicBool,
    step: Mutex<String>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求中止
    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
    }

    /// 当前步骤说明
    pub fn step(&self) -> String {
        self.step
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TaskProgress for Progress {
    fn set_step(&self, step: &str) {
        let mut current = self
            .step
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current != step {
            tracing::debug!("Progress step: {}", step);
            *current = step.to_string();
        }
    }

    fn set_value(&self, percent: i32) {
        self.value.store(percent.clamp(0, 100), Ordering::SeqCst);
    }

    fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_progress_value_clamped() {
        let progress = Progress::new();
        progress.set_value(150);
        assert_eq!(progress.value(), 100);
        progress.set_value(-3);
        assert_eq!(progress.value(), 0);
    }

    #[test]
    fn test_abort_from_other_thread() {
        let progress = Arc::new(Progress::new());
        let remote = Arc::clone(&progress);
        std::thread::spawn(move || remote.request_abort())
            .join()
            .expect("join");
        assert!(progress.is_abort_requested());
    }

    #[test]
    fn test_step() {
        let progress = Progress::new();
        progress.set_step("model.step");
        assert_eq!(progress.step(), "model.step");
    }
}
