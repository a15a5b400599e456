//! 进度桥接
//!
//! 把各编解码库的进度接口转发到 [`TaskProgress`]：
//! - [`OccProgress`]：内核轮询式指示器，被调用 `show()` 时读取作用域名称和位置
//! - [`OccProgressIndicator`]：内核作用域树，百分比或步骤名变化时才转发
//! - [`task_iface`]：流式网格库的任务接口结构，进度每增加 5 个百分点才转发
//!
//! 三者都接受空的进度句柄，此时只是不报告进度。

use crate::progress::TaskProgress;
use partview_core::math::mapped_value;
use partview_core::message::{ProgressIndicator, ProgressScope, ProgressScopes, ScopeIndicator};

/// 轮询式指示器
pub struct OccProgress<'a> {
    progress: Option<&'a dyn TaskProgress>,
    scopes: ProgressScopes,
}

impl<'a> OccProgress<'a> {
    pub fn new(progress: Option<&'a dyn TaskProgress>) -> Self {
        Self {
            progress,
            scopes: ProgressScopes::default(),
        }
    }
}

impl ProgressIndicator for OccProgress<'_> {
    fn show(&mut self, _force: bool) -> bool {
        if let Some(progress) = self.progress {
            if let Some(name) = self.scopes.current_name() {
                progress.set_step(name);
            }
            progress.set_value(mapped_value(self.scopes.position(), 0.0, 1.0, 0.0, 100.0) as i32);
        }
        true
    }

    fn user_break(&mut self) -> bool {
        self.progress.is_some_and(|p| p.is_abort_requested())
    }

    fn scopes(&self) -> &ProgressScopes {
        &self.scopes
    }

    fn scopes_mut(&mut self) -> &mut ProgressScopes {
        &mut self.scopes
    }
}

/// 作用域树指示器
pub struct OccProgressIndicator<'a> {
    progress: Option<&'a dyn TaskProgress>,
    last_step: Option<String>,
    last_pct: Option<i32>,
}

impl<'a> OccProgressIndicator<'a> {
    pub fn new(progress: Option<&'a dyn TaskProgress>) -> Self {
        Self {
            progress,
            last_step: None,
            last_pct: None,
        }
    }
}

impl ScopeIndicator for OccProgressIndicator<'_> {
    fn show(&mut self, scope: &ProgressScope, _force: bool) {
        let Some(progress) = self.progress else {
            return;
        };
        if let Some(name) = scope.name() {
            if self.last_step.as_deref() != Some(name) {
                progress.set_step(name);
                self.last_step = Some(name.to_string());
            }
        }

        let pct = (scope.portion() * 100.0) as i32;
        if self.last_pct != Some(pct) {
            progress.set_value(pct);
            self.last_pct = Some(pct);
        }
    }

    fn user_break(&mut self) -> bool {
        self.progress.is_some_and(|p| p.is_abort_requested())
    }
}

/// 进度每次至少前进的百分点
#[cfg(feature = "meshio")]
const PROGRESS_THROTTLE: i32 = 5;

/// 以进度句柄为 cookie 构建流式网格库的任务接口
#[cfg(feature = "meshio")]
pub fn task_iface<'a>(
    progress: Option<&'a dyn TaskProgress>,
) -> partview_meshio::TaskIface<'a, dyn TaskProgress + 'a> {
    partview_meshio::TaskIface {
        cookie: progress,
        func_is_stop_requested: Some(is_stop_requested),
        func_handle_progress: Some(handle_progress),
    }
}

#[cfg(feature = "meshio")]
fn is_stop_requested<'a>(progress: &(dyn TaskProgress + 'a)) -> bool {
    progress.is_abort_requested()
}

#[cfg(feature = "meshio")]
fn handle_progress<'a>(progress: &(dyn TaskProgress + 'a), value: u64, max_value: u64) {
    if max_value == 0 {
        return;
    }
    let pct = (value as f64 / max_value as f64 * 100.0).round() as i32;
    if pct >= progress.value() + PROGRESS_THROTTLE {
        progress.set_value(pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Progress;
    use partview_core::message::ProgressRange;
    use std::sync::Mutex;

    /// 记录每次调用的进度句柄
    #[derive(Default)]
    struct Recorder {
        steps: Mutex<Vec<String>>,
        values: Mutex<Vec<i32>>,
        abort: bool,
    }

    impl TaskProgress for Recorder {
        fn set_step(&self, step: &str) {
            self.steps.lock().expect("lock").push(step.to_string());
        }

        fn set_value(&self, percent: i32) {
            self.values.lock().expect("lock").push(percent);
        }

        fn value(&self) -> i32 {
            self.values.lock().expect("lock").last().copied().unwrap_or(0)
        }

        fn is_abort_requested(&self) -> bool {
            self.abort
        }
    }

    #[test]
    fn test_polling_weighted_phases() {
        let progress = Progress::new();
        let mut indicator = OccProgress::new(Some(&progress));
        indicator.new_scope(30.0, "Loading file");
        assert_eq!(progress.step(), "Loading file");
        indicator.end_scope();
        assert_eq!(progress.value(), 30);

        indicator.new_scope(70.0, "Translating file");
        assert!(indicator.report(0.5));
        assert_eq!(progress.step(), "Translating file");
        assert!((64..=65).contains(&progress.value()));
        indicator.end_scope();
        assert_eq!(progress.value(), 100);
    }

    #[test]
    fn test_polling_user_break() {
        let progress = Progress::new();
        let mut indicator = OccProgress::new(Some(&progress));
        assert!(!indicator.user_break());
        progress.request_abort();
        assert!(indicator.user_break());
        assert!(!indicator.report(0.1));
    }

    #[test]
    fn test_polling_without_progress() {
        let mut indicator = OccProgress::new(None);
        indicator.new_scope(30.0, "Loading file");
        assert!(indicator.show(true));
        assert!(!indicator.user_break());
        indicator.end_scope();
    }

    #[test]
    fn test_scope_tree_forwards_changes_only() {
        let recorder = Recorder::default();
        let mut indicator = OccProgressIndicator::new(Some(&recorder));
        {
            let mut sentry = ProgressRange::new(&mut indicator).sentry("Reading BREP", 1000.0);
            for _ in 0..1000 {
                sentry.next();
            }
        }
        let values = recorder.values.lock().expect("lock").clone();
        assert_eq!(values.len(), 101);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*recorder.steps.lock().expect("lock"), vec!["Reading BREP".to_string()]);
    }

    #[test]
    fn test_scope_tree_user_break() {
        let recorder = Recorder {
            abort: true,
            ..Default::default()
        };
        let mut indicator = OccProgressIndicator::new(Some(&recorder));
        let mut sentry = ProgressRange::new(&mut indicator).sentry("Writing BREP", 3.0);
        assert!(!sentry.more());

        let mut silent = OccProgressIndicator::new(None);
        let mut sentry = ProgressRange::new(&mut silent).sentry("Writing BREP", 3.0);
        assert!(sentry.more());
        sentry.next();
    }

    #[cfg(feature = "meshio")]
    #[test]
    fn test_task_iface_throttles() {
        let recorder = Recorder::default();
        let task = task_iface(Some(&recorder));
        for value in 0..=1000u64 {
            task.handle_progress(value, 1000);
        }
        let values = recorder.values.lock().expect("lock").clone();
        assert_eq!(values.first(), Some(&5));
        assert_eq!(values.last(), Some(&100));
        assert!(values.windows(2).all(|w| w[1] - w[0] >= 5));

        task.handle_progress(1, 0);
        assert_eq!(recorder.values.lock().expect("lock").len(), values.len());
    }

    #[cfg(feature = "meshio")]
    #[test]
    fn test_task_iface_stop() {
        let progress = Progress::new();
        let task = task_iface(Some(&progress));
        assert!(!task.is_stop_requested());
        progress.request_abort();
        assert!(task.is_stop_requested());

        let empty = task_iface(None);
        assert!(!empty.is_stop_requested());
        empty.handle_progress(10, 10);
    }
}
