//! 任务接口
//!
//! 编解码过程通过两个函数指针与调用方交流：查询是否请求停止、报告进度。
//! 调用方数据以 `cookie` 引用传入，函数指针和 `cookie` 都可以为空。

/// 任务接口结构
pub struct TaskIface<'a, C: ?Sized> {
    pub cookie: Option<&'a C>,
    pub func_is_stop_requested: Option<fn(&C) -> bool>,
    pub func_handle_progress: Option<fn(&C, u64, u64)>,
}

impl<C: ?Sized> Clone for TaskIface<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized> Copy for TaskIface<'_, C> {}

impl<C: ?Sized> Default for TaskIface<'_, C> {
    fn default() -> Self {
        Self {
            cookie: None,
            func_is_stop_requested: None,
            func_handle_progress: None,
        }
    }
}

impl<C: ?Sized> std::fmt::Debug for TaskIface<'_, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskIface")
            .field("cookie", &self.cookie.is_some())
            .field("func_is_stop_requested", &self.func_is_stop_requested.is_some())
            .field("func_handle_progress", &self.func_handle_progress.is_some())
            .finish()
    }
}

impl<C: ?Sized> TaskIface<'_, C> {
    pub fn is_stop_requested(&self) -> bool {
        match (self.cookie, self.func_is_stop_requested) {
            (Some(cookie), Some(func)) => func(cookie),
            _ => false,
        }
    }

    pub fn handle_progress(&self, value: u64, max_value: u64) {
        if let (Some(cookie), Some(func)) = (self.cookie, self.func_handle_progress) {
            func(cookie, value, max_value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        calls: Cell<u32>,
        last: Cell<(u64, u64)>,
    }

    #[test]
    fn test_empty_iface() {
        let task: TaskIface<'_, Counter> = TaskIface::default();
        assert!(!task.is_stop_requested());
        task.handle_progress(1, 2);
    }

    #[test]
    fn test_callbacks() {
        let counter = Counter {
            calls: Cell::new(0),
            last: Cell::new((0, 0)),
        };
        let task = TaskIface {
            cookie: Some(&counter),
            func_is_stop_requested: Some(|c: &Counter| c.calls.get() >= 2),
            func_handle_progress: Some(|c: &Counter, v, m| {
                c.calls.set(c.calls.get() + 1);
                c.last.set((v, m));
            }),
        };
        assert!(!task.is_stop_requested());
        task.handle_progress(1, 10);
        task.handle_progress(5, 10);
        assert_eq!(counter.last.get(), (5, 10));
        assert!(task.is_stop_requested());
    }
}
