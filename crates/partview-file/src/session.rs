//! 转换会话
//!
//! IGES/STEP/BREP 读写器共享内核的全局静态变量，不能并发使用。
//! [`TransferSession`] 持有这些变量和保护它们的互斥锁，整个读写调用期间加锁；
//! [`StaticVariablesRollback`] 在作用域结束时把本次调用改动的变量恢复原值。

use partview_core::statics::{InterfaceStatic, StaticValue};
use std::sync::{Arc, Mutex, MutexGuard};

/// 进程内共享的转换会话，克隆得到的是同一个会话
#[derive(Debug, Clone, Default)]
pub struct TransferSession {
    statics: Arc<Mutex<InterfaceStatic>>,
}

impl TransferSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 独占会话直到返回的守卫被释放
    pub fn lock(&self) -> SessionGuard<'_> {
        // 回滚守卫在展开时已恢复变量，中毒的锁可以继续使用
        let guard = self
            .statics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        SessionGuard { guard }
    }
}

/// 已加锁的会话
pub struct SessionGuard<'s> {
    guard: MutexGuard<'s, InterfaceStatic>,
}

impl SessionGuard<'_> {
    pub fn statics(&self) -> &InterfaceStatic {
        &self.guard
    }

    pub fn statics_mut(&mut self) -> &mut InterfaceStatic {
        &mut self.guard
    }

    /// 开始一组可回滚的改动
    pub fn rollback(&mut self) -> StaticVariablesRollback<'_> {
        StaticVariablesRollback::new(&mut self.guard)
    }
}

/// 记录被改动变量的原值，释放时逆序恢复
pub struct StaticVariablesRollback<'g> {
    statics: &'g mut InterfaceStatic,
    saved: Vec<(String, Option<StaticValue>)>,
}

impl<'g> StaticVariablesRollback<'g> {
    pub fn new(statics: &'g mut InterfaceStatic) -> Self {
        Self {
            statics,
            saved: Vec::new(),
        }
    }

    /// 修改变量，原值在回滚时恢复
    pub fn change(&mut self, key: &str, value: impl Into<StaticValue>) {
        let previous = self.statics.set(key, value);
        self.saved.push((key.to_string(), previous));
    }

    /// 改动后的变量表
    pub fn statics(&self) -> &InterfaceStatic {
        self.statics
    }
}

impl Drop for StaticVariablesRollback<'_> {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            match previous {
                Some(value) => {
                    self.statics.set(&key, value);
                }
                None => {
                    self.statics.remove(&key);
                }
            }
        }
    }
}
