//! 进度报告接口
//!
//! 内核提供两种进度接口：
//! - 轮询式 [`ProgressIndicator`]：读写器周期性调用 `show()`，实现者从作用域栈读取
//!   当前作用域名称和 `[0, 1]` 内的位置；`user_break()` 回答是否中断
//! - 作用域树 [`ProgressRange`] / [`ProgressSentry`]：每个作用域携带名称和已完成比例，
//!   变化时推送给 [`ScopeIndicator`]

/// 轮询式指示器的一层作用域
#[derive(Debug, Clone)]
struct ScopeFrame {
    name: Option<String>,
    /// 作用域起点（整体比例）
    start: f64,
    /// 作用域长度（整体比例）
    length: f64,
    /// 作用域内已完成比例
    local: f64,
}

/// 作用域栈，栈底是覆盖整个 `[0, 1]` 的根作用域
#[derive(Debug, Clone)]
pub struct ProgressScopes {
    frames: Vec<ScopeFrame>,
}

impl Default for ProgressScopes {
    fn default() -> Self {
        Self {
            frames: vec![ScopeFrame {
                name: None,
                start: 0.0,
                length: 1.0,
                local: 0.0,
            }],
        }
    }
}

impl ProgressScopes {
    fn top(&self) -> &ScopeFrame {
        // 根作用域永不出栈
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// 打开子作用域，占父作用域 `span` 百分比
    pub fn push(&mut self, span: f64, name: &str) {
        let parent = self.top();
        let fraction = (span / 100.0).clamp(0.0, 1.0 - parent.local);
        let frame = ScopeFrame {
            name: Some(name.to_string()),
            start: parent.start + parent.local * parent.length,
            length: parent.length * fraction,
            local: 0.0,
        };
        self.frames.push(frame);
    }

    /// 关闭当前作用域，父作用域前进其全部长度
    pub fn pop(&mut self) {
        if self.frames.len() <= 1 {
            return;
        }
        if let Some(child) = self.frames.pop() {
            let parent = self.top_mut();
            if parent.length > 0.0 {
                parent.local = (parent.local + child.length / parent.length).min(1.0);
            }
        }
    }

    /// 设置当前作用域内的完成比例
    pub fn set_value(&mut self, fraction: f64) {
        self.top_mut().local = fraction.clamp(0.0, 1.0);
    }

    /// 整体位置 `[0, 1]`
    pub fn position(&self) -> f64 {
        let top = self.top();
        (top.start + top.local * top.length).clamp(0.0, 1.0)
    }

    /// 最内层有名称的作用域
    pub fn current_name(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.name.as_deref())
    }

    /// 作用域深度（不含根）
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }
}

/// 轮询式进度指示器
pub trait ProgressIndicator {
    /// 刷新显示，返回 `false` 表示应停止
    fn show(&mut self, force: bool) -> bool;

    /// 是否请求中断
    fn user_break(&mut self) -> bool;

    fn scopes(&self) -> &ProgressScopes;

    fn scopes_mut(&mut self) -> &mut ProgressScopes;

    fn new_scope(&mut self, span: f64, name: &str) {
        self.scopes_mut().push(span, name);
        self.show(true);
    }

    fn end_scope(&mut self) {
        self.scopes_mut().pop();
        self.show(true);
    }

    fn position(&self) -> f64 {
        self.scopes().position()
    }

    /// 更新当前作用域进度并刷新，返回是否继续
    fn report(&mut self, fraction: f64) -> bool {
        self.scopes_mut().set_value(fraction);
        self.show(false) && !self.user_break()
    }
}

/// 不显示任何进度的指示器
#[derive(Debug, Default)]
pub struct NullProgressIndicator {
    scopes: ProgressScopes,
}

impl ProgressIndicator for NullProgressIndicator {
    fn show(&mut self, _force: bool) -> bool {
        true
    }

    fn user_break(&mut self) -> bool {
        false
    }

    fn scopes(&self) -> &ProgressScopes {
        &self.scopes
    }

    fn scopes_mut(&mut self) -> &mut ProgressScopes {
        &mut self.scopes
    }
}

/// 作用域树中的一个作用域
#[derive(Debug, Clone)]
pub struct ProgressScope {
    name: Option<String>,
    start: f64,
    span: f64,
    max: f64,
    value: f64,
}

impl ProgressScope {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 整体完成比例 `[0, 1]`
    pub fn portion(&self) -> f64 {
        let local = if self.max > 0.0 {
            (self.value / self.max).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (self.start + self.span * local).clamp(0.0, 1.0)
    }
}

/// 作用域树进度的接收者
pub trait ScopeIndicator {
    fn show(&mut self, scope: &ProgressScope, force: bool);

    fn user_break(&mut self) -> bool;
}

/// 一段待分配的进度区间
pub struct ProgressRange<'a> {
    indicator: Option<&'a mut dyn ScopeIndicator>,
    name: Option<String>,
    start: f64,
    span: f64,
}

impl<'a> ProgressRange<'a> {
    /// 覆盖整个 `[0, 1]` 的区间
    pub fn new(indicator: &'a mut dyn ScopeIndicator) -> Self {
        Self {
            indicator: Some(indicator),
            name: None,
            start: 0.0,
            span: 1.0,
        }
    }

    /// 不报告进度
    pub fn none() -> Self {
        Self {
            indicator: None,
            name: None,
            start: 0.0,
            span: 1.0,
        }
    }

    /// 在该区间上打开作用域，分 `max` 步完成
    pub fn sentry(self, name: &str, max: f64) -> ProgressSentry<'a> {
        let mut sentry = ProgressSentry {
            indicator: self.indicator,
            scope: ProgressScope {
                name: if name.is_empty() {
                    self.name
                } else {
                    Some(name.to_string())
                },
                start: self.start,
                span: self.span,
                max,
                value: 0.0,
            },
        };
        sentry.show(true);
        sentry
    }
}

/// 打开的作用域
pub struct ProgressSentry<'a> {
    indicator: Option<&'a mut dyn ScopeIndicator>,
    scope: ProgressScope,
}

impl<'a> ProgressSentry<'a> {
    fn show(&mut self, force: bool) {
        if let Some(indicator) = self.indicator.as_deref_mut() {
            indicator.show(&self.scope, force);
        }
    }

    /// 是否继续
    pub fn more(&mut self) -> bool {
        match self.indicator.as_deref_mut() {
            Some(indicator) => !indicator.user_break(),
            None => true,
        }
    }

    /// 前进一步
    pub fn next(&mut self) {
        self.next_by(1.0);
    }

    /// 前进若干步
    pub fn next_by(&mut self, steps: f64) {
        self.scope.value = (self.scope.value + steps).min(self.scope.max);
        self.show(false);
    }

    /// 把接下来 `steps` 步交给子区间
    pub fn sub_range(&mut self, steps: f64) -> ProgressRange<'_> {
        let start = self.scope.portion();
        let span = if self.scope.max > 0.0 {
            self.scope.span * steps / self.scope.max
        } else {
            0.0
        };
        self.scope.value = (self.scope.value + steps).min(self.scope.max);
        let indicator = match self.indicator.as_mut() {
            Some(indicator) => Some(&mut **indicator as &mut dyn ScopeIndicator),
            None => None,
        };
        ProgressRange {
            indicator,
            name: self.scope.name.clone(),
            start,
            span,
        }
    }

    pub fn scope(&self) -> &ProgressScope {
        &self.scope
    }
}
