use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 全局停止标志 (协作式取消)
///
/// 初始为 false, 只会被置位一次, 不会复位
#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    raised: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置位停止标志, 只有真正翻转标志的那次调用返回 true
    pub fn raise(&self) -> bool {
        !self.raised.swap(true, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}
