/// 流水线 (Pipeline)
///
/// 两个采集线程 + 一个调度主线程, 通过事件总线通信:
/// - worker:     采集线程 (帧源 → 检测 → 分类 → 事件)
/// - dispatcher: 调度主线程 (事件 → 显示 / 执行器, 负责停止和回收)
pub mod dispatcher;
pub mod worker;

pub use dispatcher::{
    DispatchState, DispatchSummary, Dispatcher, InterruptQuit, NeverQuit, QuitSignal,
    ShutdownReason,
};
pub use worker::{CaptureWorker, FinishReason, LaneHandle, LaneReport, LaneState};
