/// 事件总线 (Event Bus)
///
/// 两个采集线程 → 一个调度主线程:
/// - event:   事件类型 (封闭的枚举, 消费端穷尽匹配)
/// - channel: 无界FIFO队列 (publish从不阻塞, consume带超时)
/// - stop:    全局停止标志 (协作式取消)
pub mod channel;
pub mod event;
pub mod stop;

pub use channel::{event_channel, Consumer, Publisher, Received};
pub use event::{Event, Lane, Surface, SurfaceKind};
pub use stop::StopFlag;
