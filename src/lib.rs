// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod actuator; // 执行器控制
pub mod config; // 运行参数与产线配置
pub mod detection; // 运动检测与分类
pub mod input; // 视频输入
pub mod pipeline; // 采集线程与调度主线程
pub mod renderer; // 显示接口与无窗口显示
pub mod renderer_macroquad; // macroquad 窗口显示
pub mod types;
pub mod xbus; // 事件总线

#[cfg(test)]
mod fakes;

pub use crate::actuator::{Actuator, ActuatorGuard, FactoryController};
pub use crate::config::{Args, FactoryConfig, LaneConfig};
pub use crate::pipeline::{CaptureWorker, DispatchState, DispatchSummary, Dispatcher};
pub use crate::types::{BBox, Frame, Region};

/// 本地时间字符串, 用于输出文件名
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
