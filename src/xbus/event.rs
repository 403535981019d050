/// 事件定义 (采集线程 → 调度主线程)
use crate::types::{Frame, Region};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 相机通道编号 (1 = Cam1, 2 = Cam2)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lane(pub u8);

impl Lane {
    pub fn title(&self) -> String {
        format!("Cam{}", self.0)
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cam{}", self.0)
    }
}

/// 显示画面类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Live,
    Detected,
}

/// 带通道标签的显示画面, 例如 "Cam1 live"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Surface {
    pub lane: Lane,
    pub kind: SurfaceKind,
}

impl Surface {
    pub fn live(lane: Lane) -> Self {
        Self {
            lane,
            kind: SurfaceKind::Live,
        }
    }

    pub fn detected(lane: Lane) -> Self {
        Self {
            lane,
            kind: SurfaceKind::Detected,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SurfaceKind::Live => write!(f, "{} live", self.lane),
            SurfaceKind::Detected => write!(f, "{} detected", self.lane),
        }
    }
}

/// 队列事件
///
/// 不带全局序号: 只保证同一生产者内部的先后顺序
#[derive(Clone, Debug)]
pub enum Event {
    /// 原始帧 (实时画面)
    FrameReady { lane: Lane, frame: Frame },
    /// 检测到的区域 (裁剪画面)
    DetectionReady { lane: Lane, region: Region },
    /// 推动执行器通道
    ActuatorCommand { channel: u8 },
    /// 采集线程结束
    LaneFinished { lane: Lane },
}

impl Event {
    /// 事件来源lane (执行器命令不带lane)
    pub fn lane(&self) -> Option<Lane> {
        match self {
            Event::FrameReady { lane, .. }
            | Event::DetectionReady { lane, .. }
            | Event::LaneFinished { lane } => Some(*lane),
            Event::ActuatorCommand { .. } => None,
        }
    }
}
