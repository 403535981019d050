/// 检测系统 (Detection System)
///
/// 采集线程内同步调用, 检测算法本身被视为外部组件:
/// - Detector:   帧 → 检测区域 (motion: 帧差法)
/// - Classifier: 区域 → 分数 (color: 颜色占比, onnx: 二分类模型)
pub mod color;
pub mod motion;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::config::ClassifierConfig;
use crate::types::{Frame, Region};
use anyhow::Result;

pub use color::{ColorClassifier, ColorRange};
pub use motion::{MotionConfig, MotionDetector};

/// 检测器接口: 没有检测到目标时返回 None
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Region>>;
}

/// 分类结果
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub score: f32,
    /// 分类器给出的类别名 (颜色名等), 二分类模型为 None
    pub label: Option<String>,
}

impl Classification {
    pub fn score(score: f32) -> Self {
        Self { score, label: None }
    }

    pub fn labeled(label: impl Into<String>, score: f32) -> Self {
        Self {
            score,
            label: Some(label.into()),
        }
    }
}

/// 分类器接口
pub trait Classifier: Send {
    fn classify(&mut self, region: &Region) -> Result<Classification>;
}

/// 根据配置创建分类器
pub fn build_classifier(config: &ClassifierConfig) -> Result<Box<dyn Classifier>> {
    match config {
        ClassifierConfig::Color { target, colors } => Ok(Box::new(ColorClassifier::new(
            target.clone(),
            colors.clone(),
        ))),
        #[cfg(feature = "onnx")]
        ClassifierConfig::Onnx { model, input_size } => Ok(Box::new(
            onnx::OnnxClassifier::new(model, *input_size)?,
        )),
        #[cfg(not(feature = "onnx"))]
        ClassifierConfig::Onnx { model, .. } => anyhow::bail!(
            "分类模型 {} 需要 onnx 功能: cargo run --features onnx",
            model
        ),
    }
}
