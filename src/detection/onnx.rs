// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX 二分类器 (需要 onnx 功能)
//! 区域 → Resize(线性) → NCHW f32 → 推理 → 第一个输出概率

use super::{Classification, Classifier};
use crate::types::Region;
use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

pub struct OnnxClassifier {
    session: Session,
    input_size: u32,
}

impl OnnxClassifier {
    pub fn new(model_path: &str, input_size: u32) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)
            .with_context(|| format!("加载分类模型失败: {}", model_path))?;
        log::info!("✅ 分类模型加载成功: {} ({}x{})", model_path, input_size, input_size);
        Ok(Self {
            session,
            input_size,
        })
    }

    /// 预处理: 保留0..255取值, 只做尺寸和布局转换 (NHWC u8 → NCHW f32)
    fn preprocess(&self, region: &Region) -> Array4<f32> {
        let size = self.input_size;
        let resized = imageops::resize(&region.image, size, size, FilterType::Triangle);
        let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, rgb) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input[[0, 0, y, x]] = rgb.0[0] as f32;
            input[[0, 1, y, x]] = rgb.0[1] as f32;
            input[[0, 2, y, x]] = rgb.0[2] as f32;
        }
        input
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, region: &Region) -> Result<Classification> {
        let input = Tensor::from_array(self.preprocess(region))?;
        let outputs = self.session.run(ort::inputs![input])?;
        let (_, probs) = outputs[0].try_extract_tensor::<f32>()?;
        let score = *probs.first().ok_or_else(|| anyhow!("分类模型输出为空"))?;
        Ok(Classification::score(score))
    }
}
