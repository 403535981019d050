//! 测试用的可编排组件: 帧源 / 检测器 / 分类器 / 显示 / 执行器

use crate::actuator::Actuator;
use crate::detection::{Classification, Classifier, Detector};
use crate::input::FrameSource;
use crate::renderer::Display;
use crate::types::{BBox, Frame, Region};
use crate::xbus::Surface;
use anyhow::{bail, Result};
use image::RgbImage;
use std::sync::{Arc, Mutex};

fn blank_frame(index: u64) -> Frame {
    Frame::new(index, RgbImage::new(8, 8))
}

/// 产出固定帧数, 之后视频结束 (或报错)
pub struct ScriptedSource {
    remaining: usize,
    index: u64,
    fail_at_end: bool,
}

impl ScriptedSource {
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            index: 0,
            fail_at_end: false,
        }
    }

    pub fn failing_after(frames: usize) -> Self {
        Self {
            fail_at_end: true,
            ..Self::new(frames)
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            if self.fail_at_end {
                bail!("device lost");
            }
            return Ok(None);
        }
        self.remaining -= 1;
        let frame = blank_frame(self.index);
        self.index += 1;
        Ok(Some(frame))
    }
}

/// 无限帧源
#[derive(Default)]
pub struct EndlessSource {
    index: u64,
}

impl FrameSource for EndlessSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = blank_frame(self.index);
        self.index += 1;
        Ok(Some(frame))
    }
}

enum DetectScript {
    Calls(Vec<bool>, usize),
    Always,
    Fail,
}

/// 按调用次序决定是否检测到区域
pub struct ScriptedDetector {
    script: DetectScript,
}

impl ScriptedDetector {
    pub fn new(script: Vec<bool>) -> Self {
        Self {
            script: DetectScript::Calls(script, 0),
        }
    }

    pub fn always() -> Self {
        Self {
            script: DetectScript::Always,
        }
    }

    pub fn failing() -> Self {
        Self {
            script: DetectScript::Fail,
        }
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Region>> {
        let hit = match &mut self.script {
            DetectScript::Calls(script, call) => {
                let hit = script.get(*call).copied().unwrap_or(false);
                *call += 1;
                hit
            }
            DetectScript::Always => true,
            DetectScript::Fail => bail!("detector crashed"),
        };
        Ok(if hit {
            Region::crop(frame, BBox::new(0, 0, 4, 4))
        } else {
            None
        })
    }
}

/// 固定分数分类器
pub struct FixedClassifier {
    score: f32,
}

impl FixedClassifier {
    pub fn new(score: f32) -> Self {
        Self { score }
    }
}

impl Classifier for FixedClassifier {
    fn classify(&mut self, _region: &Region) -> Result<Classification> {
        Ok(Classification::score(self.score))
    }
}

#[derive(Debug, Default)]
pub struct DisplayLog {
    pub shown: Vec<String>,
    pub presented: u32,
    pub closed: u32,
}

/// 记录所有调用的显示
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    pub log: Arc<Mutex<DisplayLog>>,
}

impl Display for RecordingDisplay {
    fn show(&mut self, surface: Surface, _image: &RgbImage) {
        self.log.lock().unwrap().shown.push(surface.to_string());
    }

    fn present(&mut self) {
        self.log.lock().unwrap().presented += 1;
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed += 1;
    }
}

#[derive(Debug, Default)]
pub struct ActuatorLog {
    pub activated: Vec<u8>,
    pub closed: u32,
}

/// 记录所有调用的执行器, fail_channel 上的推动返回错误
#[derive(Clone, Default)]
pub struct RecordingActuator {
    pub log: Arc<Mutex<ActuatorLog>>,
    pub fail_channel: Option<u8>,
}

impl Actuator for RecordingActuator {
    fn activate(&mut self, channel: u8) -> Result<()> {
        if self.fail_channel == Some(channel) {
            bail!("port write failed");
        }
        self.log.lock().unwrap().activated.push(channel);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }
}
