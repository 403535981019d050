//! 采集线程 (Capture Worker)
//! 职责: 拉取帧 → 运动检测 → 分类 → 发送事件到队列

use crate::config::LaneConfig;
use crate::detection::{self, Classifier, Detector, MotionDetector};
use crate::input::{self, FrameSource};
use crate::xbus::{Event, Lane, Publisher, StopFlag};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// 采集线程生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Running,
    Stopping,
    Finished,
}

impl LaneState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LaneState::Running,
            1 => LaneState::Stopping,
            _ => LaneState::Finished,
        }
    }
}

/// 采集线程写入, 句柄只读
#[derive(Clone, Debug, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn get(&self) -> LaneState {
        LaneState::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, state: LaneState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

/// 结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// 视频读完
    EndOfStream,
    /// 收到停止标志
    Stopped,
    /// 帧源读取出错 (按视频结束处理)
    SourceError,
}

/// 采集线程统计 (join时返回)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneReport {
    pub lane: Lane,
    pub frames: u64,
    pub detections: u64,
    pub commands: u64,
    pub reason: FinishReason,
}

pub struct CaptureWorker {
    lane: Lane,
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    classifier: Box<dyn Classifier>,
    actuator_channel: u8,
    threshold: f32,
    pacing: Duration,
    state: SharedState,
}

impl CaptureWorker {
    /// 默认: 执行器通道 = lane编号, 阈值 0.0, 间隔 30ms
    pub fn new(
        lane: Lane,
        source: Box<dyn FrameSource>,
        detector: Box<dyn Detector>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        Self {
            lane,
            source,
            detector,
            classifier,
            actuator_channel: lane.0,
            threshold: 0.0,
            pacing: Duration::from_millis(30),
            state: SharedState::default(),
        }
    }

    /// 分数严格大于 threshold 时推动 channel
    pub fn with_actuator(mut self, channel: u8, threshold: f32) -> Self {
        self.actuator_channel = channel;
        self.threshold = threshold;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// 按lane配置打开帧源并创建检测器/分类器
    pub fn from_config(config: &LaneConfig) -> Result<Self> {
        let source = input::open_source(&config.source)?;
        let detector = Box::new(MotionDetector::new(config.motion.clone()));
        let classifier = detection::build_classifier(&config.classifier)?;
        Ok(Self::new(config.lane, source, detector, classifier)
            .with_actuator(config.actuator_channel, config.threshold)
            .with_pacing(config.pacing()))
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn state(&self) -> LaneState {
        self.state.get()
    }

    /// 在独立线程中运行
    pub fn spawn(self, publisher: Publisher, stop: StopFlag) -> Result<LaneHandle> {
        let lane = self.lane;
        let state = self.state.clone();
        let handle = std::thread::Builder::new()
            .name(format!("lane:{}", lane))
            .spawn(move || self.run(publisher, stop))?;
        Ok(LaneHandle {
            lane,
            state,
            handle,
        })
    }

    /// 采集循环, 直到视频读完或停止标志置位
    ///
    /// 任何退出路径都只发送一次 LaneFinished
    pub fn run(mut self, publisher: Publisher, stop: StopFlag) -> LaneReport {
        log::info!("🎥 {} 采集线程启动", self.lane);
        let lane = self.lane;
        let mut report = LaneReport {
            lane,
            frames: 0,
            detections: 0,
            commands: 0,
            reason: FinishReason::Stopped,
        };
        let mut count = 0u64;
        let mut last = Instant::now();

        while !stop.is_raised() {
            std::thread::sleep(self.pacing);

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    report.reason = FinishReason::EndOfStream;
                    break;
                }
                Err(e) => {
                    log::error!("❌ {} 读取帧失败: {:#}", lane, e);
                    report.reason = FinishReason::SourceError;
                    break;
                }
            };
            report.frames += 1;
            count += 1;

            // 每帧都发送实时画面
            publisher.publish(Event::FrameReady {
                lane,
                frame: frame.clone(),
            });

            // 每秒打印一次采集统计
            if last.elapsed().as_secs_f64() >= 1.0 {
                let fps = count as f64 / last.elapsed().as_secs_f64();
                log::debug!("📊 {} 采集统计: {:.1}fps", lane, fps);
                last = Instant::now();
                count = 0;
            }

            let region = match self.detector.detect(&frame) {
                Ok(Some(region)) => region,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("⚠️  {} 检测失败, 跳过第{}帧: {:#}", lane, frame.index, e);
                    continue;
                }
            };
            report.detections += 1;

            publisher.publish(Event::DetectionReady {
                lane,
                region: region.clone(),
            });

            let result = match self.classifier.classify(&region) {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("⚠️  {} 分类失败, 跳过第{}帧: {:#}", lane, frame.index, e);
                    continue;
                }
            };

            let triggered = result.score > self.threshold;
            match &result.label {
                Some(label) => log::info!("🔍 {} {}", lane, label),
                None if triggered => log::info!("❌ {} Bad Item ({:.3})", lane, result.score),
                None => log::info!("✅ {} Good Item ({:.3})", lane, result.score),
            }

            if triggered {
                publisher.publish(Event::ActuatorCommand {
                    channel: self.actuator_channel,
                });
                report.commands += 1;
            }
        }

        self.state.set(LaneState::Stopping);
        if report.reason != FinishReason::Stopped && stop.raise() {
            log::info!("🏁 {} 视频结束, 通知所有lane停止", lane);
        }
        publisher.publish(Event::LaneFinished { lane });
        self.state.set(LaneState::Finished);

        log::info!(
            "✅ {} 采集线程退出: {}帧 | {}次检测 | {}次推动 | {:?}",
            lane,
            report.frames,
            report.detections,
            report.commands,
            report.reason
        );
        report
    }
}

/// 采集线程句柄
pub struct LaneHandle {
    lane: Lane,
    state: SharedState,
    handle: JoinHandle<LaneReport>,
}

impl LaneHandle {
    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn state(&self) -> LaneState {
        self.state.get()
    }

    /// 等待线程结束, 线程panic时返回错误
    pub fn join(self) -> Result<LaneReport> {
        let lane = self.lane;
        self.handle
            .join()
            .map_err(|_| anyhow!("{} 采集线程异常退出", lane))
    }
}
