//! 调度主线程 (Dispatch Loop)
//! 职责: 唯一的队列消费者 → 显示 / 执行器, 并负责采集线程的停止与回收

use super::worker::{LaneHandle, LaneReport};
use crate::actuator::{Actuator, ActuatorGuard};
use crate::renderer::Display;
use crate::xbus::{Consumer, Event, Lane, Received, StopFlag, Surface};
use anyhow::{Context, Result};
use std::time::Duration;

/// 退出信号 (每次循环轮询一次)
pub trait QuitSignal {
    fn requested(&mut self) -> bool;
}

/// 从不请求退出
pub struct NeverQuit;

impl QuitSignal for NeverQuit {
    fn requested(&mut self) -> bool {
        false
    }
}

/// Ctrl+C 退出信号
pub struct InterruptQuit {
    flag: StopFlag,
}

impl InterruptQuit {
    pub fn new(flag: StopFlag) -> Self {
        Self { flag }
    }

    /// 安装 Ctrl+C 处理函数 (每个进程只能安装一次)
    pub fn install() -> Result<Self> {
        let flag = StopFlag::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            if handler_flag.raise() {
                log::warn!("🛑 收到中断信号, 正在停止...");
            }
        })
        .context("无法安装 Ctrl+C 处理函数")?;
        Ok(Self { flag })
    }

    pub fn flag(&self) -> StopFlag {
        self.flag.clone()
    }
}

impl QuitSignal for InterruptQuit {
    fn requested(&mut self) -> bool {
        self.flag.is_raised()
    }
}

/// 调度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Running,
    Draining,
    Stopped,
}

/// 停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 任意一条lane结束即开始全局停止
    LaneFinished(Lane),
    UserQuit,
    /// 所有发送端都已释放
    ChannelClosed,
}

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub reason: Option<ShutdownReason>,
    pub frames_shown: u64,
    pub regions_shown: u64,
    pub commands_sent: u64,
    pub command_errors: u64,
    /// 停止后丢弃的事件数
    pub discarded: u64,
    pub lanes: Vec<LaneReport>,
    /// 异常退出的lane
    pub failed_lanes: Vec<Lane>,
}

pub struct Dispatcher<D: Display, A: Actuator, Q: QuitSignal> {
    consumer: Consumer,
    stop: StopFlag,
    display: D,
    actuator: ActuatorGuard<A>,
    quit: Q,
    workers: Vec<LaneHandle>,
    state: DispatchState,
    summary: DispatchSummary,
}

impl<D: Display, A: Actuator, Q: QuitSignal> Dispatcher<D, A, Q> {
    pub fn new(consumer: Consumer, stop: StopFlag, display: D, actuator: A, quit: Q) -> Self {
        Self {
            consumer,
            stop,
            display,
            actuator: ActuatorGuard::new(actuator),
            quit,
            workers: Vec::new(),
            state: DispatchState::Running,
            summary: DispatchSummary::default(),
        }
    }

    /// 登记采集线程, 停止时统一回收
    pub fn attach(&mut self, worker: LaneHandle) {
        self.workers.push(worker);
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn summary(&self) -> &DispatchSummary {
        &self.summary
    }

    /// 队列中等待分发的事件数
    pub fn pending(&self) -> usize {
        self.consumer.pending()
    }

    /// 执行一次循环
    ///
    /// Running: 轮询退出信号, 最多等待 timeout 读取一个事件并分发
    /// Draining: 回收采集线程, 释放显示和执行器 → Stopped
    pub fn step(&mut self, timeout: Duration) -> Result<DispatchState> {
        match self.state {
            DispatchState::Running => {
                if self.quit.requested() {
                    self.begin_shutdown(ShutdownReason::UserQuit);
                    return Ok(self.state);
                }
                match self.consumer.consume(timeout) {
                    Received::Event(event) => self.route(event),
                    Received::Empty => {}
                    Received::Closed => self.begin_shutdown(ShutdownReason::ChannelClosed),
                }
            }
            DispatchState::Draining => self.finish()?,
            DispatchState::Stopped => {}
        }
        Ok(self.state)
    }

    /// 循环直到 Stopped
    pub fn run(mut self, poll: Duration) -> Result<DispatchSummary> {
        log::info!("✅ 调度循环启动, 按 q 或 Ctrl+C 退出");
        while self.step(poll)? != DispatchState::Stopped {}
        Ok(self.into_summary())
    }

    pub fn into_summary(mut self) -> DispatchSummary {
        std::mem::take(&mut self.summary)
    }

    /// 界面刷新 (窗口实现每帧调用一次)
    pub fn present(&mut self) {
        self.display.present();
    }

    fn route(&mut self, event: Event) {
        match event {
            Event::FrameReady { lane, frame } => {
                self.display.show(Surface::live(lane), &frame.image);
                self.summary.frames_shown += 1;
            }
            Event::DetectionReady { lane, region } => {
                self.display.show(Surface::detected(lane), &region.image);
                self.summary.regions_shown += 1;
            }
            Event::ActuatorCommand { channel } => match self.actuator.activate(channel) {
                Ok(_) => self.summary.commands_sent += 1,
                Err(e) => {
                    log::error!("❌ 推动执行器 {} 失败: {:#}", channel, e);
                    self.summary.command_errors += 1;
                }
            },
            Event::LaneFinished { lane } => {
                self.begin_shutdown(ShutdownReason::LaneFinished(lane));
            }
        }
    }

    fn begin_shutdown(&mut self, reason: ShutdownReason) {
        if self.state != DispatchState::Running {
            return;
        }
        log::info!("🛑 开始停止: {:?}", reason);
        self.summary.reason = Some(reason);
        self.state = DispatchState::Draining;
        self.stop.raise();
    }

    fn finish(&mut self) -> Result<()> {
        // 停止标志已置位, 每个采集线程最多再跑一轮
        for worker in self.workers.drain(..) {
            let lane = worker.lane();
            match worker.join() {
                Ok(report) => self.summary.lanes.push(report),
                Err(e) => {
                    log::error!("❌ {:#}", e);
                    self.summary.failed_lanes.push(lane);
                }
            }
        }

        let discarded = self.consumer.discard_pending();
        if discarded > 0 {
            log::debug!("丢弃停止后的 {} 个事件", discarded);
        }
        self.summary.discarded += discarded as u64;

        self.display.close();
        self.state = DispatchState::Stopped;
        self.actuator.close()?;

        log::info!(
            "🏁 调度结束: 显示{}帧 | {}个检测区域 | 推动{}次",
            self.summary.frames_shown,
            self.summary.regions_shown,
            self.summary.commands_sent
        );
        Ok(())
    }
}
