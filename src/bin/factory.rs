/// 智能工厂演示 (Smart Factory Demo)
///
/// 系统架构:
/// 1. 采集线程 x2: 视频帧 → 运动检测 → 分类 → 事件 (Cam1 / Cam2)
/// 2. 主线程:      调度循环, 事件 → 显示 / 执行器
///
/// 任意一条lane视频结束、按q、关闭窗口或Ctrl+C 都会让整个系统停止
use anyhow::Result;
use clap::Parser;
use macroquad::prelude::next_frame;
use smart_factory::pipeline::{
    CaptureWorker, DispatchState, DispatchSummary, Dispatcher, InterruptQuit, LaneHandle,
};
use smart_factory::renderer::HeadlessDisplay;
use smart_factory::renderer_macroquad::{window_conf, KeyQuit, MacroquadDisplay};
use smart_factory::xbus::{event_channel, Publisher, StopFlag};
use smart_factory::{Args, FactoryConfig, FactoryController};
use std::time::{Duration, Instant};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 窗口模式下每帧用于分发事件的时间上限
const FRAME_BUDGET: Duration = Duration::from_millis(12);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("🚀 智能工厂系统启动");
    let mut config = FactoryConfig::load(&args.config);
    config.apply_args(&args);
    config.validate()?;
    config.print_summary();

    // 先连接执行器, 失败时还没有启动任何线程
    let actuator = FactoryController::open(args.device.as_deref())?;
    let interrupt = InterruptQuit::install()?;

    let (publisher, consumer) = event_channel();
    let stop = StopFlag::new();
    let lanes = start_lanes(&config, publisher, &stop)?;

    if args.headless {
        let mut dispatcher = Dispatcher::new(
            consumer,
            stop,
            HeadlessDisplay::new(args.dump_dir.clone()),
            actuator,
            interrupt,
        );
        for lane in lanes {
            dispatcher.attach(lane);
        }
        let summary = dispatcher.run(args.poll_timeout())?;
        print_summary(&summary);
        return Ok(());
    }

    let interrupt = interrupt.flag();
    macroquad::Window::from_config(window_conf(), async move {
        let mut dispatcher = Dispatcher::new(
            consumer,
            stop,
            MacroquadDisplay::new(),
            actuator,
            KeyQuit::new(interrupt),
        );
        for lane in lanes {
            dispatcher.attach(lane);
        }
        log::info!("✅ 窗口已打开, 按 q 或关闭窗口退出");

        loop {
            // 每帧处理积压的事件, 超出时间上限留到下一帧
            let start = Instant::now();
            let state = loop {
                match dispatcher.step(Duration::ZERO) {
                    Ok(DispatchState::Running)
                        if dispatcher.pending() > 0 && start.elapsed() < FRAME_BUDGET => {}
                    Ok(state) => break state,
                    Err(e) => {
                        log::error!("❌ 调度循环出错: {:#}", e);
                        break DispatchState::Stopped;
                    }
                }
            };
            if state == DispatchState::Stopped {
                break;
            }
            dispatcher.present();
            next_frame().await;
        }
        print_summary(&dispatcher.into_summary());
    });
    Ok(())
}

/// 为每条lane创建并启动采集线程
///
/// 任意一条启动失败时停止已启动的线程
fn start_lanes(
    config: &FactoryConfig,
    publisher: Publisher,
    stop: &StopFlag,
) -> Result<Vec<LaneHandle>> {
    let mut handles = Vec::new();
    let result = config.lanes.iter().try_for_each(|lane| {
        let worker = CaptureWorker::from_config(lane)?;
        handles.push(worker.spawn(publisher.clone(), stop.clone())?);
        Ok::<(), anyhow::Error>(())
    });
    if let Err(e) = result {
        stop.raise();
        for handle in handles {
            let _ = handle.join();
        }
        return Err(e);
    }
    Ok(handles)
}

fn print_summary(summary: &DispatchSummary) {
    log::info!("📋 停止原因: {:?}", summary.reason);
    for report in &summary.lanes {
        log::info!(
            "  {}: {}帧 | {}次检测 | {}次推动 | {:?}",
            report.lane,
            report.frames,
            report.detections,
            report.commands,
            report.reason
        );
    }
    for lane in &summary.failed_lanes {
        log::error!("  {}: 采集线程异常退出", lane);
    }
    if summary.command_errors > 0 {
        log::warn!("⚠️  执行器出错 {} 次", summary.command_errors);
    }
    log::info!(
        "🏁 共显示 {} 帧 | {} 个检测区域 | 推动 {} 次 | 丢弃 {} 个事件",
        summary.frames_shown,
        summary.regions_shown,
        summary.commands_sent,
        summary.discarded
    );
}
