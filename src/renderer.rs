/// 显示模块 (Display)
///
/// 只在调度主线程中调用, 因此不需要加锁
/// - HeadlessDisplay:  无窗口, 打印统计并可保存检测区域
/// - MacroquadDisplay: 窗口显示 (见 renderer_macroquad.rs)
use crate::xbus::{Surface, SurfaceKind};
use image::RgbImage;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

/// 显示接口
pub trait Display {
    /// 更新带通道标签的画面
    fn show(&mut self, surface: Surface, image: &RgbImage);

    /// 输出一帧界面 (窗口实现在这里绘制)
    fn present(&mut self) {}

    /// 释放显示资源
    fn close(&mut self);
}

/// 无窗口显示: 统计每个画面的帧数
pub struct HeadlessDisplay {
    counts: BTreeMap<String, u64>,
    dump_dir: Option<PathBuf>,
    dumped: u64,
    window_count: u64,
    last: Instant,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new(dump_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = &dump_dir {
            match std::fs::create_dir_all(dir) {
                Ok(_) => log::info!("💾 检测区域保存到 {}", dir.display()),
                Err(e) => log::error!("❌ 无法创建目录 {}: {}", dir.display(), e),
            }
        }
        Self {
            counts: BTreeMap::new(),
            dump_dir,
            dumped: 0,
            window_count: 0,
            last: Instant::now(),
            closed: false,
        }
    }

    /// 某个画面累计显示的帧数
    pub fn count(&self, surface: Surface) -> u64 {
        self.counts.get(&surface.to_string()).copied().unwrap_or(0)
    }

    pub fn dumped(&self) -> u64 {
        self.dumped
    }

    fn dump(&mut self, surface: Surface, image: &RgbImage) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        let name = format!(
            "{}_{}_{:06}.png",
            surface.lane.title(),
            crate::gen_time_string("-"),
            self.dumped
        );
        match image.save(dir.join(&name)) {
            Ok(_) => self.dumped += 1,
            Err(e) => log::error!("❌ 保存检测区域失败 {}: {}", name, e),
        }
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, surface: Surface, image: &RgbImage) {
        *self.counts.entry(surface.to_string()).or_insert(0) += 1;
        self.window_count += 1;

        if surface.kind == SurfaceKind::Detected {
            self.dump(surface, image);
        }

        // 每秒打印一次显示统计
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            let fps = self.window_count as f64 / self.last.elapsed().as_secs_f64();
            log::debug!("🖼️  显示统计: {:.1}画面/s | {:?}", fps, self.counts);
            self.last = Instant::now();
            self.window_count = 0;
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for (surface, count) in &self.counts {
            log::info!("🖼️  {}: {} 帧", surface, count);
        }
    }
}
