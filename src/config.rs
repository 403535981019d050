//! 工厂配置 - 命令行参数 + JSON预设文件

use crate::detection::color::ColorRange;
use crate::detection::motion::MotionConfig;
use crate::xbus::Lane;
use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 智能工厂演示程序参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Smart factory demo - 双相机检测 + 执行器控制", long_about = None)]
pub struct Args {
    /// 执行器控制器端口 (例如 /dev/ttyACM0), 不指定时只打印不驱动硬件
    #[arg(short, long)]
    pub device: Option<String>,

    /// Lane预设文件 (JSON), 不存在时自动生成默认配置
    #[arg(short, long, default_value = "resources/factory.json")]
    pub config: String,

    /// 覆盖两条lane的视频源 (视频文件或帧图片目录)
    #[arg(long)]
    pub clip: Option<String>,

    /// 覆盖Cam1分类模型路径
    #[arg(long)]
    pub model: Option<String>,

    /// 无窗口模式 (只打印统计)
    #[arg(long)]
    pub headless: bool,

    /// 将检测区域保存为PNG (仅无窗口模式)
    #[arg(long)]
    pub dump_dir: Option<PathBuf>,

    /// 调度循环读取队列的超时 (毫秒, 无窗口模式; 窗口模式按帧刷新)
    #[arg(long, default_value_t = 10)]
    pub poll_ms: u64,
}

impl Args {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

/// 视频源配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 视频文件 (需要 ffmpeg 功能)
    Clip { path: String },
    /// 按文件名排序的帧图片目录
    Frames { dir: String },
}

impl SourceConfig {
    /// 根据路径类型选择: 目录 → 帧图片, 其他 → 视频文件
    pub fn from_path(path: &str) -> Self {
        if Path::new(path).is_dir() {
            SourceConfig::Frames {
                dir: path.to_string(),
            }
        } else {
            SourceConfig::Clip {
                path: path.to_string(),
            }
        }
    }
}

/// 区域分类器配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierConfig {
    /// ONNX二分类模型, 分数 = 第一个输出概率
    Onnx { model: String, input_size: u32 },
    /// 颜色占比, 分数 = 主颜色为target时的占比百分数
    Color {
        target: String,
        colors: Vec<ColorRange>,
    },
}

/// 单条lane配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaneConfig {
    pub lane: Lane,
    pub source: SourceConfig,
    pub motion: MotionConfig,
    pub classifier: ClassifierConfig,
    pub actuator_channel: u8, // 触发时推动的执行器通道
    pub threshold: f32,       // 分数严格大于该值时触发
    pub pacing_ms: u64,       // 每次循环前的让步延时
}

impl LaneConfig {
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

/// 工厂配置 (两条lane)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    pub lanes: Vec<LaneConfig>,
}

const DEFAULT_CLIP: &str = "resources/conveyor.mp4";

impl Default for FactoryConfig {
    fn default() -> Self {
        let source = SourceConfig::Clip {
            path: DEFAULT_CLIP.to_string(),
        };
        Self {
            lanes: vec![
                // Cam1: 运动检测 + 不良品分类
                LaneConfig {
                    lane: Lane(1),
                    source: source.clone(),
                    motion: MotionConfig::default(),
                    classifier: ClassifierConfig::Onnx {
                        model: "resources/model.onnx".to_string(),
                        input_size: 224,
                    },
                    actuator_channel: 1,
                    threshold: 0.0,
                    pacing_ms: 30,
                },
                // Cam2: 运动检测 + 颜色判断
                LaneConfig {
                    lane: Lane(2),
                    source,
                    motion: MotionConfig::default(),
                    classifier: ClassifierConfig::Color {
                        target: "blue".to_string(),
                        colors: ColorRange::defaults(),
                    },
                    actuator_channel: 2,
                    threshold: 0.5,
                    pacing_ms: 30,
                },
            ],
        }
    }
}

impl FactoryConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    log::info!("✅ 配置已从 {} 加载", path);
                    config
                }
                Err(e) => {
                    log::warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                config.save(path);
                config
            }
            Err(e) => {
                // 文件存在但无法读取: 不覆盖用户配置
                log::warn!("⚠️  无法读取配置文件 {}: {}, 使用默认值", path, e);
                Self::default()
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &str) {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    log::error!("❌ 保存配置失败: {}", e);
                } else {
                    log::info!("💾 配置已保存到 {}", path);
                }
            }
            Err(e) => log::error!("❌ 序列化配置失败: {}", e),
        }
    }

    /// 应用命令行覆盖项
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(clip) = &args.clip {
            let source = SourceConfig::from_path(clip);
            for lane in &mut self.lanes {
                lane.source = source.clone();
            }
        }
        if let Some(model) = &args.model {
            for lane in &mut self.lanes {
                if let ClassifierConfig::Onnx { model: path, .. } = &mut lane.classifier {
                    *path = model.clone();
                }
            }
        }
    }

    /// 检查配置: 恰好两条lane, 编号不重复
    pub fn validate(&self) -> Result<()> {
        if self.lanes.len() != 2 {
            bail!("需要恰好两条lane, 当前配置 {} 条", self.lanes.len());
        }
        if self.lanes[0].lane == self.lanes[1].lane {
            bail!("lane编号重复: {}", self.lanes[0].lane);
        }
        for lane in &self.lanes {
            if let ClassifierConfig::Color { target, colors } = &lane.classifier {
                if !colors.iter().any(|c| &c.name == target) {
                    bail!("{}: 目标颜色 {} 不在颜色列表中", lane.lane, target);
                }
            }
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        log::info!("🎛️  当前lane配置:");
        for lane in &self.lanes {
            let classifier = match &lane.classifier {
                ClassifierConfig::Onnx { model, .. } => format!("onnx({})", model),
                ClassifierConfig::Color { target, .. } => format!("color({})", target),
            };
            log::info!(
                "  {}: {:?} | {} | 阈值>{:.2} → 执行器{} | 间隔{}ms",
                lane.lane,
                lane.source,
                classifier,
                lane.threshold,
                lane.actuator_channel,
                lane.pacing_ms
            );
        }
    }
}
