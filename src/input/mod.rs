/// 视频输入系统 (Video Input System)
///
/// 采集线程按顺序拉取帧, 读完即结束:
/// - FrameSequence: 帧图片目录 (按文件名排序)
/// - ClipDecoder:   视频文件解码 (FFmpeg, 需要 ffmpeg 功能)
#[cfg(feature = "ffmpeg")]
pub mod decode_filter;
#[cfg(feature = "ffmpeg")]
pub mod decoder;
pub mod feed;
pub mod frames_dir;

use crate::config::SourceConfig;
use crate::types::Frame;
use anyhow::Result;

pub use frames_dir::FrameSequence;

/// 帧源接口: Ok(None) 表示视频已读完 (正常结束, 不是错误)
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// 根据配置打开帧源
pub fn open_source(config: &SourceConfig) -> Result<Box<dyn FrameSource>> {
    match config {
        SourceConfig::Frames { dir } => Ok(Box::new(FrameSequence::open(dir)?)),
        #[cfg(feature = "ffmpeg")]
        SourceConfig::Clip { path } => Ok(Box::new(decoder::ClipDecoder::open(path)?)),
        #[cfg(not(feature = "ffmpeg"))]
        SourceConfig::Clip { path } => anyhow::bail!(
            "视频文件 {} 需要 ffmpeg 功能 (cargo run --features ffmpeg), 或使用帧图片目录",
            path
        ),
    }
}
