/// 视频片段解码模块
/// Clip decoder: FFmpeg在辅助线程中解码, 采集线程按顺序读取
use super::decode_filter::DecodeFilter;
use super::feed::{frame_feed, FrameFeed};
use super::FrameSource;
use crate::types::Frame;
use anyhow::{anyhow, bail, Result};
use ez_ffmpeg::core::context::null_output::create_null_output;
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext};
use std::path::Path;
use std::thread::JoinHandle;

/// 解码缓冲帧数 (满了之后解码线程阻塞, 跟随采集速度)
const DECODE_BUFFER: usize = 8;

pub struct ClipDecoder {
    feed: Option<FrameFeed>,
    handle: Option<JoinHandle<()>>,
}

impl ClipDecoder {
    pub fn open(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            bail!("视频文件不存在: {}", path);
        }

        let (sender, feed) = frame_feed(DECODE_BUFFER);
        let filter = DecodeFilter::new(sender.frames(), path.to_string());
        let clip = path.to_string();

        let handle = std::thread::Builder::new()
            .name(format!("decode:{}", path))
            .spawn(move || {
                // 错误交给采集线程, 按帧源错误结束lane
                let result = decode_clip(&clip, filter).map_err(|e| e.context(clip));
                sender.finish(result);
            })?;

        log::info!("🎬 打开视频片段: {}", path);
        Ok(Self {
            feed: Some(feed),
            handle: Some(handle),
        })
    }
}

/// 构建FFmpeg上下文并阻塞直到解码结束
fn decode_clip(path: &str, filter: DecodeFilter) -> Result<()> {
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("decode", Box::new(filter));
    let out = create_null_output().add_frame_pipeline(pipe);

    let ctx = FfmpegContext::builder()
        .input(path)
        .filter_desc("format=yuv420p")
        .output(out)
        .build()
        .map_err(|e| anyhow!("构建失败: {}", e))?;

    let sch = ctx.start().map_err(|e| anyhow!("启动失败: {}", e))?;
    sch.wait().map_err(|e| anyhow!("解码中断: {}", e))
}

impl FrameSource for ClipDecoder {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match &self.feed {
            Some(feed) => feed.recv(),
            None => Ok(None),
        }
    }
}

impl Drop for ClipDecoder {
    fn drop(&mut self) {
        // 先释放接收端, 让阻塞在send上的解码线程退出
        self.feed.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
