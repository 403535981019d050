//! 帧图片目录输入 - 模拟录制好的视频片段
//!
//! 目录中的 png/jpg/bmp 按文件名排序依次读出, 读完即视频结束

use super::FrameSource;
use crate::types::Frame;
use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct FrameSequence {
    files: VecDeque<PathBuf>,
    index: u64,
}

impl FrameSequence {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("无法打开帧目录: {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            bail!("帧目录中没有图片: {}", dir.display());
        }
        log::info!("🎞️  帧目录 {}: {} 帧", dir.display(), files.len());

        Ok(Self {
            files: files.into(),
            index: 0,
        })
    }

    pub fn remaining(&self) -> usize {
        self.files.len()
    }
}

impl FrameSource for FrameSequence {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("读取帧失败: {}", path.display()))?
            .to_rgb8();
        let frame = Frame::new(self.index, image);
        self.index += 1;
        Ok(Some(frame))
    }
}
