//! 解码线程 → 采集线程的帧队列
//!
//! 解码线程出错时先放入错误再释放发送端, 读取端读完剩余帧后返回该错误

use crate::types::Frame;
use anyhow::Result;
use crossbeam_channel::{bounded, Receiver, Sender};

pub fn frame_feed(capacity: usize) -> (FeedSender, FrameFeed) {
    let (tx_frames, rx_frames) = bounded(capacity);
    let (tx_error, rx_error) = bounded(1);
    (
        FeedSender {
            tx_frames,
            tx_error,
        },
        FrameFeed {
            rx_frames,
            rx_error,
        },
    )
}

/// 解码线程持有
pub struct FeedSender {
    tx_frames: Sender<Frame>,
    tx_error: Sender<anyhow::Error>,
}

impl FeedSender {
    /// 帧发送端 (交给解码过滤器)
    pub fn frames(&self) -> Sender<Frame> {
        self.tx_frames.clone()
    }

    /// 结束解码: Err 会在剩余帧之后交给读取端
    pub fn finish(self, result: Result<()>) {
        if let Err(e) = result {
            let _ = self.tx_error.send(e);
        }
    }
}

/// 采集线程持有
pub struct FrameFeed {
    rx_frames: Receiver<Frame>,
    rx_error: Receiver<anyhow::Error>,
}

impl FrameFeed {
    /// 阻塞读取下一帧, Ok(None) 表示正常读完
    pub fn recv(&self) -> Result<Option<Frame>> {
        match self.rx_frames.recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(_) => match self.rx_error.try_recv() {
                Ok(e) => Err(e),
                Err(_) => Ok(None),
            },
        }
    }
}
