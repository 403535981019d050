/// FFmpeg解码过滤器模块
/// FFmpeg decode filter module
use crate::types::Frame;
use crossbeam_channel::Sender;
use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame as AvFrame};
use image::RgbImage;
use std::time::Instant;

/// FFmpeg解码过滤器: 视频片段 → RGB帧 → 采集线程
#[derive(Clone)]
pub struct DecodeFilter {
    pub tx_frames: Sender<Frame>, // 发送给采集线程 (有界, 解码跟随读取速度)
    pub frame_id: u64,
    pub dropped: u64,
    pub count: u64,
    pub last: Instant,
    pub current_fps: f64,
    pub source: String,
}

impl DecodeFilter {
    pub fn new(tx_frames: Sender<Frame>, source: String) -> Self {
        Self {
            tx_frames,
            frame_id: 0,
            dropped: 0,
            count: 0,
            last: Instant::now(),
            current_fps: 0.0,
            source,
        }
    }
}

/// 最大支持分辨率
const MAX_SIDE: i32 = 4096;

/// 通过检查的YUV420P平面布局
#[derive(Debug, PartialEq, Eq)]
struct PlaneLayout {
    width: u32,
    height: u32,
    y_stride: usize,
    uv_stride: usize,
}

impl PlaneLayout {
    /// 分辨率必须在 1..=4096, 步长为正且覆盖一整行
    fn check(width: i32, height: i32, y_stride: i32, uv_stride: i32) -> Option<Self> {
        if width <= 0 || height <= 0 || width > MAX_SIDE || height > MAX_SIDE {
            return None;
        }
        if y_stride < width || uv_stride < (width + 1) / 2 {
            return None;
        }
        Some(Self {
            width: width as u32,
            height: height as u32,
            y_stride: y_stride as usize,
            uv_stride: uv_stride as usize,
        })
    }
}

impl DecodeFilter {
    fn skip(&mut self, reason: &str) {
        self.dropped += 1;
        if self.dropped <= 10 {
            log::warn!("⚠️  {} 丢弃帧 #{}: {}", self.source, self.frame_id, reason);
        }
    }
}

impl FrameFilter for DecodeFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        log::debug!("✅ 解码开始: {}", self.source);
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: AvFrame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<AvFrame>, String> {
        let rgb = unsafe {
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                self.skip("空帧/损坏帧");
                return Ok(Some(frame));
            }
            let raw = &*frame.as_ptr();

            let data_y = raw.data[0];
            let data_u = raw.data[1];
            let data_v = raw.data[2];
            if data_y.is_null() || data_u.is_null() || data_v.is_null() {
                self.skip("YUV指针为空");
                return Ok(Some(frame));
            }

            let Some(layout) =
                PlaneLayout::check(raw.width, raw.height, raw.linesize[0], raw.linesize[1])
            else {
                self.skip("分辨率或步长异常");
                return Ok(Some(frame));
            };
            let PlaneLayout {
                width: w,
                height: h,
                y_stride,
                uv_stride,
            } = layout;

            // YUV420P → RGB (BT.601)
            let mut rgb = RgbImage::new(w, h);
            for (x, y, px) in rgb.enumerate_pixels_mut() {
                let (x, y) = (x as usize, y as usize);
                let y_val = *data_y.add(y * y_stride + x) as f32;
                let u_val = *data_u.add((y / 2) * uv_stride + x / 2) as f32 - 128.0;
                let v_val = *data_v.add((y / 2) * uv_stride + x / 2) as f32 - 128.0;

                px.0 = [
                    (y_val + 1.402 * v_val).clamp(0.0, 255.0) as u8,
                    (y_val - 0.344 * u_val - 0.714 * v_val).clamp(0.0, 255.0) as u8,
                    (y_val + 1.772 * u_val).clamp(0.0, 255.0) as u8,
                ];
            }
            rgb
        };

        // 计算FPS
        if self.last.elapsed().as_secs_f64() >= 1.0 {
            let elapsed = self.last.elapsed().as_secs_f64();
            self.current_fps = self.count as f64 / elapsed;
            log::debug!("📺 解码统计: {} | {:.1}fps", self.source, self.current_fps);
            self.last = Instant::now();
            self.count = 0;
        }

        let decoded = Frame::new(self.frame_id, rgb);
        self.frame_id += 1;
        self.count += 1;

        // 阻塞发送: 采集线程退出后接收端被释放, 此时中止解码
        self.tx_frames
            .send(decoded)
            .map_err(|_| String::from("采集线程已退出"))?;

        Ok(Some(frame))
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        log::debug!("✅ 解码结束: {}", self.source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_layout_accepts_padded_strides() {
        assert_eq!(
            PlaneLayout::check(641, 480, 704, 352),
            Some(PlaneLayout {
                width: 641,
                height: 480,
                y_stride: 704,
                uv_stride: 352,
            })
        );
    }

    #[test]
    fn test_plane_layout_rejects_bad_frames() {
        assert!(PlaneLayout::check(0, 480, 640, 320).is_none());
        assert!(PlaneLayout::check(640, 0, 640, 320).is_none());
        assert!(PlaneLayout::check(8192, 480, 8192, 4096).is_none());
        // 负步长 (倒置图像) 不能当作 usize 使用
        assert!(PlaneLayout::check(640, 480, -640, -320).is_none());
        assert!(PlaneLayout::check(640, 480, 600, 320).is_none());
        // 奇数宽度的色度行需要 (w+1)/2 字节
        assert!(PlaneLayout::check(641, 480, 704, 320).is_none());
    }
}
