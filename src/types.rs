/// 流水线数据结构定义
/// Data structures shared by capture lanes and the dispatch loop
use image::RgbImage;
use std::sync::Arc;

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box, 像素坐标)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 裁剪到图像范围内, 完全在外部时返回 None
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BBox> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(BBox::new(self.x, self.y, w, h))
    }
}

/// 视频帧 (采集线程 → 检测/显示)
///
/// 图像数据使用Arc共享, 发送到显示队列时避免复制
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64, // 帧序号 (每条lane独立计数)
    pub image: Arc<RgbImage>,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self {
            index,
            image: Arc::new(image),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// 检测区域: 从帧中裁剪出的子图
#[derive(Clone, Debug)]
pub struct Region {
    pub frame_index: u64,
    pub bbox: BBox,
    pub image: RgbImage,
}

impl Region {
    /// 按检测框裁剪帧, 检测框超出画面的部分会被截掉
    pub fn crop(frame: &Frame, bbox: BBox) -> Option<Region> {
        let bbox = bbox.clamp_to(frame.width(), frame.height())?;
        let image =
            image::imageops::crop_imm(&*frame.image, bbox.x, bbox.y, bbox.width, bbox.height)
                .to_image();
        Some(Region {
            frame_index: frame.index,
            bbox,
            image,
        })
    }
}
