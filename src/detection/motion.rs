//! 运动检测 (Motion Detector)
//! 职责: 相邻帧灰度差分 → 变化区域外接框 → 裁剪区域

use super::Detector;
use crate::types::{BBox, Frame, Region};
use anyhow::Result;
use image::{imageops, GrayImage};
use serde::{Deserialize, Serialize};

/// 运动检测参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub diff_threshold: u8,  // 像素灰度差阈值
    pub min_area_ratio: f32, // 变化像素占画面比例下限
    pub blur_sigma: f32,     // 高斯模糊 (<=0 关闭)
    pub margin: u32,         // 外接框外扩像素
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            diff_threshold: 30,
            min_area_ratio: 0.01,
            blur_sigma: 2.0,
            margin: 8,
        }
    }
}

pub struct MotionDetector {
    config: MotionConfig,
    previous: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    fn prepare(&self, frame: &Frame) -> GrayImage {
        let gray = imageops::grayscale(&*frame.image);
        if self.config.blur_sigma > 0.0 {
            imageproc::filter::gaussian_blur_f32(&gray, self.config.blur_sigma)
        } else {
            gray
        }
    }

    /// 两帧差分, 返回变化像素的外接框和像素数
    fn changed_area(&self, previous: &GrayImage, current: &GrayImage) -> Option<(BBox, u32)> {
        let (w, h) = current.dimensions();
        let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
        let mut changed = 0u32;

        for (x, y, p) in current.enumerate_pixels() {
            let q = previous.get_pixel(x, y);
            if p.0[0].abs_diff(q.0[0]) > self.config.diff_threshold {
                changed += 1;
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }
        }

        let min_pixels = (self.config.min_area_ratio * (w * h) as f32).max(1.0) as u32;
        if changed < min_pixels {
            return None;
        }

        let m = self.config.margin;
        let x = x0.saturating_sub(m);
        let y = y0.saturating_sub(m);
        let right = x1.saturating_add(m).saturating_add(1).min(w);
        let bottom = y1.saturating_add(m).saturating_add(1).min(h);
        let bbox = BBox::new(x, y, right - x, bottom - y);
        Some((bbox, changed))
    }
}

impl Detector for MotionDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Region>> {
        let current = self.prepare(frame);

        let found = match &self.previous {
            Some(previous) if previous.dimensions() == current.dimensions() => {
                self.changed_area(previous, &current)
            }
            _ => None, // 首帧或分辨率变化: 只记录背景
        };
        self.previous = Some(current);

        Ok(found.and_then(|(bbox, changed)| {
            log::trace!("运动区域 {:?}, 变化像素 {}", bbox, changed);
            Region::crop(frame, bbox)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn frame_with_square(index: u64, at: Option<(u32, u32)>) -> Frame {
        let mut img = RgbImage::from_pixel(64, 64, Rgb([20, 20, 20]));
        if let Some((sx, sy)) = at {
            for y in sy..sy + 10 {
                for x in sx..sx + 10 {
                    img.put_pixel(x, y, Rgb([240, 240, 240]));
                }
            }
        }
        Frame::new(index, img)
    }

    fn detector() -> MotionDetector {
        MotionDetector::new(MotionConfig {
            blur_sigma: 0.0,
            margin: 0,
            ..MotionConfig::default()
        })
    }

    #[test]
    fn test_first_frame_is_background() {
        let mut det = detector();
        assert!(det.detect(&frame_with_square(0, Some((5, 5)))).unwrap().is_none());
    }

    #[test]
    fn test_static_scene_has_no_motion() {
        let mut det = detector();
        det.detect(&frame_with_square(0, None)).unwrap();
        assert!(det.detect(&frame_with_square(1, None)).unwrap().is_none());
    }

    #[test]
    fn test_new_object_is_cropped() {
        let mut det = detector();
        det.detect(&frame_with_square(0, None)).unwrap();

        let region = det
            .detect(&frame_with_square(1, Some((20, 30))))
            .unwrap()
            .expect("motion expected");
        assert_eq!(region.frame_index, 1);
        assert_eq!(region.bbox, BBox::new(20, 30, 10, 10));
        assert_eq!(region.image.dimensions(), (10, 10));
    }

    #[test]
    fn test_small_change_below_min_area() {
        let mut det = MotionDetector::new(MotionConfig {
            blur_sigma: 0.0,
            min_area_ratio: 0.5,
            ..MotionConfig::default()
        });
        det.detect(&frame_with_square(0, None)).unwrap();
        assert!(det.detect(&frame_with_square(1, Some((0, 0)))).unwrap().is_none());
    }

    #[test]
    fn test_margin_is_clamped_to_frame() {
        let mut det = MotionDetector::new(MotionConfig {
            blur_sigma: 0.0,
            margin: 8,
            ..MotionConfig::default()
        });
        det.detect(&frame_with_square(0, None)).unwrap();
        let region = det
            .detect(&frame_with_square(1, Some((0, 0))))
            .unwrap()
            .unwrap();
        assert_eq!(region.bbox, BBox::new(0, 0, 18, 18));
    }

    #[test]
    fn test_huge_margin_covers_whole_frame() {
        let mut det = MotionDetector::new(MotionConfig {
            blur_sigma: 0.0,
            margin: u32::MAX,
            ..MotionConfig::default()
        });
        det.detect(&frame_with_square(0, None)).unwrap();
        let region = det
            .detect(&frame_with_square(1, Some((20, 20))))
            .unwrap()
            .unwrap();
        assert_eq!(region.bbox, BBox::new(0, 0, 64, 64));
    }
}
