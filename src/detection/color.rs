//! 颜色占比分类 (Color Classifier)
//! 区域像素 → HSV → 按色相区间统计占比

use super::{Classification, Classifier};
use crate::types::Region;
use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// 颜色区间 (色相单位: 度, hue_min > hue_max 表示跨越0度)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub hue_min: f32,
    pub hue_max: f32,
    pub min_saturation: f32,
    pub min_value: f32,
}

impl ColorRange {
    pub fn new(name: &str, hue_min: f32, hue_max: f32) -> Self {
        Self {
            name: name.to_string(),
            hue_min,
            hue_max,
            min_saturation: 0.35,
            min_value: 0.2,
        }
    }

    /// 默认颜色表
    pub fn defaults() -> Vec<ColorRange> {
        vec![
            ColorRange::new("red", 340.0, 20.0),
            ColorRange::new("yellow", 40.0, 70.0),
            ColorRange::new("green", 70.0, 170.0),
            ColorRange::new("blue", 190.0, 260.0),
        ]
    }

    fn contains(&self, (h, s, v): (f32, f32, f32)) -> bool {
        if s < self.min_saturation || v < self.min_value {
            return false;
        }
        if self.hue_min <= self.hue_max {
            h >= self.hue_min && h <= self.hue_max
        } else {
            h >= self.hue_min || h <= self.hue_max
        }
    }
}

/// RGB → HSV (h: 0..360, s/v: 0..1)
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

pub struct ColorClassifier {
    target: String,
    colors: Vec<ColorRange>,
}

impl ColorClassifier {
    pub fn new(target: String, colors: Vec<ColorRange>) -> Self {
        Self { target, colors }
    }

    /// 各颜色占比 (0..1), 按占比从高到低排序
    pub fn predict(&self, image: &RgbImage) -> Vec<(String, f32)> {
        let total = (image.width() * image.height()).max(1) as f32;
        let mut counts = vec![0u32; self.colors.len()];

        for p in image.pixels() {
            let hsv = rgb_to_hsv(p.0[0], p.0[1], p.0[2]);
            if let Some(i) = self.colors.iter().position(|c| c.contains(hsv)) {
                counts[i] += 1;
            }
        }

        let mut ratios: Vec<(String, f32)> = self
            .colors
            .iter()
            .zip(counts)
            .map(|(c, n)| (c.name.clone(), n as f32 / total))
            .collect();
        ratios.sort_by(|a, b| b.1.total_cmp(&a.1));
        ratios
    }
}

impl Classifier for ColorClassifier {
    /// 分数: 主颜色为目标颜色时的占比百分数, 否则为0
    fn classify(&mut self, region: &Region) -> Result<Classification> {
        let predictions = self.predict(&region.image);
        let (name, ratio) = predictions
            .into_iter()
            .next()
            .unwrap_or_else(|| (String::from("none"), 0.0));
        let percent = ratio * 100.0;
        let score = if name == self.target { percent } else { 0.0 };
        Ok(Classification::labeled(
            format!("{}: {:.2}%", name, percent),
            score,
        ))
    }
}
