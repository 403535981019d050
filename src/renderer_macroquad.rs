/// macroquad 窗口显示
///
/// 一个窗口按 2x2 网格显示四个画面: Cam1 live / Cam1 detected / Cam2 live / Cam2 detected
use crate::pipeline::QuitSignal;
use crate::renderer::Display;
use crate::xbus::{StopFlag, Surface, SurfaceKind};
use image::RgbImage;
use macroquad::prelude::{
    clear_background, draw_rectangle, draw_text, draw_texture_ex, is_key_pressed,
    is_quit_requested, prevent_quit, screen_height, screen_width, vec2, Color, Conf,
    DrawTextureParams, FilterMode, Image, KeyCode, Texture2D, BLACK, GREEN, WHITE,
};
use std::time::Instant;

pub const WINDOW_WIDTH: i32 = 1280;
pub const WINDOW_HEIGHT: i32 = 720;

pub fn window_conf() -> Conf {
    Conf {
        window_title: "Smart Factory".to_string(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        window_resizable: true,
        ..Default::default()
    }
}

struct Tile {
    surface: Surface,
    texture: Texture2D,
    frames: u64,
}

pub struct MacroquadDisplay {
    tiles: Vec<Tile>,
    render_count: u64,
    render_last: Instant,
    render_fps: f64,
    closed: bool,
}

impl MacroquadDisplay {
    pub fn new() -> Self {
        log::info!("🎨 渲染器启动");
        Self {
            tiles: Vec::new(),
            render_count: 0,
            render_last: Instant::now(),
            render_fps: 0.0,
            closed: false,
        }
    }

    fn tile_order(surface: &Surface) -> (u8, u8) {
        let kind = match surface.kind {
            SurfaceKind::Live => 0,
            SurfaceKind::Detected => 1,
        };
        (surface.lane.0, kind)
    }
}

impl Default for MacroquadDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// 纹理尺寸, 超出 u16 范围时返回 None
fn texture_size(image: &RgbImage) -> Option<(u16, u16)> {
    Some((
        u16::try_from(image.width()).ok()?,
        u16::try_from(image.height()).ok()?,
    ))
}

fn to_rgba(image: &RgbImage) -> Vec<u8> {
    image
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2], 255])
        .collect()
}

impl Display for MacroquadDisplay {
    fn show(&mut self, surface: Surface, image: &RgbImage) {
        if self.closed {
            return;
        }
        let Some((w, h)) = texture_size(image) else {
            log::warn!(
                "⚠️  {} 画面过大 {}x{}, 跳过",
                surface,
                image.width(),
                image.height()
            );
            return;
        };
        let bytes = to_rgba(image);

        match self.tiles.iter_mut().find(|t| t.surface == surface) {
            // 只在分辨率变化时重建纹理, 否则更新像素数据
            Some(tile)
                if tile.texture.width() as u16 == w && tile.texture.height() as u16 == h =>
            {
                tile.texture.update(&Image {
                    bytes,
                    width: w,
                    height: h,
                });
                tile.frames += 1;
            }
            Some(tile) => {
                tile.texture = Texture2D::from_rgba8(w, h, &bytes);
                tile.texture.set_filter(FilterMode::Linear);
                tile.frames += 1;
            }
            None => {
                let texture = Texture2D::from_rgba8(w, h, &bytes);
                texture.set_filter(FilterMode::Linear);
                self.tiles.push(Tile {
                    surface,
                    texture,
                    frames: 1,
                });
                self.tiles.sort_by_key(|t| Self::tile_order(&t.surface));
            }
        }
    }

    fn present(&mut self) {
        clear_background(BLACK);
        if self.closed {
            return;
        }

        let cols = 2usize;
        let rows = self.tiles.len().div_ceil(cols).max(1);
        let cell_w = screen_width() / cols as f32;
        let cell_h = screen_height() / rows as f32;

        for (i, tile) in self.tiles.iter().enumerate() {
            let cx = (i % cols) as f32 * cell_w;
            let cy = (i / cols) as f32 * cell_h;

            // 等比缩放居中
            let scale = (cell_w / tile.texture.width()).min(cell_h / tile.texture.height());
            let w = tile.texture.width() * scale;
            let h = tile.texture.height() * scale;
            draw_texture_ex(
                &tile.texture,
                cx + (cell_w - w) / 2.0,
                cy + (cell_h - h) / 2.0,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(vec2(w, h)),
                    ..Default::default()
                },
            );

            draw_rectangle(cx, cy, 260.0, 30.0, Color::new(0.0, 0.0, 0.0, 0.5));
            let label = format!("{} #{}", tile.surface, tile.frames);
            draw_text(&label, cx + 8.0, cy + 22.0, 24.0, GREEN);
        }

        // FPS统计
        self.render_count += 1;
        if self.render_last.elapsed().as_secs_f64() >= 1.0 {
            self.render_fps = self.render_count as f64 / self.render_last.elapsed().as_secs_f64();
            self.render_count = 0;
            self.render_last = Instant::now();
        }
        let fps = format!("{:.0} fps", self.render_fps);
        draw_text(&fps, screen_width() - 90.0, 22.0, 24.0, WHITE);
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for tile in &self.tiles {
            log::info!("🖼️  {}: {} 帧", tile.surface, tile.frames);
        }
        self.tiles.clear();
    }
}

/// 窗口退出信号: q键 / 关闭窗口 / Ctrl+C
pub struct KeyQuit {
    interrupt: StopFlag,
}

impl KeyQuit {
    pub fn new(interrupt: StopFlag) -> Self {
        // 接管窗口关闭, 由调度循环完成收尾
        prevent_quit();
        Self { interrupt }
    }
}

impl QuitSignal for KeyQuit {
    fn requested(&mut self) -> bool {
        is_key_pressed(KeyCode::Q) || is_quit_requested() || self.interrupt.is_raised()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_size_limits() {
        assert_eq!(texture_size(&RgbImage::new(1920, 1080)), Some((1920, 1080)));
        assert_eq!(texture_size(&RgbImage::new(70_000, 1)), None);
    }
}
