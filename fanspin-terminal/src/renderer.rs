//! ASCII rasterizer for terminal rendering

use crossterm::{
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Point3, Vector3};
use std::io::Write;
use fanspin_core::{Camera, RenderItem, Triangle};

/// Character luminosity ramp for shading (faintest to densest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Renders scene meshes into a grid of terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    background: Color,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize, background: [u8; 3]) -> Self {
        let size = width * height;
        let [r, g, b] = background;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            background: Color::Rgb { r, g, b },
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Character at a cell, for inspection.
    pub fn cell(&self, x: usize, y: usize) -> Option<char> {
        (x < self.width && y < self.height).then(|| self.char_buffer[y * self.width + x])
    }

    pub fn render_items(&mut self, items: &[RenderItem<'_>], camera: &Camera) {
        for item in items {
            for triangle in &item.mesh.triangles {
                self.render_triangle(triangle, item, camera);
            }
        }
    }

    fn render_triangle(&mut self, triangle: &Triangle, item: &RenderItem<'_>, camera: &Camera) {
        // Project vertices to screen space
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (coords, vertex) in screen_coords.iter_mut().zip(&triangle.vertices) {
            match camera.project_to_screen(
                &vertex.position,
                &item.model,
                self.width as u32,
                self.height as u32,
            ) {
                Some(projected) => *coords = projected,
                None => return, // Triangle is clipped
            }
        }

        // Shade both faces by how squarely they face the eye
        let world = triangle.positions().map(|p| item.model.transform_point(&p));
        let normal = (world[1] - world[0]).cross(&(world[2] - world[0]));
        let centroid = Point3::from((world[0].coords + world[1].coords + world[2].coords) / 3.0);
        let to_eye: Vector3<f32> = camera.position - centroid;
        let brightness = match (normal.try_normalize(1e-12), to_eye.try_normalize(1e-12)) {
            (Some(n), Some(e)) => n.dot(&e).abs(),
            _ => return,
        };

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
        let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

        self.rasterize_triangle(&screen_coords, character);
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                // Interpolate depth
                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.char_buffer[idx] = character;
                }
            }
        }
    }

    /// Queue the frame, one row at a time, on the configured background.
    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.queue(SetBackgroundColor(self.background))?;
        let mut current = None;
        for y in 0..self.height {
            writer.queue(MoveTo(0, y as u16))?;
            for x in 0..self.width {
                let c = self.char_buffer[y * self.width + x];
                let color = ink(c);
                if current != Some(color) {
                    writer.queue(SetForegroundColor(color))?;
                    current = Some(color);
                }
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Foreground colour for a shade character, dark enough for a light background.
fn ink(c: char) -> Color {
    match c {
        ' ' | '.' | ':' => Color::Rgb { r: 110, g: 130, b: 150 },
        '-' | '=' => Color::DarkGrey,
        '+' | '*' => Color::DarkBlue,
        _ => Color::Black,
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fanspin_core::Mesh;
    use nalgebra::Matrix4;

    fn filled_cells(renderer: &AsciiRenderer) -> usize {
        (0..renderer.height())
            .flat_map(|y| (0..renderer.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| renderer.cell(x, y) != Some(' '))
            .count()
    }

    #[test]
    fn test_cube_facing_camera_is_drawn_dense() {
        let cube = Mesh::cube(2.0);
        let items = [RenderItem { mesh: &cube, model: Matrix4::identity() }];
        let camera = Camera::new(40, 20);
        let mut renderer = AsciiRenderer::new(40, 20, [255, 255, 255]);

        renderer.render_items(&items, &camera);

        // The front face looks straight at the eye at the centre of the view.
        assert_eq!(renderer.cell(20, 10), Some('@'));
        assert_eq!(renderer.cell(0, 0), Some(' '));

        renderer.clear();
        assert_eq!(filled_cells(&renderer), 0);
    }

    #[test]
    fn test_geometry_behind_camera_is_skipped() {
        let cube = Mesh::cube(1.0);
        let model = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 10.0));
        let items = [RenderItem { mesh: &cube, model }];
        let mut renderer = AsciiRenderer::new(20, 10, [0, 0, 0]);

        renderer.render_items(&items, &Camera::new(20, 10));
        assert_eq!(filled_cells(&renderer), 0);
    }

    #[test]
    fn test_barycentric_degenerate() {
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (0.5, 0.5)).is_none());
        let (w0, w1, w2) = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!((w0 + w1 + w2 - 1.0).abs() < 1e-6);
        assert!(w0 > 0.0 && w1 > 0.0 && w2 > 0.0);
    }

    #[test]
    fn test_draw_emits_every_row() {
        let renderer = AsciiRenderer::new(3, 2, [207, 231, 253]);
        let mut out = Vec::new();
        renderer.draw(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        // MoveTo is 1-based on the wire.
        assert!(text.contains("\x1b[1;1H"));
        assert!(text.contains("\x1b[2;1H"));
        assert!(text.contains("48;2;207;231;253"));
    }
}
