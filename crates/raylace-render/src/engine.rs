//! The seam to the native render engine.
//!
//! The viewer never looks inside an engine: it hands over scene assets,
//! viewport size and camera drags, and asks for rows `y_offset,
//! y_offset + row_jump, ...` to be written into an RGBA8 buffer.

use std::sync::Arc;

use raylace_assets::SceneAssets;
use raylace_core::{Point2D, RaylaceError, RaylaceResult, BYTES_PER_PIXEL};

pub trait RenderEngine: Send {
    fn resize(&mut self, width: u32, height: u32);

    fn set_scene(&mut self, scene: &SceneAssets) -> RaylaceResult<()>;

    /// Apply the camera change for a drag between two screen-space points.
    fn turn_camera(&mut self, drag_begin: Point2D, drag_end: Point2D);

    /// Write rows `y_offset, y_offset + row_jump, ...` of the current view
    /// into `target` (row-major RGBA8, stride `width * 4`). Other rows must
    /// not be written.
    fn render_interlaced(
        &self,
        target: &mut [u8],
        y_offset: usize,
        row_jump: usize,
    ) -> RaylaceResult<()>;
}

/// Builds the engine of one worker. Called once, on the worker's own thread,
/// with the worker index.
pub type EngineFactory = Arc<dyn Fn(usize) -> Box<dyn RenderEngine> + Send + Sync>;

/// Deterministic stand-in engine for headless sessions and tests.
///
/// Each pixel is a pure function of its position, the camera angles and a
/// tint derived from the scene bytes, so any worker count composites to the
/// same frame.
#[derive(Debug, Clone, Default)]
pub struct GradientEngine {
    width: u32,
    height: u32,
    yaw: f64,
    pitch: f64,
    tint: [u8; 3],
}

/// Fraction of a full turn applied per viewport-wide drag.
const TURN_PER_VIEWPORT: f64 = 0.5;

impl GradientEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory() -> EngineFactory {
        Arc::new(|_index| Box::new(GradientEngine::new()) as Box<dyn RenderEngine>)
    }

    pub fn camera(&self) -> (f64, f64) {
        (self.yaw, self.pitch)
    }

    pub fn tint(&self) -> [u8; 3] {
        self.tint
    }

    fn shade(&self, x: u32, y: u32) -> [u8; 4] {
        let u = (x as f64 + 0.5) / self.width as f64;
        // Screen space has its origin at the bottom-left.
        let v = 1.0 - (y as f64 + 0.5) / self.height as f64;
        let r = ((u + self.yaw).rem_euclid(1.0) * 255.0) as u16;
        let g = ((v + self.pitch).rem_euclid(1.0) * 255.0) as u16;
        [
            ((r + self.tint[0] as u16) / 2) as u8,
            ((g + self.tint[1] as u16) / 2) as u8,
            self.tint[2],
            255,
        ]
    }
}

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(seed, |h, &b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

impl RenderEngine for GradientEngine {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_scene(&mut self, scene: &SceneAssets) -> RaylaceResult<()> {
        if scene.scene.is_empty() {
            return Err(RaylaceError::Render(format!("scene '{}' is empty", scene.key)));
        }
        let mut hash = fnv1a(0xcbf2_9ce4_8422_2325, &scene.scene);
        for (_, mesh) in &scene.meshes {
            hash = fnv1a(hash, mesh);
        }
        let [a, b, c, ..] = hash.to_le_bytes();
        self.tint = [a, b, c];
        self.yaw = 0.0;
        self.pitch = 0.0;
        Ok(())
    }

    fn turn_camera(&mut self, drag_begin: Point2D, drag_end: Point2D) {
        let delta = drag_begin.delta_to(&drag_end);
        self.yaw += delta.x / self.width.max(1) as f64 * TURN_PER_VIEWPORT;
        self.pitch += delta.y / self.height.max(1) as f64 * TURN_PER_VIEWPORT;
    }

    fn render_interlaced(
        &self,
        target: &mut [u8],
        y_offset: usize,
        row_jump: usize,
    ) -> RaylaceResult<()> {
        if row_jump == 0 {
            return Err(RaylaceError::InvalidArgument("row_jump must be positive".into()));
        }
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let needed = stride * self.height as usize;
        if target.len() < needed {
            return Err(RaylaceError::Render(format!(
                "target holds {} bytes, viewport {}x{} needs {}",
                target.len(),
                self.width,
                self.height,
                needed
            )));
        }

        for y in (y_offset..self.height as usize).step_by(row_jump) {
            let row = &mut target[y * stride..(y + 1) * stride];
            for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
                px.copy_from_slice(&self.shade(x as u32, y as u32));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raylace_assets::{AssetBytes, AssetKey};

    fn scene(bytes: &[u8]) -> SceneAssets {
        SceneAssets {
            key: AssetKey::new("test.json"),
            scene: AssetBytes::from(bytes),
            meshes: Vec::new(),
        }
    }

    #[test]
    fn test_interlaced_render_touches_only_owned_rows() {
        let mut engine = GradientEngine::new();
        engine.resize(3, 5);
        engine.set_scene(&scene(b"{}")).unwrap();

        let mut target = vec![0u8; 3 * 5 * 4];
        engine.render_interlaced(&mut target, 1, 2).unwrap();

        for y in 0..5 {
            let row = &target[y * 12..(y + 1) * 12];
            if y % 2 == 1 {
                assert!(row.chunks_exact(4).all(|px| px[3] == 255), "row {y}");
            } else {
                assert!(row.iter().all(|&b| b == 0), "row {y}");
            }
        }
    }

    #[test]
    fn test_interlaced_slices_equal_full_render() {
        let mut engine = GradientEngine::new();
        engine.resize(7, 9);
        engine.set_scene(&scene(b"{\"spheres\": []}")).unwrap();
        engine.turn_camera(Point2D::new(1.0, 1.0), Point2D::new(4.0, 3.0));

        let mut full = vec![0u8; 7 * 9 * 4];
        engine.render_interlaced(&mut full, 0, 1).unwrap();

        let mut merged = vec![0u8; 7 * 9 * 4];
        for offset in 0..3 {
            let mut slice = vec![0u8; 7 * 9 * 4];
            engine.render_interlaced(&mut slice, offset, 3).unwrap();
            for y in (offset..9).step_by(3) {
                merged[y * 28..(y + 1) * 28].copy_from_slice(&slice[y * 28..(y + 1) * 28]);
            }
        }
        assert_eq!(full, merged);
    }

    #[test]
    fn test_turn_camera_changes_image() {
        let mut engine = GradientEngine::new();
        engine.resize(4, 4);
        engine.set_scene(&scene(b"{}")).unwrap();
        let mut before = vec![0u8; 64];
        engine.render_interlaced(&mut before, 0, 1).unwrap();

        engine.turn_camera(Point2D::new(0.0, 0.0), Point2D::new(2.0, 0.0));
        assert_eq!(engine.camera(), (0.25, 0.0));
        let mut after = vec![0u8; 64];
        engine.render_interlaced(&mut after, 0, 1).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_short_target_is_rejected() {
        let mut engine = GradientEngine::new();
        engine.resize(4, 4);
        let mut target = vec![0u8; 10];
        assert!(engine.render_interlaced(&mut target, 0, 1).is_err());
    }

    #[test]
    fn test_empty_scene_is_rejected() {
        let mut engine = GradientEngine::new();
        assert!(engine.set_scene(&scene(b"")).is_err());
    }

    #[test]
    fn test_tint_follows_scene_and_mesh_bytes() {
        let mut engine = GradientEngine::new();
        engine.set_scene(&scene(b"{\"name\": \"a\"}")).unwrap();
        let plain = engine.tint();

        engine.set_scene(&scene(b"{\"name\": \"b\"}")).unwrap();
        assert_ne!(engine.tint(), plain);

        let mut with_mesh = scene(b"{\"name\": \"a\"}");
        with_mesh
            .meshes
            .push((AssetKey::new("tri.obj"), AssetBytes::from(&b"v 0 0 0"[..])));
        engine.set_scene(&with_mesh).unwrap();
        let meshed = engine.tint();
        assert_ne!(meshed, plain);

        engine.set_scene(&scene(b"{\"name\": \"a\"}")).unwrap();
        assert_eq!(engine.tint(), plain);

        // A rejected scene keeps the previous tint.
        assert!(engine.set_scene(&scene(b"")).is_err());
        assert_eq!(engine.tint(), plain);
    }

    #[test]
    fn test_new_scene_resets_camera() {
        let mut engine = GradientEngine::new();
        engine.resize(4, 4);
        engine.set_scene(&scene(b"{}")).unwrap();
        engine.turn_camera(Point2D::new(0.0, 0.0), Point2D::new(2.0, 2.0));
        assert_ne!(engine.camera(), (0.0, 0.0));
        engine.set_scene(&scene(b"{}")).unwrap();
        assert_eq!(engine.camera(), (0.0, 0.0));
    }
}
