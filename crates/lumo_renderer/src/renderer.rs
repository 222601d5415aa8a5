//! Row-by-row render driver.
//!
//! Every pixel is sampled at `subpixel_num` jittered positions with
//! `sample_num` paths each. The averaged radiance is tone mapped with
//! [`expose`] and the finished row is published to a [`FrameBuffer`], so a
//! partially rendered image can be copied out at any time.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lumo_core::{Environment, Scene};
use lumo_math::{Camera, Ray, Vec3, Viewport};
use rayon::prelude::*;

use crate::bvh::Bvh;
use crate::integrator::Integrator;
use crate::sampler::{concentric_sample_disk, Sampler, SamplerTables};
use crate::{RenderError, RenderResult, RenderSettings};

/// Bytes per pixel of the output (RGB8).
pub const CHANNELS: usize = 3;

/// Tone map a linear value: `1 - exp(light * exposure)`.
///
/// `exposure` is negative, so non-negative light maps into `[0, 1]`; very
/// bright values round to exactly 1 in f32.
#[inline]
pub fn expose(light: f32, exposure: f32) -> f32 {
    1.0 - (light * exposure).exp()
}

/// Tone map a color to 8-bit RGB.
pub fn to_rgb8(color: Vec3, exposure: f32) -> [u8; 3] {
    color
        .to_array()
        .map(|c| (expose(c, exposure) * 255.0) as u8)
}

/// Everything one render reads, fixed before the first ray is traced.
pub struct RenderInfo {
    pub width: u32,
    pub height: u32,
    pub viewport: Viewport,
    pub camera: Camera,
    pub environment: Arc<Environment>,
    pub settings: RenderSettings,
    bvh: Bvh,
    tables: SamplerTables,
}

impl RenderInfo {
    /// Validate the settings, then build the BVH and sampler tables.
    pub fn new(scene: &Scene, width: u32, height: u32, settings: RenderSettings) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSettings(format!(
                "image size {}x{} is empty",
                width, height
            )));
        }
        settings.validate()?;

        let bvh = Bvh::build(scene.model.clone());
        let tables = SamplerTables::new(settings.sampler, settings.prime_bound);

        Ok(Self {
            width,
            height,
            viewport: Viewport::new(width, height),
            camera: scene.camera,
            environment: scene.environment.clone(),
            settings,
            bvh,
            tables,
        })
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn tables(&self) -> &SamplerTables {
        &self.tables
    }

    /// First sampler dimension read by the thin lens.
    pub fn lens_dimension(&self) -> usize {
        self.integrator().bounce_dimensions()
    }

    /// First dimension of the sub-pixel jitter, past the bounce and lens
    /// dimensions so the jitter never repeats a path sample.
    pub fn jitter_dimension(&self) -> usize {
        self.lens_dimension() + 2
    }

    pub fn integrator(&self) -> Integrator<'_> {
        Integrator::new(&self.bvh, &self.environment, self.settings.recursive_depth)
    }

    /// Size in bytes of the RGB8 image.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }
}

/// RGB8 image shared between the render thread and its observers.
///
/// Rows are published whole under the lock; unrendered rows stay white.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Mutex<Vec<u8>>,
    rows_done: AtomicU32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * CHANNELS;
        Self {
            width,
            height,
            pixels: Mutex::new(vec![255; len]),
            rows_done: AtomicU32::new(0),
        }
    }

    /// Wrap existing pixel storage.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if pixels.len() != expected {
            return Err(RenderError::FrameSize {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: Mutex::new(pixels),
            rows_done: AtomicU32::new(0),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows published so far.
    pub fn rows_completed(&self) -> u32 {
        self.rows_done.load(Ordering::Acquire)
    }

    /// Copy of the current image.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_row(&self, y: u32, row: &[u8]) {
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        {
            let mut pixels = self.lock();
            pixels[start..start + stride].copy_from_slice(row);
        }
        self.rows_done.fetch_add(1, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.pixels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Summary of a finished render.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderStats {
    pub rows: u32,
    pub samples: u64,
    pub elapsed: Duration,
}

/// Render every row of `info` into `frame`, top row first.
///
/// `cancel` is checked before each row; a set flag stops the render with
/// [`RenderError::Cancelled`], leaving the rows done so far in place.
pub fn render(info: &RenderInfo, frame: &FrameBuffer, cancel: &AtomicBool) -> RenderResult<RenderStats> {
    let expected = info.frame_len();
    if frame.width() != info.width || frame.height() != info.height || frame.len() != expected {
        return Err(RenderError::FrameSize {
            expected,
            actual: frame.len(),
        });
    }

    let settings = &info.settings;
    log::info!(
        "Rendering {}x{}: {} subpixels x {} samples, depth {}, {:?} sampler{}{}",
        info.width,
        info.height,
        settings.subpixel_num,
        settings.sample_num,
        settings.recursive_depth,
        settings.sampler,
        if settings.lens_radius > 0.0 { ", depth of field" } else { "" },
        if settings.parallel { ", parallel" } else { "" },
    );

    let start = Instant::now();
    let progress_step = (info.height / 10).max(1);
    let mut row = vec![0u8; info.width as usize * CHANNELS];

    for y in 0..info.height {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Render cancelled after {} rows", y);
            return Err(RenderError::Cancelled);
        }

        let colors: Vec<Vec3> = if settings.parallel {
            (0..info.width)
                .into_par_iter()
                .map(|x| render_pixel(info, x, y))
                .collect()
        } else {
            (0..info.width).map(|x| render_pixel(info, x, y)).collect()
        };

        for (dst, color) in row.chunks_exact_mut(CHANNELS).zip(&colors) {
            dst.copy_from_slice(&to_rgb8(*color, settings.exposure));
        }
        frame.write_row(y, &row);

        if (y + 1) % progress_step == 0 {
            log::debug!("Rendered {}/{} rows", y + 1, info.height);
        }
    }

    let stats = RenderStats {
        rows: info.height,
        samples: info.width as u64 * info.height as u64 * settings.samples_per_pixel(),
        elapsed: start.elapsed(),
    };
    log::info!(
        "Rendered {} rows, {} samples in {:.2?}",
        stats.rows,
        stats.samples,
        stats.elapsed
    );
    Ok(stats)
}

/// Average radiance of image pixel `(x, y)`; row 0 is the top of the image.
pub fn render_pixel(info: &RenderInfo, x: u32, y: u32) -> Vec3 {
    let settings = &info.settings;
    let integrator = info.integrator();
    let lens_dimension = info.lens_dimension();
    let jitter_dimension = info.jitter_dimension();
    let depth_of_field = settings.lens_radius > 0.0;

    let subpixels = settings.subpixel_num as u64;
    let samples = settings.sample_num as u64;
    let pixel_index = y as u64 * info.width as u64 + x as u64;

    let mut jitter = info.tables().halton();
    let mut sampler = info.tables().sampler(settings.sampler);
    let mut sum = Vec3::ZERO;

    for i in 0..subpixels {
        let subpixel = pixel_index * subpixels + i;
        jitter.start(subpixel);
        let offset = jitter.sample_2d(jitter_dimension);

        // Window space grows upward from the bottom row
        let wx = x as f32 + offset.x - 0.5;
        let wy = (info.height - 1 - y) as f32 + offset.y - 0.5;
        let near = info.camera.screen_to_world(Vec3::new(wx, wy, 0.0), &info.viewport);
        let far = info.camera.screen_to_world(Vec3::new(wx, wy, 1.0), &info.viewport);
        let dir = (far - near).normalize();

        let focus = depth_of_field.then(|| {
            let t = (settings.focal_distance / dir.dot(info.camera.forward())).abs();
            near + dir * t
        });

        for s in 0..samples {
            sampler.start(subpixel * samples + s);

            let ray = match focus {
                Some(focus) => {
                    let lens = concentric_sample_disk(
                        sampler.sample(lens_dimension),
                        sampler.sample(lens_dimension + 1),
                    ) * settings.lens_radius;
                    let origin = near + info.camera.right() * lens.x + info.camera.up() * lens.y;
                    Ray::new(origin, (focus - origin).normalize())
                }
                None => Ray::new(near, dir),
            };

            sum += integrator.radiance(&ray, 0, false, &mut sampler);
        }
    }

    sum / (subpixels * samples) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumo_core::{Material, Mesh, Model};
    use crate::sampler::SamplerKind;

    const EMISSIVE: Vec3 = Vec3::new(0.01, 0.005, 0.002);

    /// Quad in the z = 0 plane with half-size `size`, facing +Z.
    fn quad(name: &str, size: f32, z: f32, material: usize) -> Mesh {
        Mesh::new(
            name,
            vec![
                Vec3::new(-size, -size, z),
                Vec3::new(size, -size, z),
                Vec3::new(size, size, z),
                Vec3::new(-size, size, z),
            ],
            vec![0, 1, 2, 0, 2, 3],
            None,
            None,
            material,
        )
        .unwrap()
    }

    fn camera() -> Camera {
        Camera::look_at(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y, 45f32.to_radians(), 0.1, 100.0)
    }

    /// A single emitter that fills the whole view.
    fn emitter_scene() -> Scene {
        let mut model = Model::new();
        let mat = model.add_material(Material::emissive(EMISSIVE));
        model.add_mesh(quad("light", 20.0, 0.0, mat)).unwrap();
        Scene::new(model, camera(), Environment::uniform(Vec3::ZERO))
    }

    /// Diffuse floor, small emitter and a mirror under a sky.
    fn lit_scene() -> Scene {
        let mut model = Model::new();
        let floor = model.add_material(Material::diffuse(Vec3::splat(0.6)));
        let light = model.add_material(Material::emissive(Vec3::splat(0.02)));
        let glass = model.add_material(Material::glass(Vec3::splat(0.9), 1.5));
        model.add_mesh(quad("floor", 3.0, -1.0, floor)).unwrap();
        model.add_mesh(quad("light", 0.3, 0.5, light)).unwrap();
        model.add_mesh(quad("pane", 0.6, 1.0, glass)).unwrap();
        Scene::new(model, camera(), Environment::uniform(Vec3::new(0.3, 0.4, 0.5)))
    }

    fn settings(subpixel_num: u32, sample_num: u32, recursive_depth: u32) -> RenderSettings {
        RenderSettings {
            subpixel_num,
            sample_num,
            recursive_depth,
            parallel: false,
            ..Default::default()
        }
    }

    fn render_bytes(info: &RenderInfo) -> Vec<u8> {
        let frame = FrameBuffer::new(info.width, info.height);
        render(info, &frame, &AtomicBool::new(false)).unwrap();
        frame.into_pixels()
    }

    #[test]
    fn test_expose_zero_is_black() {
        assert_eq!(expose(0.0, -1.0), 0.0);
        assert_eq!(expose(0.0, -7.5), 0.0);
        assert_eq!(to_rgb8(Vec3::ZERO, -2.0), [0, 0, 0]);
    }

    #[test]
    fn test_expose_monotonic() {
        for exposure in [-0.1, -1.0, -4.0] {
            let mut previous = expose(0.0, exposure);
            for i in 1..200 {
                let light = i as f32 * 0.05;
                let value = expose(light, exposure);
                assert!(value >= previous);
                assert!(value <= 1.0);
                if light * -exposure < 15.0 {
                    assert!(value < 1.0);
                }
                previous = value;
            }
        }
    }

    #[test]
    fn test_expose_saturates_bright_light() {
        assert_eq!(expose(9.95, -4.0), 1.0);
        assert_eq!(to_rgb8(Vec3::splat(1000.0), -1.0), [255, 255, 255]);
    }

    #[test]
    fn test_emitter_fills_frame() {
        let _ = env_logger::builder().is_test(true).try_init();
        let info = RenderInfo::new(&emitter_scene(), 4, 4, settings(1, 1, 0)).unwrap();
        let bytes = render_bytes(&info);

        let expected = to_rgb8(EMISSIVE * crate::integrator::EMISSIVE_SCALE, info.settings.exposure);
        assert_eq!(bytes.len(), 4 * 4 * 3);
        for pixel in bytes.chunks_exact(3) {
            assert_eq!(pixel, expected);
        }
    }

    #[test]
    fn test_jitter_independent_of_first_bounce() {
        let s = RenderSettings {
            sampler: SamplerKind::Halton,
            ..settings(1, 1, 0)
        };
        let info = RenderInfo::new(&emitter_scene(), 4, 4, s).unwrap();
        assert_eq!(info.lens_dimension(), 2);
        assert_eq!(info.jitter_dimension(), 4);

        // With one sample per sub-pixel both streams share the draw index
        let mut jitter = info.tables().halton();
        let mut path = info.tables().sampler(SamplerKind::Halton);
        let mut same = 0;
        for index in 1..64 {
            jitter.start(index);
            path.start(index);
            if jitter.sample(info.jitter_dimension()) == path.sample(0) {
                same += 1;
            }
        }
        assert_eq!(same, 0);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let scene = lit_scene();
        let serial = RenderInfo::new(&scene, 12, 8, settings(2, 2, 3)).unwrap();
        let parallel = RenderInfo::new(
            &scene,
            12,
            8,
            RenderSettings {
                parallel: true,
                ..settings(2, 2, 3)
            },
        )
        .unwrap();
        assert_eq!(render_bytes(&serial), render_bytes(&parallel));
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = lit_scene();
        for sampler in [SamplerKind::Halton, SamplerKind::ScrambledHalton, SamplerKind::Qmc] {
            let s = RenderSettings {
                sampler,
                prime_bound: 10_000,
                ..settings(1, 2, 2)
            };
            let a = RenderInfo::new(&scene, 6, 5, s.clone()).unwrap();
            let b = RenderInfo::new(&scene, 6, 5, s).unwrap();
            assert_eq!(render_bytes(&a), render_bytes(&b));
        }
    }

    #[test]
    fn test_depth_of_field_on_uniform_emitter() {
        // Every lens ray still lands on the emitter, so the image is unchanged
        let s = RenderSettings {
            lens_radius: 0.2,
            focal_distance: 3.0,
            ..settings(2, 3, 0)
        };
        let info = RenderInfo::new(&emitter_scene(), 5, 4, s).unwrap();
        let expected = to_rgb8(EMISSIVE * crate::integrator::EMISSIVE_SCALE, info.settings.exposure);
        for pixel in render_bytes(&info).chunks_exact(3) {
            assert_eq!(pixel, expected);
        }
    }

    #[test]
    fn test_cancelled_render_keeps_white_frame() {
        let info = RenderInfo::new(&emitter_scene(), 4, 4, settings(1, 1, 0)).unwrap();
        let frame = FrameBuffer::new(4, 4);
        let result = render(&info, &frame, &AtomicBool::new(true));
        assert!(matches!(result, Err(RenderError::Cancelled)));
        assert_eq!(frame.rows_completed(), 0);
        assert!(frame.snapshot().iter().all(|&b| b == 255));
    }

    #[test]
    fn test_frame_size_mismatch() {
        let info = RenderInfo::new(&emitter_scene(), 4, 4, settings(1, 1, 0)).unwrap();
        let frame = FrameBuffer::new(4, 3);
        assert!(matches!(
            render(&info, &frame, &AtomicBool::new(false)),
            Err(RenderError::FrameSize { expected: 48, actual: 36 })
        ));
        assert!(matches!(
            FrameBuffer::from_pixels(2, 2, vec![0; 5]),
            Err(RenderError::FrameSize { expected: 12, actual: 5 })
        ));
    }

    #[test]
    fn test_invalid_render_info() {
        let scene = emitter_scene();
        assert!(matches!(
            RenderInfo::new(&scene, 0, 4, RenderSettings::default()),
            Err(RenderError::InvalidSettings(_))
        ));
        assert!(RenderInfo::new(&scene, 4, 4, settings(0, 1, 0)).is_err());
    }

    #[test]
    fn test_stats_count_samples() {
        let info = RenderInfo::new(&emitter_scene(), 3, 2, settings(2, 3, 0)).unwrap();
        let frame = FrameBuffer::new(3, 2);
        let stats = render(&info, &frame, &AtomicBool::new(false)).unwrap();
        assert_eq!(stats.rows, 2);
        assert_eq!(stats.samples, 3 * 2 * 6);
        assert_eq!(frame.rows_completed(), 2);
    }
}
