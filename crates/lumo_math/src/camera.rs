use glam::{Mat4, Quat, Vec3, Vec4};

/// Window-space rectangle the image is projected into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Viewport covering a `width x height` image starting at the origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

/// Perspective camera.
///
/// `rotation` orients the camera in the world: the camera looks down its
/// local -Z axis with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Quat,
    /// Vertical field of view in radians (for landscape viewports)
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Vec3, rotation: Quat, fov_y: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            rotation,
            fov_y,
            near,
            far,
        }
    }

    /// Camera at `position` looking at `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, fov_y: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(position, target, up);
        let rotation = Quat::from_mat4(&view.inverse()).normalize();
        Self::new(position, rotation, fov_y, near, far)
    }

    /// Viewing direction in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Field of view actually used for the given aspect ratio.
    ///
    /// Portrait viewports keep the horizontal extent of `fov_y` so that the
    /// picture does not get cropped at the sides.
    pub fn effective_fov_y(&self, aspect: f32) -> f32 {
        if aspect < 1.0 {
            2.0 * ((self.fov_y * 0.5).tan() / aspect).atan()
        } else {
            self.fov_y
        }
    }

    /// Get the view matrix (world → camera space)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_quat(self.rotation.inverse()) * Mat4::from_translation(-self.position)
    }

    /// Get the projection matrix (camera → clip space)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.effective_fov_y(aspect), aspect, self.near, self.far)
    }

    /// Get the combined view-projection matrix
    pub fn view_projection_matrix(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Unproject a window-space point back into the world.
    ///
    /// `screen.x`/`screen.y` are window coordinates with y growing upward and
    /// `screen.z` is the depth in `[0, 1]` (0 = near plane, 1 = far plane).
    pub fn screen_to_world(&self, screen: Vec3, viewport: &Viewport) -> Vec3 {
        let inverse = self.view_projection_matrix(viewport.aspect()).inverse();
        let ndc = Vec4::new(
            (screen.x - viewport.x) / viewport.width * 2.0 - 1.0,
            (screen.y - viewport.y) / viewport.height * 2.0 - 1.0,
            screen.z * 2.0 - 1.0,
            1.0,
        );
        let world = inverse * ndc;
        world.truncate() / world.w
    }
}
