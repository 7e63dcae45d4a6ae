//! Vertex transform and per-pixel Phong lighting

use crate::config::LightingConfig;
use nalgebra::{Matrix4, Vector3, Vector4};

/// Attributes carried by each vertex through the pipeline
///
/// `position` is object space on input, clip space after [`ShaderProgram::vertex`]
/// and screen space once the rasterizer has applied the viewport.
/// `world_position` stays in world space for lighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexAttributes {
    pub position: Vector4<f32>,
    pub world_position: Vector4<f32>,
    pub color: Vector4<f32>,
    pub normal: Vector4<f32>,
}

impl VertexAttributes {
    pub fn new(position: Vector3<f32>, normal: Vector3<f32>, color: Vector4<f32>) -> Self {
        let position = position.push(1.0);
        Self {
            position,
            world_position: position,
            color,
            normal: normal.push(0.0),
        }
    }

    /// Linear interpolation of every attribute
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: self.position.lerp(&other.position, t),
            world_position: self.world_position.lerp(&other.world_position, t),
            color: self.color.lerp(&other.color, t),
            normal: self.normal.lerp(&other.normal, t),
        }
    }
}

/// Transform matrices plus lighting coefficients shared by both shader stages
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram {
    pub world: Matrix4<f32>,
    pub view: Matrix4<f32>,
    pub projection: Matrix4<f32>,

    /// Unit vector from the surface toward the light
    pub light_direction: Vector3<f32>,
    pub view_position: Vector3<f32>,

    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
    pub shininess: f32,
}

impl Default for ShaderProgram {
    fn default() -> Self {
        Self::from_lighting(&LightingConfig::default())
    }
}

impl ShaderProgram {
    /// Identity transforms with the given lighting
    pub fn from_lighting(lighting: &LightingConfig) -> Self {
        let light_direction = lighting.light_direction();
        Self {
            world: Matrix4::identity(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
            light_direction: light_direction
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::z),
            view_position: lighting.view_position(),
            ambient: Vector3::from(lighting.ambient),
            diffuse: Vector3::from(lighting.diffuse),
            specular: Vector3::from(lighting.specular),
            shininess: lighting.shininess,
        }
    }

    /// Object space to clip space. Perspective division and viewport mapping
    /// are left to the caller.
    pub fn vertex(&self, input: &VertexAttributes) -> VertexAttributes {
        let world_position = self.world * input.position;
        VertexAttributes {
            position: self.projection * self.view * world_position,
            world_position,
            color: input.color,
            normal: self.world * input.normal,
        }
    }

    /// Phong reflection: `(ambient + diffuse + specular) * color`, alpha 1
    pub fn fragment(&self, input: &VertexAttributes) -> Vector4<f32> {
        let normal = input.normal.xyz().try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros);
        let view_direction = (self.view_position - input.world_position.xyz())
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros);

        let ambient = self.ambient;

        let diffuse_light = normal.dot(&self.light_direction).max(0.0);
        let diffuse = self.diffuse * diffuse_light;

        let reflect_direction = reflect(&-self.light_direction, &normal);
        let specular_light = view_direction.dot(&reflect_direction).max(0.0).powf(self.shininess);
        let specular = self.specular * specular_light;

        let color = (ambient + diffuse + specular).component_mul(&input.color.xyz());
        color.push(1.0)
    }
}

/// Reflect a vector around a normal
fn reflect(v: &Vector3<f32>, n: &Vector3<f32>) -> Vector3<f32> {
    *v - 2.0 * v.dot(n) * *n
}
