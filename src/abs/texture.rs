//! Structs and functions for handling textures.
//!
//! The module provides the [`Texture`] struct which is a CPU representation of a GPU texture.

use std::sync::Arc;

use glow::HasContext;
use image::{DynamicImage, GenericImageView};

/// Edge length of the generated placeholder texture.
const PLACEHOLDER_SIZE: u32 = 64;
/// Edge length of one placeholder checker cell.
const PLACEHOLDER_CELL: u32 = 8;

/// Builds the RGBA pixels of a magenta/black checkerboard.
pub fn checker_pixels(width: u32, height: u32, cell: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let even = ((x / cell) + (y / cell)).is_multiple_of(2);
            if even {
                data.extend_from_slice(&[255, 0, 255, 255]);
            } else {
                data.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    data
}

/// Represents a texture stored on the GPU side.
pub struct Texture {
    gl: Arc<glow::Context>,
    id: glow::Texture,
}

impl Texture {
    /// Creates a new texture from the given [`image::DynamicImage`].
    pub fn new(gl: &Arc<glow::Context>, image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let data = image.to_rgba8().into_raw();
        Self::new_from_data(gl, width, height, &data)
    }

    /// Creates a new texture from the given raw RGBA data.
    pub fn new_from_data(gl: &Arc<glow::Context>, width: u32, height: u32, data: &[u8]) -> Self {
        unsafe {
            let texture = gl.create_texture().unwrap();
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(data)),
            );
            gl.generate_mipmap(glow::TEXTURE_2D);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            gl.bind_texture(glow::TEXTURE_2D, None);

            Self {
                gl: Arc::clone(gl),
                id: texture,
            }
        }
    }

    /// Creates the checkerboard texture used when an image file cannot be loaded.
    pub fn placeholder(gl: &Arc<glow::Context>) -> Self {
        let data = checker_pixels(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_CELL);
        Self::new_from_data(gl, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, &data)
    }

    /// Binds the texture to the specified texture unit.
    pub fn bind_to_unit(&self, unit: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(self.id));
        }
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_texture(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_pixels_cover_every_texel() {
        let data = checker_pixels(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_CELL);
        assert_eq!(data.len(), (PLACEHOLDER_SIZE * PLACEHOLDER_SIZE * 4) as usize);
    }

    #[test]
    fn checker_pixels_alternate_per_cell() {
        let cell = 2;
        let data = checker_pixels(4, 4, cell);
        // (0, 0) is magenta, (2, 0) is black, (2, 2) is magenta again.
        assert_eq!(&data[0..4], &[255, 0, 255, 255]);
        assert_eq!(&data[(2 * 4)..(2 * 4 + 4)], &[0, 0, 0, 255]);
        let idx = ((2 * 4 + 2) * 4) as usize;
        assert_eq!(&data[idx..idx + 4], &[255, 0, 255, 255]);
    }
}
