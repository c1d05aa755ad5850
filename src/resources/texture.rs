use anyhow::{Context, ensure};
use image::{DynamicImage, ImageBuffer, Pixel};

use crate::render::{PixelFormat, SampleType, TextureUpload};

/// Layout of the texture group of the scene program: one filterable 2D
/// texture and its sampler.
pub fn texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("texture_bind_group_layout"),
    })
}

/// Layout of the parameter group: the uniform block, visible to both stages.
pub fn parameter_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("parameter_bind_group_layout"),
    })
}

/// Convert decoded pixels of any supported layout into RGBA8.
///
/// Single channel images become grey, two channel images grey with alpha.
/// 16 bit samples are read in native byte order.
pub fn to_rgba8(upload: &TextureUpload<'_>) -> anyhow::Result<image::RgbaImage> {
    let (width, height) = (upload.width, upload.height);
    let expected = width as usize
        * height as usize
        * upload.format.channels()
        * upload.sample_type.size();
    ensure!(
        upload.pixels.len() == expected,
        "a {}x{} {:?} image with {:?} samples needs {} bytes but has {}",
        width,
        height,
        upload.format,
        upload.sample_type,
        expected,
        upload.pixels.len()
    );

    let image = match upload.sample_type {
        SampleType::U8 => {
            let samples = upload.pixels.to_vec();
            match upload.format {
                PixelFormat::R => DynamicImage::ImageLuma8(buffer(width, height, samples)?),
                PixelFormat::Rg => DynamicImage::ImageLumaA8(buffer(width, height, samples)?),
                PixelFormat::Rgb => DynamicImage::ImageRgb8(buffer(width, height, samples)?),
                PixelFormat::Rgba => DynamicImage::ImageRgba8(buffer(width, height, samples)?),
            }
        }
        SampleType::U16 => {
            let samples: Vec<u16> = upload
                .pixels
                .chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            match upload.format {
                PixelFormat::R => DynamicImage::ImageLuma16(buffer(width, height, samples)?),
                PixelFormat::Rg => DynamicImage::ImageLumaA16(buffer(width, height, samples)?),
                PixelFormat::Rgb => DynamicImage::ImageRgb16(buffer(width, height, samples)?),
                PixelFormat::Rgba => DynamicImage::ImageRgba16(buffer(width, height, samples)?),
            }
        }
    };
    Ok(image.to_rgba8())
}

fn buffer<P: Pixel>(
    width: u32,
    height: u32,
    samples: Vec<P::Subpixel>,
) -> anyhow::Result<ImageBuffer<P, Vec<P::Subpixel>>> {
    ImageBuffer::from_raw(width, height, samples)
        .with_context(|| format!("pixel data does not fill a {}x{} image", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(format: PixelFormat, sample_type: SampleType, pixels: &[u8]) -> TextureUpload<'_> {
        TextureUpload {
            width: 2,
            height: 1,
            format,
            sample_type,
            pixels,
        }
    }

    #[test]
    fn grey_pixels_expand_to_opaque_rgba() {
        let rgba = to_rgba8(&upload(PixelFormat::R, SampleType::U8, &[0, 200])).unwrap();
        assert_eq!(rgba.as_raw(), &vec![0, 0, 0, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn rgb_gains_an_opaque_alpha_channel() {
        let rgba = to_rgba8(&upload(PixelFormat::Rgb, SampleType::U8, &[1, 2, 3, 4, 5, 6])).unwrap();
        assert_eq!(rgba.as_raw(), &vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn sixteen_bit_samples_are_scaled_down() {
        let mut pixels = Vec::new();
        for sample in [u16::MAX, 0, 0, u16::MAX, 0, u16::MAX, 0, u16::MAX] {
            pixels.extend_from_slice(&sample.to_ne_bytes());
        }
        let rgba = to_rgba8(&upload(PixelFormat::Rgba, SampleType::U16, &pixels)).unwrap();
        assert_eq!(rgba.as_raw(), &vec![255, 0, 0, 255, 0, 255, 0, 255]);
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        let error = to_rgba8(&upload(PixelFormat::Rgba, SampleType::U8, &[0; 7])).unwrap_err();
        assert!(error.to_string().contains("needs 8 bytes but has 7"));
    }
}
