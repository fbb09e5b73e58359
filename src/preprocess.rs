// 该文件是 Mingmu （明目） 项目的一部分。
// src/preprocess.rs - letterbox 预处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Mingmu Contributors

use image::{RgbImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::{frame::LetterboxTensor, transform::FrameTransform};

#[derive(Error, Debug, PartialEq)]
pub enum PreprocessError {
  #[error("输入图像为空: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("letterbox 目标尺寸必须大于 0")]
  ZeroTargetSize,
}

/// 预处理结果，同时保存逆变换需要的几何参数
#[derive(Debug, Clone)]
pub struct PreprocessResult {
  pub tensor: LetterboxTensor,
  pub padded_width: u32,
  pub padded_height: u32,
  /// 左右填充（目标像素）
  pub x_offset: u32,
  /// 上下填充（目标像素）
  pub y_offset: u32,
  /// 原图到目标的统一缩放系数
  pub scale: f32,
  pub source_width: u32,
  pub source_height: u32,
}

impl PreprocessResult {
  pub fn transform(&self) -> FrameTransform {
    FrameTransform {
      scale: self.scale,
      x_offset: self.x_offset as f32,
      y_offset: self.y_offset as f32,
      source_width: self.source_width as f32,
      source_height: self.source_height as f32,
    }
  }
}

/// 等比缩放并居中填充到 `target_size` 见方的黑色画布上，再归一化为张量
pub fn prepare(image: &RgbImage, target_size: u32) -> Result<PreprocessResult, PreprocessError> {
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return Err(PreprocessError::EmptyImage { width, height });
  }
  if target_size == 0 {
    return Err(PreprocessError::ZeroTargetSize);
  }

  let target = target_size as f32;
  let scale = (target / width as f32).min(target / height as f32);
  let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, target_size);
  let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, target_size);

  let x_offset = (target_size - scaled_w) / 2;
  let y_offset = (target_size - scaled_h) / 2;

  debug!(
    "letterbox: {}x{} -> {}x{}, 缩放 {:.4}, 偏移 ({}, {})",
    width, height, scaled_w, scaled_h, scale, x_offset, y_offset
  );

  // RgbImage::new 填充为 0，即黑色边框
  let mut canvas = RgbImage::new(target_size, target_size);
  if (scaled_w, scaled_h) == (width, height) {
    imageops::replace(&mut canvas, image, x_offset as i64, y_offset as i64);
  } else {
    let resized = imageops::resize(image, scaled_w, scaled_h, imageops::FilterType::Triangle);
    imageops::replace(&mut canvas, &resized, x_offset as i64, y_offset as i64);
  }

  Ok(PreprocessResult {
    tensor: LetterboxTensor::from(&canvas),
    padded_width: target_size,
    padded_height: target_size,
    x_offset,
    y_offset,
    scale,
    source_width: width,
    source_height: height,
  })
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;

  #[test]
  fn landscape_frame_pads_top_and_bottom() {
    let image = RgbImage::from_pixel(1280, 720, Rgb([255, 255, 255]));
    let result = prepare(&image, 640).unwrap();

    assert_eq!(result.scale, 0.5);
    assert_eq!(result.x_offset, 0);
    assert_eq!(result.y_offset, 140);
    assert_eq!((result.padded_width, result.padded_height), (640, 640));
    assert_eq!(result.tensor.width(), 640);

    // 边框为黑色，内容区域保持原色
    assert_eq!(result.tensor.pixel(320, 10), Some(&[0.0, 0.0, 0.0][..]));
    let inner = result.tensor.pixel(320, 320).unwrap();
    assert!(inner.iter().all(|&v| v > 0.99));
    assert_eq!(result.tensor.pixel(320, 639), Some(&[0.0, 0.0, 0.0][..]));
  }

  #[test]
  fn portrait_frame_pads_left_and_right() {
    let image = RgbImage::new(480, 640);
    let result = prepare(&image, 640).unwrap();

    assert_eq!(result.scale, 1.0);
    assert_eq!(result.x_offset, 80);
    assert_eq!(result.y_offset, 0);
    assert_eq!(result.x_offset * 2 + 480, 640);
  }

  #[test]
  fn downscales_when_target_is_smaller() {
    for (w, h) in [(1920, 1080), (333, 777), (640, 640), (1001, 17)] {
      let image = RgbImage::new(w, h);
      let result = prepare(&image, 320).unwrap();
      let scaled_w = (w as f32 * result.scale).round() as u32;
      let scaled_h = (h as f32 * result.scale).round() as u32;

      assert!(result.scale <= 1.0);
      assert_eq!(result.tensor.width(), 320);
      assert_eq!(result.tensor.height(), 320);
      assert!(result.x_offset * 2 + scaled_w.max(1) <= 320);
      assert!(320 - (result.x_offset * 2 + scaled_w.max(1)) <= 1);
      assert!(320 - (result.y_offset * 2 + scaled_h.max(1)) <= 1);
    }
  }

  #[test]
  fn upscales_small_frame() {
    let image = RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]));
    let result = prepare(&image, 640).unwrap();

    assert_eq!(result.scale, 10.0);
    assert_eq!(result.x_offset, 0);
    assert_eq!(result.y_offset, 80);
    assert_eq!(result.tensor.width(), 640);

    // 放大后的内容占据 y 方向 [80, 560)
    assert_eq!(result.tensor.pixel(320, 79), Some(&[0.0, 0.0, 0.0][..]));
    assert!(result.tensor.pixel(320, 80).unwrap().iter().all(|&v| v > 0.99));
    assert!(result.tensor.pixel(320, 559).unwrap().iter().all(|&v| v > 0.99));
    assert_eq!(result.tensor.pixel(320, 560), Some(&[0.0, 0.0, 0.0][..]));
  }

  #[test]
  fn transform_carries_source_size() {
    let image = RgbImage::new(1280, 720);
    let transform = prepare(&image, 640).unwrap().transform();

    assert_eq!(transform.source_width, 1280.0);
    assert_eq!(transform.source_height, 720.0);
    assert_eq!(transform.y_offset, 140.0);
  }

  #[test]
  fn rejects_empty_image() {
    let image = RgbImage::new(0, 720);
    assert_eq!(
      prepare(&image, 640).unwrap_err(),
      PreprocessError::EmptyImage {
        width: 0,
        height: 720
      }
    );
    assert_eq!(
      prepare(&RgbImage::new(4, 4), 0).unwrap_err(),
      PreprocessError::ZeroTargetSize
    );
  }
}
