// 该文件是 Mingmu （明目） 项目的一部分。
// src/frame.rs - 模型输入张量定义
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

use image::RgbImage;

pub const RGB_CHANNELS: usize = 3;

pub trait AsNhwcTensor {
  fn as_nhwc(&self) -> &[f32];
}

/// letterbox 之后的归一化 RGB 张量，布局为 NHWC（行优先、通道交错）
#[derive(Debug, Clone, PartialEq)]
pub struct LetterboxTensor {
  side: usize,
  data: Box<[f32]>,
}

impl LetterboxTensor {
  pub fn with_side(side: usize) -> Self {
    let data = vec![0f32; RGB_CHANNELS * side * side].into_boxed_slice();
    Self { side, data }
  }

  pub fn height(&self) -> usize {
    self.side
  }

  pub fn width(&self) -> usize {
    self.side
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 坐标 (x, y) 处的 RGB 三个通道值
  pub fn pixel(&self, x: usize, y: usize) -> Option<&[f32]> {
    if x >= self.side || y >= self.side {
      return None;
    }
    let index = (y * self.side + x) * RGB_CHANNELS;
    Some(&self.data[index..index + RGB_CHANNELS])
  }

  /// 按本机字节序序列化为 f32 字节流，供推理引擎直接读取
  pub fn to_ne_bytes(&self) -> Vec<u8> {
    self.data.iter().flat_map(|v| v.to_ne_bytes()).collect()
  }
}

impl From<&RgbImage> for LetterboxTensor {
  /// 正方形画布按 8 位采样除以 255 归一化
  fn from(canvas: &RgbImage) -> Self {
    debug_assert_eq!(canvas.width(), canvas.height());
    let side = canvas.width() as usize;
    let data = canvas
      .as_raw()
      .iter()
      .map(|&sample| sample as f32 / 255.0)
      .collect::<Vec<_>>()
      .into_boxed_slice();
    Self { side, data }
  }
}

impl AsNhwcTensor for LetterboxTensor {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

impl AsMut<[f32]> for LetterboxTensor {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

#[cfg(test)]
mod tests {
  use image::Rgb;

  use super::*;

  #[test]
  fn normalizes_channel_interleaved() {
    let mut canvas = RgbImage::new(2, 2);
    canvas.put_pixel(1, 0, Rgb([255, 0, 51]));
    let tensor = LetterboxTensor::from(&canvas);

    assert_eq!(tensor.as_nhwc().len(), 2 * 2 * 3);
    assert_eq!(tensor.pixel(0, 0), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(tensor.pixel(1, 0), Some(&[1.0, 0.0, 0.2][..]));
    assert_eq!(&tensor.as_nhwc()[3..6], &[1.0, 0.0, 0.2]);
    assert!(tensor.pixel(2, 0).is_none());
  }

  #[test]
  fn serializes_native_endian() {
    let mut tensor = LetterboxTensor::with_side(1);
    tensor.as_mut()[1] = 0.5;
    let bytes = tensor.to_ne_bytes();

    assert_eq!(bytes.len(), 3 * 4);
    assert_eq!(&bytes[4..8], &0.5f32.to_ne_bytes());
  }
}
