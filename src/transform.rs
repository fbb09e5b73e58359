// 该文件是 Mingmu （明目） 项目的一部分。
// src/transform.rs - 帧坐标变换与显示空间映射
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

use crate::geometry::BoundingBox;

/// 单帧的 letterbox 参数。
///
/// 只对产生它的那一帧有效，随该帧的检测结果一起传递，不做全局共享。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
  pub scale: f32,
  pub x_offset: f32,
  pub y_offset: f32,
  pub source_width: f32,
  pub source_height: f32,
}

/// 显示视口尺寸（像素）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
  pub width: f32,
  pub height: f32,
}

impl Viewport {
  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }
}

impl FrameTransform {
  /// 原始帧坐标 -> 模型（letterbox）坐标
  pub fn to_model_space(&self, bbox: &BoundingBox) -> BoundingBox {
    bbox.map_axes(
      |x| x * self.scale + self.x_offset,
      |y| y * self.scale + self.y_offset,
    )
  }

  /// 模型坐标 -> 原始帧坐标
  pub fn to_source_space(&self, bbox: &BoundingBox) -> BoundingBox {
    bbox.map_axes(
      |x| (x - self.x_offset) / self.scale,
      |y| (y - self.y_offset) / self.scale,
    )
  }

  /// 使用本帧记录的原始尺寸投影到视口
  pub fn project(&self, bbox: &BoundingBox, viewport: Viewport) -> BoundingBox {
    to_display_space(
      bbox,
      self,
      self.source_width,
      self.source_height,
      viewport.width,
      viewport.height,
    )
  }
}

/// 将模型空间的框映射到显示视口。
///
/// 先去掉 letterbox 的偏移与缩放，回到原始帧坐标；再按视口与原始帧的
/// 宽、高之比分别拉伸（各轴独立，不保持宽高比），视口被认为铺满整帧。
/// 纯函数，不修改输入的 `bbox`。
pub fn to_display_space(
  bbox: &BoundingBox,
  transform: &FrameTransform,
  source_width: f32,
  source_height: f32,
  viewport_width: f32,
  viewport_height: f32,
) -> BoundingBox {
  let sx = viewport_width / source_width;
  let sy = viewport_height / source_height;
  transform
    .to_source_space(bbox)
    .map_axes(|x| x * sx, |y| y * sy)
}
