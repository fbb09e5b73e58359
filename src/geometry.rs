// 该文件是 Mingmu （明目） 项目的一部分。
// src/geometry.rs - 边界框与重叠度计算
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

/// 轴对齐矩形，坐标为 [left, top, right, bottom]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub left: f32,
  pub top: f32,
  pub right: f32,
  pub bottom: f32,
}

impl BoundingBox {
  pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  /// 由中心点与宽高构造
  pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
    Self {
      left: cx - width / 2.0,
      top: cy - height / 2.0,
      right: cx + width / 2.0,
      bottom: cy + height / 2.0,
    }
  }

  pub fn width(&self) -> f32 {
    self.right - self.left
  }

  pub fn height(&self) -> f32 {
    self.bottom - self.top
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn center_x(&self) -> f32 {
    (self.left + self.right) / 2.0
  }

  /// 对四条边分别做变换，x 轴与 y 轴各用一个函数
  pub fn map_axes(&self, fx: impl Fn(f32) -> f32, fy: impl Fn(f32) -> f32) -> Self {
    Self {
      left: fx(self.left),
      top: fy(self.top),
      right: fx(self.right),
      bottom: fy(self.bottom),
    }
  }

  pub fn intersection(&self, other: &BoundingBox) -> f32 {
    let w = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
    let h = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
    w * h
  }

  /// 交并比；并集面积为 0（退化框）时返回 0
  pub fn iou(&self, other: &BoundingBox) -> f32 {
    let intersection = self.intersection(other);
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }
}

impl From<[f32; 4]> for BoundingBox {
  fn from(bbox: [f32; 4]) -> Self {
    Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
  }
}

impl From<BoundingBox> for [f32; 4] {
  fn from(bbox: BoundingBox) -> Self {
    [bbox.left, bbox.top, bbox.right, bbox.bottom]
  }
}
