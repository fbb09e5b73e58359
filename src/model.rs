// 该文件是 Mingmu （明目） 项目的一部分。
// src/model.rs - 模型接口与检测结果
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

use thiserror::Error;

use crate::geometry::BoundingBox;

/// 推理引擎。引擎本身（模型加载、加速器调度）由外部实现。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 输出的类别数，引擎无法提前给出时返回 None
  fn num_classes(&self) -> Option<usize> {
    None
  }
}

impl<M: Model + ?Sized> Model for Box<M> {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }

  fn num_classes(&self) -> Option<usize> {
    (**self).num_classes()
  }
}

/// 每行 [x, y, w, h, objectness, class_0 .. class_{C-1}] 之前的固定列数
pub const BOX_COLUMNS: usize = 5;

#[derive(Error, Debug, PartialEq)]
pub enum RawOutputError {
  #[error("列数必须大于 5, 实际为 {0}")]
  TooFewColumns(usize),
  #[error("数据长度 {len} 不是列数 {columns} 的整数倍")]
  RaggedData { len: usize, columns: usize },
}

/// 检测器原始输出，形状为 [N, 5 + C]，行优先
#[derive(Debug, Clone, PartialEq)]
pub struct RawOutput {
  columns: usize,
  data: Box<[f32]>,
}

impl RawOutput {
  pub fn new(data: Vec<f32>, columns: usize) -> Result<Self, RawOutputError> {
    if columns <= BOX_COLUMNS {
      return Err(RawOutputError::TooFewColumns(columns));
    }
    if data.len() % columns != 0 {
      return Err(RawOutputError::RaggedData {
        len: data.len(),
        columns,
      });
    }
    Ok(Self {
      columns,
      data: data.into_boxed_slice(),
    })
  }

  pub fn rows(&self) -> usize {
    self.data.len() / self.columns
  }

  pub fn columns(&self) -> usize {
    self.columns
  }

  pub fn num_classes(&self) -> usize {
    self.columns - BOX_COLUMNS
  }

  pub fn row(&self, index: usize) -> Option<&[f32]> {
    let start = index.checked_mul(self.columns)?;
    self.data.get(start..start + self.columns)
  }

  pub fn iter_rows(&self) -> std::slice::ChunksExact<'_, f32> {
    self.data.chunks_exact(self.columns)
  }
}

/// 目标相对用户的方位，由外部子系统填写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Left,
  Center,
  Right,
}

impl Direction {
  pub fn as_str(&self) -> &'static str {
    match self {
      Direction::Left => "left",
      Direction::Center => "center",
      Direction::Right => "right",
    }
  }
}

/// 单个检测结果，`bbox` 位于模型（letterbox 像素）空间
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub label: String,
  pub class_id: usize,
  pub confidence: f32,
  pub bbox: BoundingBox,
  /// 距离（米），由深度子系统填写，本库只负责透传
  pub distance: f32,
  pub direction: Option<Direction>,
}

impl Detection {
  pub fn with_distance(self, distance: f32) -> Self {
    Self { distance, ..self }
  }

  pub fn with_direction(self, direction: Direction) -> Self {
    Self {
      direction: Some(direction),
      ..self
    }
  }
}

mod decode;
mod labels;
mod nms;
#[cfg(feature = "model_replay")]
mod replay;

pub use self::decode::{DecodeError, Decoder};
pub use self::labels::{LabelError, LabelTable};
pub use self::nms::suppress;
#[cfg(feature = "model_replay")]
pub use self::replay::{ReplayModel, ReplayModelError};
