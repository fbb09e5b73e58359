// 该文件是 Mingmu （明目） 项目的一部分。
// src/model/decode.rs - 原始输出解码
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
use tracing::debug;

use crate::{
  geometry::BoundingBox,
  model::{BOX_COLUMNS, Detection, LabelTable, RawOutput},
};

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("输出类别数 {output} 与标签数 {labels} 不一致")]
  ShapeMismatch { output: usize, labels: usize },
}

/// 把 [N, 5 + C] 的输出解码为模型空间的候选框
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
  labels: &'a LabelTable,
  conf_threshold: f32,
  input_size: f32,
}

impl<'a> Decoder<'a> {
  pub fn new(labels: &'a LabelTable, conf_threshold: f32, input_size: f32) -> Self {
    Self {
      labels,
      conf_threshold,
      input_size,
    }
  }

  /// 按行顺序输出，不排序。
  ///
  /// 一行需要同时通过两道阈值：目标性 `row[4] >= conf`，以及最高类别分数
  /// `> conf`。类别分数相同时取下标最小者。
  pub fn decode(&self, output: &RawOutput) -> Result<Vec<Detection>, DecodeError> {
    let num_classes = output.num_classes();
    if num_classes != self.labels.len() {
      return Err(DecodeError::ShapeMismatch {
        output: num_classes,
        labels: self.labels.len(),
      });
    }

    let mut detections = Vec::new();
    for row in output.iter_rows() {
      let objectness = row[4];
      if objectness < self.conf_threshold {
        continue;
      }

      let (class_id, score) = best_class(&row[BOX_COLUMNS..]);
      if score <= self.conf_threshold {
        continue;
      }

      // 归一化中心框 -> 模型像素角点
      let bbox = BoundingBox::from_center(
        row[0] * self.input_size,
        row[1] * self.input_size,
        row[2] * self.input_size,
        row[3] * self.input_size,
      );

      // 标签表已与类别数对齐，越界不会发生
      let Some(label) = self.labels.get(class_id) else {
        continue;
      };

      detections.push(Detection {
        label: label.to_string(),
        class_id,
        confidence: score,
        bbox,
        distance: 0.0,
        direction: None,
      });
    }

    debug!(
      "解码 {} 行, {} 个候选框通过阈值 {}",
      output.rows(),
      detections.len(),
      self.conf_threshold
    );
    Ok(detections)
  }
}

/// 取最大分数及其下标，相同分数保留先出现者
fn best_class(scores: &[f32]) -> (usize, f32) {
  let mut best_id = 0usize;
  let mut best_score = f32::MIN;
  for (id, &score) in scores.iter().enumerate() {
    if score > best_score {
      best_score = score;
      best_id = id;
    }
  }
  (best_id, best_score)
}
