// 该文件是 Mingmu （明目） 项目的一部分。
// src/config.rs - 流水线配置
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

pub const DEFAULT_TARGET_SIZE: u32 = 640;
pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("letterbox 目标尺寸必须大于 0")]
  ZeroTargetSize,
  #[error("置信度阈值超出范围 [0, 1]: {0}")]
  ConfidenceOutOfRange(f32),
  #[error("IoU 阈值超出范围 [0, 1]: {0}")]
  IouOutOfRange(f32),
}

/// 单帧检测流水线的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  /// letterbox 正方形边长（即模型输入尺寸）
  pub target_size: u32,
  /// 目标性与类别分数的最低阈值
  pub conf_threshold: f32,
  /// 重叠超过该比例的低置信度框会被抑制
  pub iou_threshold: f32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      target_size: DEFAULT_TARGET_SIZE,
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
    }
  }
}

impl PipelineConfig {
  pub fn with_target_size(mut self, target_size: u32) -> Self {
    self.target_size = target_size;
    self
  }

  pub fn with_conf_threshold(mut self, conf_threshold: f32) -> Self {
    self.conf_threshold = conf_threshold;
    self
  }

  pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  /// 模型空间的边长，解码时用它把归一化坐标换算成像素
  pub fn input_size(&self) -> f32 {
    self.target_size as f32
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.target_size == 0 {
      return Err(ConfigError::ZeroTargetSize);
    }
    if !(0.0..=1.0).contains(&self.conf_threshold) {
      return Err(ConfigError::ConfidenceOutOfRange(self.conf_threshold));
    }
    if !(0.0..=1.0).contains(&self.iou_threshold) {
      return Err(ConfigError::IouOutOfRange(self.iou_threshold));
    }
    Ok(())
  }
}
