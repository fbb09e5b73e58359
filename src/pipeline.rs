// 该文件是 Mingmu （明目） 项目的一部分。
// src/pipeline.rs - 单帧检测流水线
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

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  config::{ConfigError, PipelineConfig},
  frame::LetterboxTensor,
  geometry::BoundingBox,
  model::{DecodeError, Decoder, Detection, LabelError, LabelTable, Model, RawOutput, suppress},
  preprocess::{PreprocessError, prepare},
  transform::{FrameTransform, Viewport},
};

mod worker;
pub use self::worker::{DetectionWorker, FrameOffer};

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("标签错误: {0}")]
  Labels(#[from] LabelError),
  #[error("预处理错误: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("推理错误: {0}")]
  Inference(Box<dyn std::error::Error + Send + Sync>),
  #[error("解码错误: {0}")]
  Decode(#[from] DecodeError),
}

/// 一帧的检测结果及其 letterbox 参数，发布后不可变
#[derive(Debug, Clone)]
pub struct DetectionSet {
  pub frame_index: u64,
  /// 帧交给流水线的时间，而不是开始处理的时间
  pub captured_at: DateTime<Utc>,
  pub transform: FrameTransform,
  pub detections: Box<[Detection]>,
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.detections.iter()
  }

  /// 用本帧自己的变换参数把每个检测框投影到视口
  pub fn project(
    &self,
    viewport: Viewport,
  ) -> impl Iterator<Item = (&Detection, BoundingBox)> + '_ {
    self
      .detections
      .iter()
      .map(move |det| (det, self.transform.project(&det.bbox, viewport)))
  }
}

/// 预处理 -> 推理 -> 解码 -> NMS，同步执行
pub struct Pipeline<M> {
  model: M,
  labels: Arc<LabelTable>,
  config: PipelineConfig,
}

impl<M> Pipeline<M>
where
  M: Model<Input = LetterboxTensor, Output = RawOutput>,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  pub fn new(model: M, labels: Arc<LabelTable>, config: PipelineConfig) -> Result<Self, PipelineError> {
    config.validate()?;
    if let Some(classes) = model.num_classes() {
      labels.validate_class_count(classes)?;
    }
    info!(
      "流水线配置: 目标尺寸 {}, 置信度阈值 {}, NMS 阈值 {}, 类别数 {}",
      config.target_size,
      config.conf_threshold,
      config.iou_threshold,
      labels.len()
    );
    Ok(Self {
      model,
      labels,
      config,
    })
  }

  pub fn run_frame(&self, frame_index: u64, image: &RgbImage) -> Result<DetectionSet, PipelineError> {
    self.run_frame_at(frame_index, Utc::now(), image)
  }

  /// 同 [`Pipeline::run_frame`]，采集时间由调用方给出（例如帧在队列中等待过）
  pub fn run_frame_at(
    &self,
    frame_index: u64,
    captured_at: DateTime<Utc>,
    image: &RgbImage,
  ) -> Result<DetectionSet, PipelineError> {
    let prepared = prepare(image, self.config.target_size)?;
    let transform = prepared.transform();

    let output = self
      .model
      .infer(&prepared.tensor)
      .map_err(|e| PipelineError::Inference(Box::new(e)))?;

    let decoder = Decoder::new(
      &self.labels,
      self.config.conf_threshold,
      self.config.input_size(),
    );
    let candidates = decoder.decode(&output)?;
    let detections = suppress(candidates, self.config.iou_threshold);
    debug!("帧 {}: 检测到 {} 个对象", frame_index, detections.len());

    Ok(DetectionSet {
      frame_index,
      captured_at,
      transform,
      detections: detections.into_boxed_slice(),
    })
  }
}

/// 最近一次完整的检测结果。
///
/// 整体替换 `Arc<DetectionSet>`，读者拿到的检测框与变换参数总是来自同一帧。
#[derive(Debug, Clone, Default)]
pub struct LatestDetections {
  inner: Arc<RwLock<Option<Arc<DetectionSet>>>>,
}

impl LatestDetections {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn publish(&self, set: DetectionSet) -> Arc<DetectionSet> {
    let set = Arc::new(set);
    let mut slot = match self.inner.write() {
      Ok(slot) => slot,
      Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(set.clone());
    set
  }

  pub fn latest(&self) -> Option<Arc<DetectionSet>> {
    match self.inner.read() {
      Ok(slot) => slot.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{
    cell::Cell,
    fmt,
  };

  use super::*;

  #[derive(Debug)]
  struct Unavailable;

  impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "加速器不可用")
    }
  }

  impl std::error::Error for Unavailable {}

  /// 第一次调用返回固定输出，之后返回错误
  struct FlakyModel {
    output: RawOutput,
    calls: Cell<usize>,
  }

  impl Model for FlakyModel {
    type Input = LetterboxTensor;
    type Output = RawOutput;
    type Error = Unavailable;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      let calls = self.calls.get();
      self.calls.set(calls + 1);
      if calls == 0 {
        Ok(self.output.clone())
      } else {
        Err(Unavailable)
      }
    }

    fn num_classes(&self) -> Option<usize> {
      Some(self.output.num_classes())
    }
  }

  fn output() -> RawOutput {
    #[rustfmt::skip]
    let data = vec![
      // Person 0.9
      0.5, 0.5, 0.25, 0.5, 0.95, 0.9, 0.1,
      // 与上一行大面积重叠的 Person 0.6
      0.51, 0.5, 0.25, 0.5, 0.9, 0.6, 0.1,
      // Door 0.7
      0.1, 0.5, 0.1, 0.2, 0.8, 0.2, 0.7,
      // 目标性不足
      0.9, 0.9, 0.1, 0.1, 0.3, 0.9, 0.9,
    ];
    RawOutput::new(data, 7).unwrap()
  }

  fn pipeline() -> Pipeline<FlakyModel> {
    let labels = Arc::new(LabelTable::new(["Person", "Door"]).unwrap());
    let model = FlakyModel {
      output: output(),
      calls: Cell::new(0),
    };
    Pipeline::new(model, labels, PipelineConfig::default()).unwrap()
  }

  #[test]
  fn runs_frame_end_to_end() {
    let pipeline = pipeline();
    let image = RgbImage::new(1280, 720);
    let set = pipeline.run_frame(7, &image).unwrap();

    assert_eq!(set.frame_index, 7);
    assert_eq!(set.transform.scale, 0.5);
    assert_eq!(set.transform.y_offset, 140.0);
    let labels: Vec<_> = set.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, ["Person", "Door"]);

    // Person 框中心位于模型空间 (320, 320)，对应原图中心
    let viewport = Viewport::new(1280.0, 720.0);
    let (_, person) = set.project(viewport).next().unwrap();
    assert!((person.center_x() - 640.0).abs() < 1e-3);
    assert!(((person.top + person.bottom) / 2.0 - 360.0).abs() < 1e-3);
  }

  #[test]
  fn inference_failure_is_reported() {
    let pipeline = pipeline();
    let image = RgbImage::new(64, 48);
    let set = pipeline.run_frame(0, &image).unwrap();
    assert_eq!(set.transform.scale, 10.0);
    assert_eq!(set.transform.x_offset, 0.0);
    assert_eq!(set.transform.y_offset, 80.0);
    assert!(matches!(
      pipeline.run_frame(1, &image),
      Err(PipelineError::Inference(_))
    ));
  }

  #[test]
  fn empty_image_fails_fast() {
    let pipeline = pipeline();
    assert!(matches!(
      pipeline.run_frame(0, &RgbImage::new(0, 0)),
      Err(PipelineError::Preprocess(_))
    ));
    // 预处理失败时不应调用推理
    assert_eq!(pipeline.model.calls.get(), 0);
  }

  #[test]
  fn invalid_config_is_rejected() {
    let labels = Arc::new(LabelTable::new(["Person", "Door"]).unwrap());
    let model = FlakyModel {
      output: output(),
      calls: Cell::new(0),
    };
    let config = PipelineConfig::default().with_iou_threshold(2.0);
    assert!(matches!(
      Pipeline::new(model, labels, config),
      Err(PipelineError::Config(ConfigError::IouOutOfRange(_)))
    ));
  }

  #[test]
  fn mismatched_labels_are_rejected_at_startup() {
    let labels = Arc::new(LabelTable::new(["Person", "Door", "Stairs"]).unwrap());
    let model = FlakyModel {
      output: output(),
      calls: Cell::new(0),
    };
    assert!(matches!(
      Pipeline::new(model, labels, PipelineConfig::default()),
      Err(PipelineError::Labels(LabelError::ClassCountMismatch {
        labels: 3,
        classes: 2
      }))
    ));
  }

  #[test]
  fn caller_supplies_capture_time() {
    let pipeline = pipeline();
    let captured_at = Utc::now() - chrono::Duration::seconds(5);
    let set = pipeline
      .run_frame_at(3, captured_at, &RgbImage::new(32, 32))
      .unwrap();
    assert_eq!(set.frame_index, 3);
    assert_eq!(set.captured_at, captured_at);
  }

  #[test]
  fn publishing_replaces_wholesale() {
    let board = LatestDetections::new();
    assert!(board.latest().is_none());

    let transform = FrameTransform {
      scale: 1.0,
      x_offset: 0.0,
      y_offset: 80.0,
      source_width: 640.0,
      source_height: 480.0,
    };
    let first = DetectionSet {
      frame_index: 1,
      captured_at: Utc::now(),
      transform,
      detections: Box::new([]),
    };
    let held = board.publish(first);

    let second = DetectionSet {
      frame_index: 2,
      transform: FrameTransform {
        y_offset: 0.0,
        ..transform
      },
      ..(*held).clone()
    };
    board.publish(second);

    // 先前取得的快照保持不变
    assert_eq!(held.frame_index, 1);
    assert_eq!(held.transform.y_offset, 80.0);
    let latest = board.latest().unwrap();
    assert_eq!(latest.frame_index, 2);
    assert_eq!(latest.transform.y_offset, 0.0);
  }
}
