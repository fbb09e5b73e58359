// 该文件是 Mingmu （明目） 项目的一部分。
// src/output/json_record.rs - 按日期目录记录 JSON 行
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

use std::{
  fs::OpenOptions,
  io::Write,
  path::PathBuf,
};

use chrono::{DateTime, Datelike, Utc};
use image::RgbImage;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  output::{OutputError, Render, resolve_viewport, viewport_from_query},
  pipeline::DetectionSet,
  transform::Viewport,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("视口参数无效: {0}")]
  InvalidViewport(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 每帧一行 JSON，写入 `<dir>/<年>/<月>/<日>.jsonl`。
///
/// 检测框同时记录模型空间坐标与视口坐标；默认跳过空结果，`?always` 时全部记录。
pub struct JsonRecordOutput {
  directory: PathBuf,
  viewport: Option<Viewport>,
  always: bool,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "record";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    let viewport = viewport_from_query(url).map_err(|e| match e {
      OutputError::InvalidViewport(msg) => JsonRecordOutputError::InvalidViewport(msg),
      other => JsonRecordOutputError::InvalidViewport(other.to_string()),
    })?;
    let always = url.query_pairs().any(|(k, _)| k == "always");

    Ok(JsonRecordOutput {
      directory: PathBuf::from(decoded_path(url)),
      viewport,
      always,
    })
  }
}

impl JsonRecordOutput {
  fn record_path(&self, at: &DateTime<Utc>) -> Result<PathBuf, JsonRecordOutputError> {
    let directory = self
      .directory
      .join(at.year().to_string())
      .join(format!("{:02}", at.month()));
    std::fs::create_dir_all(&directory)?;
    Ok(directory.join(format!("{:02}.jsonl", at.day())))
  }

  fn to_record(&self, result: &DetectionSet) -> Value {
    let viewport = resolve_viewport(self.viewport, result);
    let detections = result
      .project(viewport)
      .map(|(det, rect)| {
        json!({
          "label": det.label,
          "class_id": det.class_id,
          "confidence": det.confidence,
          "model_box": [det.bbox.left, det.bbox.top, det.bbox.right, det.bbox.bottom],
          "display_box": [rect.left, rect.top, rect.right, rect.bottom],
          "distance": det.distance,
          "direction": det.direction.map(|d| d.as_str()),
        })
      })
      .collect::<Vec<_>>();

    let t = &result.transform;
    json!({
      "frame": result.frame_index,
      "captured_at": result.captured_at.to_rfc3339(),
      "transform": {
        "scale": t.scale,
        "x_offset": t.x_offset,
        "y_offset": t.y_offset,
        "source_width": t.source_width,
        "source_height": t.source_height,
      },
      "viewport": [viewport.width, viewport.height],
      "detections": detections,
    })
  }
}

impl Render<RgbImage, DetectionSet> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectionSet) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.record_path(&result.captured_at)?;
    let mut line = serde_json::to_string(&self.to_record(result))?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(line.as_bytes())?;
    debug!("帧 {} 记录到 {}", result.frame_index, path.display());
    Ok(())
  }
}
