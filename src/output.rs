// 该文件是 Mingmu （明目） 项目的一部分。
// src/output.rs - 输出定义
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
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, pipeline::DetectionSet, transform::Viewport};

/// 检测结果的消费者（叠加层、语音等），各自投影到自己的坐标空间
pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod log_output;
pub use self::log_output::LogOutput;

#[cfg(feature = "json_record")]
mod json_record;
#[cfg(feature = "json_record")]
pub use self::json_record::{JsonRecordOutput, JsonRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "json_record")]
  #[error("JSON 记录输出错误: {0}")]
  JsonRecordOutputError(#[from] JsonRecordOutputError),
  #[error("视口参数无效: {0}")]
  InvalidViewport(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 从 `?width=..&height=..` 读取视口，未指定时返回 None（使用原始帧尺寸）
pub fn viewport_from_query(url: &Url) -> Result<Option<Viewport>, OutputError> {
  let mut width = None;
  let mut height = None;
  for (k, v) in url.query_pairs() {
    let parse = || {
      v.parse::<f32>()
        .ok()
        .filter(|v| *v > 0.0)
        .ok_or_else(|| OutputError::InvalidViewport(format!("{}={}", k, v)))
    };
    match k.as_ref() {
      "width" => width = Some(parse()?),
      "height" => height = Some(parse()?),
      _ => {}
    }
  }
  match (width, height) {
    (Some(w), Some(h)) => Ok(Some(Viewport::new(w, h))),
    (None, None) => Ok(None),
    _ => Err(OutputError::InvalidViewport(
      "width 与 height 需要同时指定".to_string(),
    )),
  }
}

/// 未指定视口时按原始帧尺寸投影
pub(crate) fn resolve_viewport(viewport: Option<Viewport>, result: &DetectionSet) -> Viewport {
  viewport.unwrap_or(Viewport::new(
    result.transform.source_width,
    result.transform.source_height,
  ))
}

pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "json_record")]
  JsonRecord(JsonRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput::from_url(url)?)),
      #[cfg(feature = "json_record")]
      JsonRecordOutput::SCHEME => {
        let output = JsonRecordOutput::from_url(url)?;
        Ok(OutputWrapper::JsonRecord(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<RgbImage, DetectionSet> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &RgbImage, result: &DetectionSet) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => output.render_result(frame, result),
      #[cfg(feature = "json_record")]
      OutputWrapper::JsonRecord(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
