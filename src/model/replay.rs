// 该文件是 Mingmu （明目） 项目的一部分。
// src/model/replay.rs - 回放录制的模型输出
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  frame::{AsNhwcTensor, LetterboxTensor},
  model::{Model, RawOutput, RawOutputError},
};

#[derive(Error, Debug)]
pub enum ReplayModelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("输出形状错误: {0}")]
  Shape(#[from] RawOutputError),
  #[error("二进制输出需要指定 columns 参数")]
  MissingColumns,
  #[error("参数 {0} 无效: {1}")]
  InvalidParameter(String, String),
  #[error("二进制输出长度 {0} 不是 4 的整数倍")]
  TruncatedBinary(usize),
  #[error("JSON 输出为空或行长度不一致")]
  RaggedJson,
  #[error("输入张量边长 {actual} 与期望 {expected} 不一致")]
  InputSizeMismatch { expected: usize, actual: usize },
}

/// 每帧返回同一份录制好的原始输出，用于在没有加速器时驱动完整流水线
#[derive(Debug, Clone)]
pub struct ReplayModel {
  output: RawOutput,
  input_side: Option<usize>,
}

impl ReplayModel {
  pub fn new(output: RawOutput) -> Self {
    Self {
      output,
      input_side: None,
    }
  }

  /// 要求输入张量为指定边长
  pub fn with_input_side(mut self, side: usize) -> Self {
    self.input_side = Some(side);
    self
  }

  /// 本机字节序 f32 数组
  pub fn load_binary(path: impl AsRef<Path>, columns: usize) -> Result<Self, ReplayModelError> {
    let bytes = std::fs::read(path.as_ref())?;
    if bytes.len() % 4 != 0 {
      return Err(ReplayModelError::TruncatedBinary(bytes.len()));
    }
    let data = bytes
      .chunks_exact(4)
      .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect::<Vec<_>>();
    Ok(Self::new(RawOutput::new(data, columns)?))
  }

  /// `[[x, y, w, h, obj, c0, c1, ...], ...]`
  pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReplayModelError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&text)?;
    let columns = rows.first().map(Vec::len).ok_or(ReplayModelError::RaggedJson)?;
    if rows.iter().any(|row| row.len() != columns) {
      return Err(ReplayModelError::RaggedJson);
    }
    let data = rows.into_iter().flatten().collect();
    Ok(Self::new(RawOutput::new(data, columns)?))
  }

  pub fn output(&self) -> &RawOutput {
    &self.output
  }
}

impl FromUrlWithScheme for ReplayModel {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayModel {
  type Error = ReplayModelError;

  /// `replay:///path/out.json` 或 `replay:///path/out.bin?columns=24&side=640`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayModelError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut columns = None;
    let mut side = None;
    for (k, v) in url.query_pairs() {
      let parsed = || {
        v.parse::<usize>()
          .map_err(|e| ReplayModelError::InvalidParameter(k.to_string(), e.to_string()))
      };
      match k.as_ref() {
        "columns" => columns = Some(parsed()?),
        "side" => side = Some(parsed()?),
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }

    let path = decoded_path(url);
    info!("加载录制输出: {}", path);
    let model = if path.ends_with(".json") {
      Self::load_json(&path)?
    } else {
      Self::load_binary(&path, columns.ok_or(ReplayModelError::MissingColumns)?)?
    };
    debug!(
      "录制输出形状: [{}, {}]",
      model.output.rows(),
      model.output.columns()
    );

    Ok(match side {
      Some(side) => model.with_input_side(side),
      None => model,
    })
  }
}

impl Model for ReplayModel {
  type Input = LetterboxTensor;
  type Output = RawOutput;
  type Error = ReplayModelError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    if let Some(expected) = self.input_side
      && input.width() != expected
    {
      return Err(ReplayModelError::InputSizeMismatch {
        expected,
        actual: input.width(),
      });
    }
    debug!("回放模型输入 {} 个值", input.as_nhwc().len());
    Ok(self.output.clone())
  }

  fn num_classes(&self) -> Option<usize> {
    Some(self.output.num_classes())
  }
}
