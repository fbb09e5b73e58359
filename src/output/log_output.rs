// 该文件是 Mingmu （明目） 项目的一部分。
// src/output/log_output.rs - 日志输出
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{OutputError, Render, resolve_viewport, viewport_from_query},
  pipeline::DetectionSet,
  transform::Viewport,
};

/// 把每帧结果投影到视口后写入日志
#[derive(Debug, Clone, Default)]
pub struct LogOutput {
  viewport: Option<Viewport>,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OutputError::SchemeMismatch);
    }
    Ok(Self {
      viewport: viewport_from_query(url)?,
    })
  }
}

impl Render<RgbImage, DetectionSet> for LogOutput {
  type Error = OutputError;

  fn render_result(&self, _frame: &RgbImage, result: &DetectionSet) -> Result<(), Self::Error> {
    let viewport = resolve_viewport(self.viewport, result);
    info!(
      "帧 {}: 检测到 {} 个对象 (视口 {}x{})",
      result.frame_index,
      result.len(),
      viewport.width,
      viewport.height
    );
    for (det, rect) in result.project(viewport) {
      info!(
        "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
        det.label,
        det.confidence * 100.0,
        rect.left,
        rect.top,
        rect.width(),
        rect.height()
      );
    }
    Ok(())
  }
}
