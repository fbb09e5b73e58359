// 该文件是 Mingmu （明目） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧检测
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

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use url::Url;

use mingmu::{
  FromUrl,
  config::{DEFAULT_CONF_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_TARGET_SIZE, PipelineConfig},
  input::InputWrapper,
  model::{LabelTable, ReplayModel},
  output::OutputWrapper,
  pipeline::Pipeline,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Mingmu 单帧检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型（录制输出），如 replay:///data/output.bin?columns=24
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 标签表，如 labels:///data/labels.txt
  #[arg(long, value_name = "LABELS")]
  pub labels: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,
  /// letterbox 目标尺寸
  #[arg(long, default_value_t = DEFAULT_TARGET_SIZE)]
  pub target_size: u32,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_CONF_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD, value_name = "THRESHOLD")]
  pub nms_threshold: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型路径: {}", args.model);
  info!("标签表: {}", args.labels);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let labels = LabelTable::from_url(&args.labels)?;
  let model = ReplayModel::from_url(&args.model)?;

  let config = PipelineConfig::default()
    .with_target_size(args.target_size)
    .with_conf_threshold(args.confidence)
    .with_iou_threshold(args.nms_threshold);
  let pipeline = Pipeline::new(model, Arc::new(labels), config)?;

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(input, pipeline, output)?;

  Ok(())
}
