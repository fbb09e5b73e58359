// 该文件是 Mingmu （明目） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续检测
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

use std::{sync::Arc, time::Duration};

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
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Mingmu 连续检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型（录制输出）
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 标签表
  #[arg(long, value_name = "LABELS")]
  pub labels: Url,
  /// 输入来源，如 folder:///data/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，如 record:///data/records?width=1080&height=2400
  #[arg(long, value_name = "OUTPUT", default_value = "log:")]
  pub output: Url,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
  /// 采集帧率，0 表示不限速
  #[arg(long, default_value_t = 0.0, value_name = "FPS")]
  pub fps: f64,

  #[arg(long, default_value_t = DEFAULT_TARGET_SIZE)]
  pub target_size: u32,
  #[arg(long, default_value_t = DEFAULT_CONF_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,
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

  let interval = (args.fps > 0.0).then(|| Duration::from_secs_f64(1.0 / args.fps));
  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_frame_interval(interval)
    .run_task(input, pipeline, output)?;

  Ok(())
}
