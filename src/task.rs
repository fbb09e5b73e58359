// 该文件是 Mingmu （明目） 项目的一部分。
// src/task.rs - 任务调度
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::Duration,
};

use image::RgbImage;
use tracing::{info, warn};

use crate::{
  frame::LetterboxTensor,
  model::{Model, RawOutput},
  output::Render,
  pipeline::{DetectionSet, DetectionWorker, FrameOffer, LatestDetections, Pipeline},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error>;
}

/// 只处理第一帧，同步执行
pub struct OneShotTask;

impl<I, M, O, RE> Task<I, M, O> for OneShotTask
where
  I: Iterator<Item = RgbImage>,
  M: Model<Input = LetterboxTensor, Output = RawOutput>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectionSet, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始检测...");
    let now = std::time::Instant::now();
    let result = pipeline.run_frame(0, &frame)?;
    let elapsed = now.elapsed();
    info!("检测完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成");

    Ok(())
  }
}

/// 输入帧交给后台检测线程，当前线程渲染最近一次发布的结果。
///
/// 检测线程繁忙时新帧被丢弃；每个结果只渲染一次。
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  frame_interval: Option<Duration>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 模拟固定帧率的采集节奏
  pub fn with_frame_interval(mut self, frame_interval: Option<Duration>) -> Self {
    self.frame_interval = frame_interval;
    self
  }
}

/// 渲染尚未渲染过的最新结果，返回其帧序号
fn render_latest<O, RE>(
  board: &LatestDetections,
  frame: &RgbImage,
  output: &O,
  rendered: Option<u64>,
) -> Result<Option<u64>, RE>
where
  O: Render<RgbImage, DetectionSet, Error = RE>,
{
  match board.latest() {
    Some(set) if Some(set.frame_index) != rendered => {
      output.render_result(frame, &set)?;
      Ok(Some(set.frame_index))
    }
    _ => Ok(rendered),
  }
}

impl<I, M, O, RE> Task<I, M, O> for ContinuousTask
where
  I: Iterator<Item = RgbImage>,
  M: Model<Input = LetterboxTensor, Output = RawOutput> + Send + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<RgbImage, DetectionSet, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupted = Arc::new(AtomicBool::new(false));
    {
      let interrupted = interrupted.clone();
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        interrupted.store(true, Ordering::Release);
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let board = LatestDetections::new();
    let mut worker = DetectionWorker::spawn(pipeline, board.clone());
    let mut rendered = None;
    let mut dropped = 0usize;
    let mut last_frame = None;

    for (count, frame) in input.enumerate() {
      match worker.offer(frame.clone()) {
        FrameOffer::Accepted(index) => info!("提交第 {} 帧", index),
        FrameOffer::Dropped(_) => dropped += 1,
        FrameOffer::Closed => {
          warn!("检测线程已退出");
          break;
        }
      }

      rendered = render_latest(&board, &frame, &output, rendered)?;
      last_frame = Some(frame);

      if self.frame_number.map(|n| count + 1 >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", count + 1);
        break;
      }
      if interrupted.load(Ordering::Acquire) {
        warn!("中断信号接收，退出任务循环");
        worker.shutdown();
        return Ok(());
      }
      if let Some(interval) = self.frame_interval {
        thread::sleep(interval);
      }
    }

    // 等待已入队的帧完成，再渲染最后一次结果
    worker.finish();
    if let Some(frame) = last_frame {
      render_latest(&board, &frame, &output, rendered)?;
    }

    info!("任务完成，丢弃 {} 帧，退出", dropped);
    Ok(())
  }
}
