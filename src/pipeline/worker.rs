// 该文件是 Mingmu （明目） 项目的一部分。
// src/pipeline/worker.rs - 后台检测线程
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
    mpsc::{self, SyncSender, TrySendError},
  },
  thread::{self, JoinHandle},
};

use chrono::{DateTime, Utc};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::{
  frame::LetterboxTensor,
  model::{Model, RawOutput},
  pipeline::{LatestDetections, Pipeline},
};

/// 队列中最多等待的帧数；处理中的一帧不计入
const FRAME_QUEUE_DEPTH: usize = 1;

/// 帧序号、入队时间、图像
type Job = (u64, DateTime<Utc>, RgbImage);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOffer {
  /// 已入队，附带分配的帧序号
  Accepted(u64),
  /// 队列已满，丢弃本帧
  Dropped(u64),
  /// 工作线程已退出
  Closed,
}

/// 在独立线程上逐帧运行流水线，并把完整结果发布到 [`LatestDetections`]。
///
/// 正在处理一帧且队列已满时，新到的帧直接丢弃，延迟不会无限增长。
/// 失败的帧不会覆盖上一次成功的结果；取消后完成的帧也不会发布。
pub struct DetectionWorker {
  sender: Option<SyncSender<Job>>,
  cancelled: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
  board: LatestDetections,
  next_index: u64,
}

impl DetectionWorker {
  pub fn spawn<M>(pipeline: Pipeline<M>, board: LatestDetections) -> Self
  where
    M: Model<Input = LetterboxTensor, Output = RawOutput> + Send + 'static,
    M::Error: std::error::Error + Send + Sync + 'static,
  {
    let (sender, receiver) = mpsc::sync_channel::<Job>(FRAME_QUEUE_DEPTH);
    let cancelled = Arc::new(AtomicBool::new(false));

    let handle = {
      let cancelled = cancelled.clone();
      let board = board.clone();
      thread::spawn(move || {
        info!("检测线程启动");
        for (index, captured_at, image) in receiver {
          if cancelled.load(Ordering::Acquire) {
            break;
          }
          match pipeline.run_frame_at(index, captured_at, &image) {
            Ok(set) => {
              if cancelled.load(Ordering::Acquire) {
                debug!("帧 {} 完成时已取消, 不发布", index);
                break;
              }
              board.publish(set);
            }
            Err(e) => warn!("帧 {} 处理失败, 保留上一次结果: {}", index, e),
          }
        }
        info!("检测线程退出");
      })
    };

    Self {
      sender: Some(sender),
      cancelled,
      handle: Some(handle),
      board,
      next_index: 0,
    }
  }

  pub fn board(&self) -> &LatestDetections {
    &self.board
  }

  /// 非阻塞提交，队列满时丢弃本帧
  pub fn offer(&mut self, image: RgbImage) -> FrameOffer {
    let Some(sender) = self.sender.as_ref() else {
      return FrameOffer::Closed;
    };
    let index = self.next_index;
    self.next_index += 1;
    match sender.try_send((index, Utc::now(), image)) {
      Ok(()) => FrameOffer::Accepted(index),
      Err(TrySendError::Full(_)) => {
        debug!("检测线程繁忙, 丢弃帧 {}", index);
        FrameOffer::Dropped(index)
      }
      Err(TrySendError::Disconnected(_)) => FrameOffer::Closed,
    }
  }

  /// 阻塞提交，用于离线逐帧处理
  pub fn submit(&mut self, image: RgbImage) -> FrameOffer {
    let Some(sender) = self.sender.as_ref() else {
      return FrameOffer::Closed;
    };
    let index = self.next_index;
    self.next_index += 1;
    match sender.send((index, Utc::now(), image)) {
      Ok(()) => FrameOffer::Accepted(index),
      Err(_) => FrameOffer::Closed,
    }
  }

  /// 标记取消，正在处理的帧完成后不再发布
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::Release);
  }

  /// 处理完已入队的帧后退出
  pub fn finish(mut self) {
    self.join();
  }

  /// 立即取消并等待线程退出
  pub fn shutdown(mut self) {
    self.cancel();
    self.join();
  }

  fn join(&mut self) {
    self.sender.take();
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      warn!("检测线程异常退出");
    }
  }
}

impl Drop for DetectionWorker {
  fn drop(&mut self) {
    if self.handle.is_some() {
      self.cancel();
      self.join();
    }
  }
}
