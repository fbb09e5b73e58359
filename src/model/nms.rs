// 该文件是 Mingmu （明目） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use std::collections::VecDeque;

use tracing::debug;

use crate::model::Detection;

/// 贪心 NMS，与类别无关：不同类别的框重叠过多同样会互相抑制。
///
/// 按置信度降序稳定排序，依次取出最高者，并丢弃与之 IoU 大于
/// `iou_threshold` 的其余框。
pub fn suppress(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
  let candidates = detections.len();

  // 按置信度降序排序（稳定排序）
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  let mut remaining = VecDeque::from(detections);

  let mut result = Vec::new();
  while let Some(best) = remaining.pop_front() {
    remaining.retain(|det| best.bbox.iou(&det.bbox) <= iou_threshold);
    result.push(best);
  }

  debug!("NMS: {} 个候选框保留 {} 个", candidates, result.len());
  result
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(label: &str, confidence: f32, bbox: [f32; 4]) -> Detection {
    Detection {
      label: label.to_string(),
      class_id: 0,
      confidence,
      bbox: bbox.into(),
      distance: 0.0,
      direction: None,
    }
  }

  #[test]
  fn keeps_highest_of_overlapping_pair() {
    // IoU = 70 / 100 = 0.7
    let low = detection("Person", 0.6, [0.0, 0.0, 10.0, 10.0]);
    let high = detection("Person", 0.9, [0.0, 3.0, 10.0, 10.0]);
    assert!((low.bbox.iou(&high.bbox) - 0.7).abs() < 1e-6);

    let kept = suppress(vec![low, high], 0.45);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.9);
  }

  #[test]
  fn suppression_ignores_class() {
    let person = detection("Person", 0.8, [0.0, 0.0, 100.0, 100.0]);
    let chair = Detection {
      class_id: 5,
      ..detection("Chair", 0.7, [5.0, 5.0, 100.0, 100.0])
    };

    let kept = suppress(vec![chair, person], 0.45);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].label, "Person");
  }

  #[test]
  fn iou_equal_to_threshold_survives() {
    // IoU = 50 / 100 = 0.5
    let a = detection("Door", 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = detection("Door", 0.8, [0.0, 5.0, 10.0, 10.0]);
    assert_eq!(a.bbox.iou(&b.bbox), 0.5);
    assert_eq!(suppress(vec![a, b], 0.5).len(), 2);
  }

  #[test]
  fn degenerate_boxes_never_collide() {
    let point = detection("Cup", 0.9, [5.0, 5.0, 5.0, 5.0]);
    let same_point = detection("Cup", 0.8, [5.0, 5.0, 5.0, 5.0]);
    let square = detection("Table", 0.7, [0.0, 0.0, 10.0, 10.0]);

    let kept = suppress(vec![point, same_point, square], 0.0);
    assert_eq!(kept.len(), 3);
  }

  #[test]
  fn idempotent_on_own_output() {
    let detections = vec![
      detection("Person", 0.9, [0.0, 0.0, 100.0, 200.0]),
      detection("Person", 0.85, [10.0, 10.0, 110.0, 210.0]),
      detection("Car", 0.7, [300.0, 300.0, 400.0, 380.0]),
      detection("Car", 0.65, [305.0, 298.0, 402.0, 390.0]),
      detection("Dog", 0.6, [50.0, 150.0, 160.0, 260.0]),
      detection("Cup", 0.55, [500.0, 10.0, 520.0, 40.0]),
    ];

    let once = suppress(detections, 0.45);
    let twice = suppress(once.clone(), 0.45);
    assert_eq!(once, twice);
  }

  #[test]
  fn equal_confidence_disjoint_boxes_are_order_independent() {
    let boxes = [
      detection("A", 0.7, [0.0, 0.0, 10.0, 10.0]),
      detection("B", 0.7, [20.0, 0.0, 30.0, 10.0]),
      detection("C", 0.7, [40.0, 0.0, 50.0, 10.0]),
      detection("D", 0.9, [60.0, 0.0, 70.0, 10.0]),
    ];

    let labels_of = |order: &[usize]| {
      let input = order.iter().map(|&i| boxes[i].clone()).collect();
      let mut labels: Vec<_> = suppress(input, 0.45).into_iter().map(|d| d.label).collect();
      // 最高置信度的框始终排在首位
      assert_eq!(labels[0], "D");
      labels.sort();
      labels
    };

    let expected = labels_of(&[0, 1, 2, 3]);
    assert_eq!(expected, ["A", "B", "C", "D"]);
    assert_eq!(labels_of(&[3, 2, 1, 0]), expected);
    assert_eq!(labels_of(&[1, 3, 0, 2]), expected);
  }

  #[test]
  fn equal_confidence_keeps_input_order() {
    let first = detection("First", 0.7, [0.0, 0.0, 10.0, 10.0]);
    let second = detection("Second", 0.7, [0.0, 0.0, 10.0, 10.0]);

    let kept = suppress(vec![first, second], 0.45);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].label, "First");
  }
}
