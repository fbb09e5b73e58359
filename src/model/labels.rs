// 该文件是 Mingmu （明目） 项目的一部分。
// src/model/labels.rs - 类别标签表
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
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoded_path};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[cfg(feature = "serde_json")]
  #[error("JSON 标签解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("标签表为空")]
  Empty,
  #[error("标签数量 {labels} 与模型类别数 {classes} 不一致")]
  ClassCountMismatch { labels: usize, classes: usize },
}

/// 有序的类别名称表，下标与输出张量的类别列一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  labels: Box<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Result<Self, LabelError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let labels: Box<[String]> = labels.into_iter().map(Into::into).collect();
    if labels.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(Self { labels })
  }

  /// 每行一个标签，跳过空行
  pub fn parse_lines(text: &str) -> Result<Self, LabelError> {
    Self::new(
      text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty()),
    )
  }

  #[cfg(feature = "serde_json")]
  pub fn parse_json(text: &str) -> Result<Self, LabelError> {
    let labels: Vec<String> = serde_json::from_str(text)?;
    Self::new(labels)
  }

  /// 根据扩展名读取：`.json` 为字符串数组，其它按行读取
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let table = match path.extension().and_then(|ext| ext.to_str()) {
      #[cfg(feature = "serde_json")]
      Some("json") => Self::parse_json(&text)?,
      _ => Self::parse_lines(&text)?,
    };
    debug!("从 {} 读取 {} 个标签", path.display(), table.len());
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// 越界时返回 None，不做任何默认替换
  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }

  /// 启动时与模型类别数对齐校验
  pub fn validate_class_count(&self, classes: usize) -> Result<(), LabelError> {
    if self.labels.len() != classes {
      error!(
        "标签数量 {} 与模型类别数 {} 不一致",
        self.labels.len(),
        classes
      );
      return Err(LabelError::ClassCountMismatch {
        labels: self.labels.len(),
        classes,
      });
    }
    Ok(())
  }
}

impl FromUrlWithScheme for LabelTable {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelTable {
  type Error = LabelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LabelError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    Self::load(decoded_path(url))
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn parses_lines_skipping_blanks() {
    let table = LabelTable::parse_lines("Person\n\n  Car \nDog\n").unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(1), Some("Car"));
    assert_eq!(table.get(3), None);
    assert_eq!(table.iter().collect::<Vec<_>>(), ["Person", "Car", "Dog"]);
  }

  #[test]
  fn empty_table_is_rejected() {
    assert!(matches!(
      LabelTable::parse_lines("\n \n"),
      Err(LabelError::Empty)
    ));
  }

  #[test]
  fn validates_against_model_classes() {
    let table = LabelTable::new(["Person", "Car"]).unwrap();
    assert!(table.validate_class_count(2).is_ok());
    assert!(matches!(
      table.validate_class_count(19),
      Err(LabelError::ClassCountMismatch {
        labels: 2,
        classes: 19
      })
    ));
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    writeln!(file, "Person\nStairs\nDoor").unwrap();

    let url = Url::from_file_path(file.path()).unwrap();
    let url = Url::parse(&format!("labels://{}", url.path())).unwrap();
    let table = LabelTable::from_url(&url).unwrap();
    assert_eq!(table.get(2), Some("Door"));

    let wrong = Url::parse("image:///tmp/labels.txt").unwrap();
    assert!(matches!(
      LabelTable::from_url(&wrong),
      Err(LabelError::SchemeMismatch(_))
    ));
  }

  #[cfg(feature = "serde_json")]
  #[test]
  fn loads_json_array() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"["Person", "Car"]"#).unwrap();

    let table = LabelTable::load(file.path()).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0), Some("Person"));
  }
}
