use crate::utils::error::ClassifyError;
use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// 内置类别表，顺序必须与模型训练时的标签顺序一致
///
/// 模型按其他顺序训练时，用 `--labels-path` 指定标签文件（每行一个类别）。
pub const DEFAULT_CLASS_NAMES: [&str; 5] = [
    "Bud Rot Dropping",
    "Bud Rot",
    "Gray Leaf Spot",
    "Leaf Rot",
    "Stem Bleeding",
];

/// Ordered class names, index-aligned with the model's output scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassLabelTable {
    labels: Vec<String>,
}

impl ClassLabelTable {
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(ClassifyError::ModelLoad("Class label table is empty".to_string()));
        }
        if let Some(pos) = labels.iter().position(|l| l.trim().is_empty()) {
            return Err(ClassifyError::ModelLoad(format!(
                "Class label at index {} is blank",
                pos
            )));
        }
        Ok(Self { labels })
    }

    /// 从标签文件加载，每行一个类别，忽略空行和 `#` 注释
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClassifyError::ModelLoad(format!(
                "Label file not found: {}",
                path.display()
            )));
        }

        tracing::info!("Loading class labels from: {}", path.display());

        let content = fs::read_to_string(path)
            .map_err(|e| ClassifyError::ModelLoad(format!("Failed to read label file: {}", e)))?;

        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for ClassLabelTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
