//! Template module
//!
//! Only the task schema is understood. Rendering is not implemented, so every
//! task is reported with an unknown result and nothing is written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::modules::args::scalar_string;
use crate::modules::error::ModuleError;
use crate::modules::interface::{PlayModule, PlayStatus, ResPlayBook};

const MODEL: &str = "template";
const NOT_IMPLEMENTED: &str = "template module is not implemented";

/// One task of the template module
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateBook {
    pub name: String,
    pub template: Option<TemplateArgs>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateArgs {
    #[serde(deserialize_with = "scalar_string")]
    pub src: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub dest: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub group: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub mode: Option<String>,
    /// Command used to validate the rendered file before it is moved in place
    #[serde(deserialize_with = "scalar_string")]
    pub validate: Option<String>,
    pub backup: bool,
    pub force: bool,
}

#[derive(Default)]
pub struct TemplateModule {
    results: Mutex<Vec<ResPlayBook>>,
}

impl TemplateModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn report(book: &TemplateBook) -> ResPlayBook {
        warn!("Template task '{}' skipped: {}", book.name, NOT_IMPLEMENTED);
        ResPlayBook::new(&book.name, MODEL, NOT_IMPLEMENTED, PlayStatus::Unknown)
    }
}

#[async_trait]
impl PlayModule for TemplateModule {
    fn name(&self) -> &'static str {
        MODEL
    }

    async fn run_all(&self, task_list: &str) {
        match serde_yaml::from_str::<Vec<TemplateBook>>(task_list) {
            Ok(books) if books.is_empty() => {
                self.collect_result(ResPlayBook::fail("", MODEL, "template book no data"))
                    .await;
            }
            Ok(books) => {
                for book in &books {
                    self.collect_result(Self::report(book)).await;
                }
            }
            Err(e) => {
                let msg = ModuleError::from(e).to_string();
                self.collect_result(ResPlayBook::fail("", MODEL, msg)).await;
            }
        }
    }

    async fn run_one(&self, task: &str) {
        let result = match serde_yaml::from_str::<TemplateBook>(task) {
            Ok(book) => Self::report(&book),
            Err(e) => ResPlayBook::fail("", MODEL, ModuleError::from(e).to_string()),
        };
        self.collect_result(result).await;
    }

    async fn collect_result(&self, result: ResPlayBook) {
        self.results.lock().await.push(result);
    }

    async fn drain_results(&self) -> Vec<ResPlayBook> {
        std::mem::take(&mut *self.results.lock().await)
    }
}
