//! Lifecycle hooks
//!
//! Hooks let the embedding application observe or transform a file at fixed
//! points of the store/remove lifecycle (persisting metadata, auditing, ...)
//! without the storage layer knowing about it. Each hook receives the file and
//! returns the file the next hook will see.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::file::File;

/// Named extension point of the file lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    BeforeSave,
    AfterSave,
    BeforeRemove,
    AfterRemove,
}

impl HookStage {
    pub const ALL: [HookStage; 4] = [
        HookStage::BeforeSave,
        HookStage::AfterSave,
        HookStage::BeforeRemove,
        HookStage::AfterRemove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::BeforeSave => "beforeSave",
            HookStage::AfterSave => "afterSave",
            HookStage::BeforeRemove => "beforeRemove",
            HookStage::AfterRemove => "afterRemove",
        }
    }
}

impl FromStr for HookStage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "beforeSave" | "before_save" => Ok(HookStage::BeforeSave),
            "afterSave" | "after_save" => Ok(HookStage::AfterSave),
            "beforeRemove" | "before_remove" => Ok(HookStage::BeforeRemove),
            "afterRemove" | "after_remove" => Ok(HookStage::AfterRemove),
            _ => Err(Error::InvalidCallbackName(s.to_string())),
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transformation run at a lifecycle stage. An error aborts the remaining chain.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, file: File) -> Result<File>;
}

#[async_trait]
impl<F> Hook for F
where
    F: Fn(File) -> Result<File> + Send + Sync,
{
    async fn call(&self, file: File) -> Result<File> {
        self(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        for stage in HookStage::ALL {
            assert_eq!(stage.as_str().parse::<HookStage>().unwrap(), stage);
        }
        assert_eq!("after_remove".parse::<HookStage>().unwrap(), HookStage::AfterRemove);
        assert!(matches!(
            "onSave".parse::<HookStage>(),
            Err(Error::InvalidCallbackName(name)) if name == "onSave"
        ));
    }

    #[tokio::test]
    async fn test_closure_hook() {
        let hook = |file: File| -> Result<File> { Ok(file.with_metadata_key("seen", true)) };
        let file = File::create("a.txt", 1, "text/plain", "local");

        let file = hook.call(file).await.unwrap();
        assert_eq!(file.metadata()["seen"], serde_json::json!(true));
    }
}
