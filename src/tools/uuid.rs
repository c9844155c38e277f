//! Bulk UUID generation.

use super::ToolContext;
use crate::error::ToolError;
use crate::platform::ClipboardSink;
use crate::state::{CopyFeedback, SingleFlight, StateCell};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const ENDPOINT: &str = "/api/tools/uuid/generate";

pub const MIN_COUNT: u32 = 1;
pub const MAX_COUNT: u32 = 100;

pub const COPY_FAILED: &str = "Failed to copy to clipboard";
const FALLBACK: &str = "Failed to generate UUIDs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidOptions {
    pub count: u32,
    pub uppercase: bool,
    pub hyphens: bool,
}

impl Default for UuidOptions {
    fn default() -> Self {
        Self {
            count: 5,
            uppercase: false,
            hyphens: true,
        }
    }
}

impl UuidOptions {
    fn query(&self) -> [(&'static str, String); 3] {
        [
            ("count", self.count.clamp(MIN_COUNT, MAX_COUNT).to_string()),
            ("uppercase", self.uppercase.to_string()),
            ("hyphens", self.hyphens.to_string()),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    uuids: Option<Vec<String>>,
}

/// Which copied indicator a copy action sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyTarget {
    All,
    Item(usize),
}

#[derive(Debug, Clone, Default)]
pub struct UuidGeneratorState {
    pub options: UuidOptions,
    pub generating: bool,
    pub error: Option<String>,
    pub uuids: Vec<String>,
}

pub struct UuidGenerator {
    ctx: ToolContext,
    flight: SingleFlight,
    feedback: CopyFeedback<CopyTarget>,
    state: StateCell<UuidGeneratorState>,
}

impl UuidGenerator {
    pub fn new(ctx: ToolContext) -> Self {
        let hold = ctx.client.config().copy_feedback();
        Self {
            ctx,
            flight: SingleFlight::new(),
            feedback: CopyFeedback::new(hold),
            state: StateCell::new(UuidGeneratorState::default()),
        }
    }

    pub fn state(&self) -> UuidGeneratorState {
        self.state.get()
    }

    /// Count is clamped to 1–100.
    pub fn set_options(&self, mut options: UuidOptions) {
        options.count = options.count.clamp(MIN_COUNT, MAX_COUNT);
        self.state.update(|s| s.options = options);
    }

    pub fn is_copied(&self, target: CopyTarget) -> bool {
        self.feedback.is_marked(&target)
    }

    pub async fn generate(&self) -> Result<Vec<String>, ToolError> {
        let _flight = self.flight.begin()?;

        let options = self.state.update(|s| {
            s.generating = true;
            s.error = None;
            s.options
        });

        info!("Generating {} UUIDs", options.count);
        let outcome = self
            .ctx
            .client
            .get_json::<GenerateResponse>(ENDPOINT, &options.query(), FALLBACK)
            .await
            .and_then(|r| r.uuids.ok_or(ToolError::InvalidResponse));

        if outcome.is_ok() {
            self.feedback.clear();
        }
        self.state.update(|s| {
            s.generating = false;
            match &outcome {
                Ok(uuids) => s.uuids = uuids.clone(),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    /// Copy the whole list, one identifier per line. `Ok(None)` when the
    /// list is empty.
    pub async fn copy_all(&self, clipboard: &dyn ClipboardSink) -> Result<Option<String>, ToolError> {
        let uuids = self.state.get().uuids;
        if uuids.is_empty() {
            return Ok(None);
        }
        let text = uuids.join("\n");
        self.copy(clipboard, &text, CopyTarget::All).await?;
        Ok(Some(text))
    }

    pub async fn copy_one(&self, index: usize, clipboard: &dyn ClipboardSink) -> Result<String, ToolError> {
        let uuid = self
            .state
            .get()
            .uuids
            .get(index)
            .cloned()
            .ok_or_else(|| self.record(ToolError::NotFound(index)))?;
        self.copy(clipboard, &uuid, CopyTarget::Item(index)).await?;
        Ok(uuid)
    }

    async fn copy(&self, clipboard: &dyn ClipboardSink, text: &str, target: CopyTarget) -> Result<(), ToolError> {
        match clipboard.write_text(text).await {
            Ok(()) => {
                self.feedback.mark(target);
                Ok(())
            }
            Err(e) => {
                warn!("Copying {:?} failed: {}", target, e);
                Err(self.record(ToolError::Clipboard(COPY_FAILED.to_string())))
            }
        }
    }

    fn record(&self, e: ToolError) -> ToolError {
        self.state.update(|s| s.error = Some(e.user_message()));
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{MemoryClipboard, UnsupportedClipboard};
    use crate::tools::testing::offline_context;

    fn with_uuids(list: &[&str]) -> UuidGenerator {
        let (ctx, _, _) = offline_context();
        let generator = UuidGenerator::new(ctx);
        generator
            .state
            .update(|s| s.uuids = list.iter().map(|u| u.to_string()).collect());
        generator
    }

    #[test]
    fn query_uses_literal_booleans() {
        let q = UuidOptions {
            count: 250,
            uppercase: true,
            hyphens: false,
        }
        .query();
        assert_eq!(q[0], ("count", "100".to_string()));
        assert_eq!(q[1], ("uppercase", "true".to_string()));
        assert_eq!(q[2], ("hyphens", "false".to_string()));
    }

    #[test]
    fn count_is_clamped() {
        let (ctx, _, _) = offline_context();
        let generator = UuidGenerator::new(ctx);
        generator.set_options(UuidOptions {
            count: 0,
            ..UuidOptions::default()
        });
        assert_eq!(generator.state().options.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn copy_all_joins_with_newlines_and_reverts() {
        let generator = with_uuids(&["a", "b", "c"]);
        let clip = MemoryClipboard::new();

        let text = generator.copy_all(&clip).await.unwrap();
        assert_eq!(text.as_deref(), Some("a\nb\nc"));
        assert_eq!(clip.last_text().as_deref(), Some("a\nb\nc"));
        assert!(generator.is_copied(CopyTarget::All));
        assert!(!generator.is_copied(CopyTarget::Item(0)));

        tokio::time::sleep(std::time::Duration::from_millis(2001)).await;
        assert!(!generator.is_copied(CopyTarget::All));
    }

    #[tokio::test(start_paused = true)]
    async fn item_indicators_are_independent() {
        let generator = with_uuids(&["a", "b"]);
        let clip = MemoryClipboard::new();
        assert_eq!(generator.copy_one(1, &clip).await.unwrap(), "b");
        assert!(generator.is_copied(CopyTarget::Item(1)));
        assert!(!generator.is_copied(CopyTarget::Item(0)));
        assert!(!generator.is_copied(CopyTarget::All));
        assert!(matches!(
            generator.copy_one(5, &clip).await,
            Err(ToolError::NotFound(5))
        ));
        assert_eq!(generator.state().error.as_deref(), Some("No result at position 5"));
    }

    #[tokio::test]
    async fn clipboard_failure_sets_error() {
        let generator = with_uuids(&["a"]);
        let err = generator.copy_all(&UnsupportedClipboard).await.unwrap_err();
        assert_eq!(err.to_string(), COPY_FAILED);
        assert_eq!(generator.state().error.as_deref(), Some(COPY_FAILED));
        assert!(!generator.is_copied(CopyTarget::All));
    }

    #[tokio::test]
    async fn empty_list_copies_nothing() {
        let generator = with_uuids(&[]);
        let clip = MemoryClipboard::new();
        assert_eq!(generator.copy_all(&clip).await.unwrap(), None);
        assert!(clip.last_text().is_none());
    }
}
