//! Strategy walking, retries and the action performed on the resolved element

use crate::browser::{ElementHandle, Page, Strategy, TargetDescriptor};
use crate::config::ExtractionConfig;
use crate::HarvestError;
use std::time::Duration;

/// What to do with a resolved element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Click,

    /// Choose the option with this value or label in a select control
    SelectOption(&'static str),

    ExtractText,
    ExtractMarkup,
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Clicked,
    Selected,
    Text(String),
    Markup(String),
}

impl Resolved {
    /// Returns the extracted content, or `None` for a click or selection
    pub fn into_content(self) -> Option<String> {
        match self {
            Self::Clicked | Self::Selected => None,
            Self::Text(content) | Self::Markup(content) => Some(content),
        }
    }
}

/// Tagged result of one strategy
#[derive(Debug)]
pub enum StrategyOutcome {
    /// Element found, visible and acted on
    Success(Resolved),

    /// Strategy did not produce a usable element
    Miss(String),
}

/// Retry and timing parameters for the resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Number of passes over the full strategy list
    pub attempts: u32,

    /// Pause between passes
    pub retry_delay: Duration,

    /// Bounded visibility wait applied before acting
    pub visibility_timeout: Duration,

    /// Timeout handed to click and select actions
    pub action_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&ExtractionConfig::default())
    }
}

impl From<&ExtractionConfig> for ResolverConfig {
    fn from(config: &ExtractionConfig) -> Self {
        Self {
            attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
            visibility_timeout: config.visibility_timeout(),
            action_timeout: config.navigation_timeout(),
        }
    }
}

/// Locates targets on a page and acts on them
#[derive(Debug, Clone, Default)]
pub struct ElementResolver {
    config: ResolverConfig,
}

impl ElementResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `target` on `page` and performs `action` on it
    ///
    /// The strategy list is walked in order and the first success returns
    /// immediately, so an action is never performed twice. After every pass
    /// fails, the structural path gets one more try to absorb elements that
    /// arrived late.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolved)` - The action's result
    /// * `Err(HarvestError::Resolution)` - Every strategy failed on every attempt
    pub async fn resolve(
        &self,
        page: &mut dyn Page,
        target: &TargetDescriptor,
        action: Action,
    ) -> Result<Resolved, HarvestError> {
        let attempts = self.config.attempts.max(1);

        for attempt in 1..=attempts {
            for strategy in Strategy::ORDERED {
                match self.try_strategy(page, strategy, target, action).await {
                    StrategyOutcome::Success(resolved) => {
                        tracing::debug!(
                            "Resolved '{}' via {} on attempt {}",
                            target,
                            strategy,
                            attempt
                        );
                        return Ok(resolved);
                    }
                    StrategyOutcome::Miss(reason) => {
                        tracing::trace!("Strategy {} missed '{}': {}", strategy, target, reason);
                    }
                }
            }

            if attempt < attempts {
                tracing::debug!(
                    "All strategies missed '{}' (attempt {}/{}), retrying in {:?}",
                    target,
                    attempt,
                    attempts,
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        if let StrategyOutcome::Success(resolved) = self
            .try_strategy(page, Strategy::StructuralPath, target, action)
            .await
        {
            tracing::debug!("Resolved '{}' via final structural fallback", target);
            return Ok(resolved);
        }

        tracing::warn!("Could not resolve '{}' after {} attempts", target, attempts);
        Err(HarvestError::Resolution {
            target: target.to_string(),
            attempts,
        })
    }

    async fn try_strategy(
        &self,
        page: &mut dyn Page,
        strategy: Strategy,
        target: &TargetDescriptor,
        action: Action,
    ) -> StrategyOutcome {
        let handle = match page.locate(strategy, target).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return StrategyOutcome::Miss("no match".to_string()),
            Err(e) => return StrategyOutcome::Miss(e.to_string()),
        };

        match page.wait_visible(handle, self.config.visibility_timeout).await {
            Ok(true) => {}
            Ok(false) => return StrategyOutcome::Miss("not visible".to_string()),
            Err(e) => return StrategyOutcome::Miss(e.to_string()),
        }

        match self.act(page, handle, action).await {
            Ok(resolved) => StrategyOutcome::Success(resolved),
            Err(e) => StrategyOutcome::Miss(e.to_string()),
        }
    }

    async fn act(
        &self,
        page: &mut dyn Page,
        handle: ElementHandle,
        action: Action,
    ) -> Result<Resolved, crate::browser::BrowserError> {
        match action {
            Action::Click => {
                page.click(handle, self.config.action_timeout).await?;
                Ok(Resolved::Clicked)
            }
            Action::SelectOption(value) => {
                page.select_option(handle, value, self.config.action_timeout)
                    .await?;
                Ok(Resolved::Selected)
            }
            Action::ExtractText => Ok(Resolved::Text(page.extract_text(handle).await?)),
            Action::ExtractMarkup => Ok(Resolved::Markup(page.extract_markup(handle).await?)),
        }
    }
}
