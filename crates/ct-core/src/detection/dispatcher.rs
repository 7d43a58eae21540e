use rayon::prelude::*;
use serde::Serialize;

use super::capture::CameraCaptureEvent;
use super::config::{DetectionConfig, DetectionConfigError};
use super::context::SessionContext;
use super::generic::GenericStrategy;
use super::kakaotalk::KakaoTalkStrategy;
use super::strategy::CaptureDetectionStrategy;
use super::telegram::TelegramStrategy;
use crate::types::SessionId;

/// The closed set of detection strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    Generic(GenericStrategy),
    Telegram(TelegramStrategy),
    KakaoTalk(KakaoTalkStrategy),
}

impl Strategy {
    pub fn as_strategy(&self) -> &dyn CaptureDetectionStrategy {
        match self {
            Self::Generic(s) => s,
            Self::Telegram(s) => s,
            Self::KakaoTalk(s) => s,
        }
    }
}

/// Picks the strategy for a session's package.
///
/// The highest-priority strategy whose package matches wins; on equal
/// priority the one registered first does. Packages nobody claims get the
/// generic strategy.
#[derive(Debug, Clone)]
pub struct StrategyDispatcher {
    /// Package-specific strategies, sorted by descending priority.
    strategies: Vec<Strategy>,
    generic: Strategy,
}

impl StrategyDispatcher {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        let mut strategies = vec![
            Strategy::Telegram(TelegramStrategy::new(config)?),
            Strategy::KakaoTalk(KakaoTalkStrategy::new(config)?),
        ];
        strategies.sort_by_key(|s| std::cmp::Reverse(s.as_strategy().priority()));
        Ok(Self {
            strategies,
            generic: Strategy::Generic(GenericStrategy::new(config)?),
        })
    }

    pub fn select(&self, package: &str) -> &dyn CaptureDetectionStrategy {
        self.strategies
            .iter()
            .map(Strategy::as_strategy)
            .find(|s| s.matches_package(package))
            .unwrap_or_else(|| self.generic.as_strategy())
    }
}

/// Captures found in one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCaptures {
    pub session_id: SessionId,
    pub package_name: String,
    pub strategy: &'static str,
    pub captures: Vec<CameraCaptureEvent>,
}

/// Runs the selected strategy over one or many sessions.
#[derive(Debug, Clone)]
pub struct CaptureDetectionEngine {
    dispatcher: StrategyDispatcher,
}

impl CaptureDetectionEngine {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionConfigError> {
        Ok(Self {
            dispatcher: StrategyDispatcher::new(config)?,
        })
    }

    pub const fn dispatcher(&self) -> &StrategyDispatcher {
        &self.dispatcher
    }

    pub fn detect(&self, ctx: &SessionContext) -> Vec<CameraCaptureEvent> {
        self.detect_one(ctx).captures
    }

    /// Sessions are independent and run in parallel; results come back in
    /// input order.
    pub fn detect_sessions(&self, sessions: &[SessionContext]) -> Vec<SessionCaptures> {
        let results: Vec<SessionCaptures> = sessions.par_iter().map(|ctx| self.detect_one(ctx)).collect();
        tracing::debug!(
            sessions = results.len(),
            captures = results.iter().map(|r| r.captures.len()).sum::<usize>(),
            "detection finished"
        );
        results
    }

    fn detect_one(&self, ctx: &SessionContext) -> SessionCaptures {
        let strategy = self.dispatcher.select(&ctx.session.package_name);
        tracing::debug!(
            session = %ctx.session.id,
            package = %ctx.session.package_name,
            strategy = strategy.name(),
            events = ctx.all_events.len(),
            "detecting captures"
        );
        SessionCaptures {
            session_id: ctx.session.id.clone(),
            package_name: ctx.session.package_name.clone(),
            strategy: strategy.name(),
            captures: strategy.detect(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::test_support::{context, db_insert, vibration};

    fn engine() -> CaptureDetectionEngine {
        CaptureDetectionEngine::new(&DetectionConfig::default()).unwrap()
    }

    #[test]
    fn selects_by_package_with_generic_fallback() {
        let engine = engine();
        let dispatcher = engine.dispatcher();
        assert_eq!(dispatcher.select("org.telegram.messenger").name(), "telegram");
        assert_eq!(dispatcher.select("com.kakao.talk").name(), "kakaotalk");
        assert_eq!(dispatcher.select("com.example.camera").name(), "generic");
        assert_eq!(dispatcher.select("com.kakao.talk.sub").name(), "generic");
    }

    #[test]
    fn higher_priority_strategy_wins_on_shared_package() {
        let mut config = DetectionConfig::default();
        config.telegram.package_name = Some("com.kakao.talk".into());
        config.telegram.priority = 200;
        let dispatcher = StrategyDispatcher::new(&config).unwrap();
        assert_eq!(dispatcher.select("com.kakao.talk").name(), "telegram");

        config.telegram.priority = 50;
        let dispatcher = StrategyDispatcher::new(&config).unwrap();
        assert_eq!(dispatcher.select("com.kakao.talk").name(), "kakaotalk");
    }

    #[test]
    fn invalid_exclusion_pattern_fails_construction() {
        let mut config = DetectionConfig::default();
        config.path_exclusion.exclusion_patterns = vec!["[".into()];
        assert!(CaptureDetectionEngine::new(&config).is_err());
    }

    #[test]
    fn detect_sessions_preserves_input_order() {
        let engine = engine();
        let sessions: Vec<SessionContext> = (0..16)
            .map(|i| {
                let package = if i % 2 == 0 { "com.kakao.talk" } else { "com.example.camera" };
                let mut ctx = context(
                    package,
                    vec![
                        vibration(&format!("v{i}"), 0, 50061, "finished"),
                        db_insert(&format!("d{i}"), 1_000, "/storage/emulated/0/DCIM/Camera/a.jpg"),
                    ],
                );
                ctx.session.id = SessionId::new(format!("session-{i}")).unwrap();
                ctx
            })
            .collect();

        let results = engine.detect_sessions(&sessions);

        assert_eq!(results.len(), sessions.len());
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.session_id.as_str(), format!("session-{i}"));
            assert_eq!(result.captures.len(), 1);
            let expected = if i % 2 == 0 { "kakaotalk" } else { "generic" };
            assert_eq!(result.strategy, expected);
        }
    }
}
