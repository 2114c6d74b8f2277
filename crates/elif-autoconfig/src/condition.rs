//! Activation gate and the ordered conditions built on it
//!
//! A dependent component is constructed only when its flag is on, the
//! collaborator it needs is available, and at least one candidate exists.
//! The checks run cheapest first and stop at the first negative answer, so an
//! explicit disable never triggers a collaborator lookup.

use crate::assembly::AssemblyContext;
use elif_config::{ConversionService, DefaultConversionService, PlaceholderResolver};
use std::marker::PhantomData;

/// `enabled_flag && collaborator_available && candidate_count > 0`
///
/// Eager form of [`ActivationDecision::evaluate`], which holds the rule.
pub fn should_activate(enabled_flag: bool, collaborator_available: bool, candidate_count: usize) -> bool {
    ActivationDecision::evaluate(enabled_flag, || collaborator_available, || candidate_count).is_active()
}

/// Why a gate opened or stayed shut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationDecision {
    Activate,
    Disabled,
    CollaboratorMissing,
    NoCandidates,
}

impl ActivationDecision {
    /// The activation rule, with lazy checks; later checks are skipped once one fails
    pub fn evaluate<P, C>(enabled_flag: bool, collaborator_available: P, candidate_count: C) -> Self
    where
        P: FnOnce() -> bool,
        C: FnOnce() -> usize,
    {
        if !enabled_flag {
            Self::Disabled
        } else if !collaborator_available() {
            Self::CollaboratorMissing
        } else if candidate_count() == 0 {
            Self::NoCandidates
        } else {
            Self::Activate
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Activate)
    }
}

/// Result of one condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionOutcome {
    Match,
    NoMatch(String),
}

impl ConditionOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, ConditionOutcome::Match)
    }
}

/// A predicate deciding whether an auto-configuration applies
pub trait ActivationCondition: Send + Sync {
    /// Short description used in condition reports
    fn describe(&self) -> String;

    fn evaluate(&self, ctx: &AssemblyContext) -> ConditionOutcome;
}

/// Matches when a boolean property has the expected value
#[derive(Debug, Clone)]
pub struct OnProperty {
    key: String,
    having_value: bool,
    match_if_missing: bool,
}

impl OnProperty {
    /// `key` must be `true`; a missing key counts as enabled
    pub fn enabled(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            having_value: true,
            match_if_missing: true,
        }
    }

    pub fn having_value(mut self, value: bool) -> Self {
        self.having_value = value;
        self
    }

    pub fn match_if_missing(mut self, matches: bool) -> Self {
        self.match_if_missing = matches;
        self
    }
}

impl ActivationCondition for OnProperty {
    fn describe(&self) -> String {
        format!("requires property '{}' to be {}", self.key, self.having_value)
    }

    fn evaluate(&self, ctx: &AssemblyContext) -> ConditionOutcome {
        let Some(entry) = ctx.properties().get(&self.key) else {
            return if self.match_if_missing {
                ConditionOutcome::Match
            } else {
                ConditionOutcome::NoMatch(format!("property '{}' is not set", self.key))
            };
        };

        let value = PlaceholderResolver::new().resolve_value(&entry.value, ctx.properties());
        match DefaultConversionService::new().to_bool(&value) {
            Ok(flag) if flag == self.having_value => ConditionOutcome::Match,
            Ok(flag) => ConditionOutcome::NoMatch(format!("property '{}' is {}", self.key, flag)),
            Err(error) => {
                tracing::warn!("Ignoring unreadable flag '{}': {}", entry.key, error);
                ConditionOutcome::NoMatch(format!("property '{}': {}", self.key, error))
            }
        }
    }
}

/// Matches when a component of type `T` is registered here or in a parent context
pub struct OnComponent<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> OnComponent<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Default for OnComponent<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ActivationCondition for OnComponent<T> {
    fn describe(&self) -> String {
        format!("requires a component of type {}", std::any::type_name::<T>())
    }

    fn evaluate(&self, ctx: &AssemblyContext) -> ConditionOutcome {
        if ctx.has_component::<T>() {
            ConditionOutcome::Match
        } else {
            ConditionOutcome::NoMatch(format!(
                "no component of type {}",
                std::any::type_name::<T>()
            ))
        }
    }
}

/// Matches when the configuration has at least one candidate to create
#[derive(Debug, Clone)]
pub struct OnCandidates {
    kind: &'static str,
    count: usize,
}

impl OnCandidates {
    pub fn new(kind: &'static str, count: usize) -> Self {
        Self { kind, count }
    }
}

impl ActivationCondition for OnCandidates {
    fn describe(&self) -> String {
        format!("requires at least one {} candidate", self.kind)
    }

    fn evaluate(&self, _ctx: &AssemblyContext) -> ConditionOutcome {
        if self.count > 0 {
            ConditionOutcome::Match
        } else {
            ConditionOutcome::NoMatch(format!("no {} candidates", self.kind))
        }
    }
}
