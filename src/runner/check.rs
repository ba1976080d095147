use super::context::RunContext;
use super::state::{CheckStatus, Outcome};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The external effect a check performs
///
/// Returns a short detail describing what happened; any error becomes a
/// `failed` outcome carrying the error text.
#[async_trait]
pub trait CheckAction: Send + Sync {
    async fn invoke(&self, ctx: &mut RunContext) -> Result<String>;
}

/// Adapter turning an async closure into a `CheckAction`
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F, Fut> CheckAction for FnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn invoke(&self, _ctx: &mut RunContext) -> Result<String> {
        (self.0)().await
    }
}

type PredicateFn = dyn Fn(&RunContext, &[Outcome]) -> std::result::Result<(), String> + Send + Sync;

/// Condition that must hold before a check's action is invoked
#[derive(Clone)]
pub enum Precondition {
    /// An actor is signed in
    Authenticated,
    /// A prior check with this name passed
    Passed(String),
    /// A run variable with this name is set
    Var(String),
    All(Vec<Precondition>),
    Custom(Arc<PredicateFn>),
}

impl Precondition {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&RunContext, &[Outcome]) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        Precondition::Custom(Arc::new(predicate))
    }

    /// `Err` carries the reason recorded as the failed outcome's detail
    pub fn evaluate(&self, ctx: &RunContext, prior: &[Outcome]) -> std::result::Result<(), String> {
        match self {
            Precondition::Authenticated => match ctx.actor() {
                Some(_) => Ok(()),
                None => Err("no authenticated actor".to_string()),
            },
            Precondition::Passed(name) => {
                let passed = prior
                    .iter()
                    .any(|o| &o.check_name == name && o.status == CheckStatus::Passed);
                if passed {
                    Ok(())
                } else {
                    Err(format!("requires check '{}' to pass", name))
                }
            }
            Precondition::Var(name) => match ctx.vars.get(name) {
                Some(_) => Ok(()),
                None => Err(format!("variable '{}' is not set", name)),
            },
            Precondition::All(all) => all.iter().try_for_each(|p| p.evaluate(ctx, prior)),
            Precondition::Custom(predicate) => predicate(ctx, prior),
        }
    }
}

impl fmt::Debug for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precondition::Authenticated => write!(f, "Authenticated"),
            Precondition::Passed(name) => write!(f, "Passed({:?})", name),
            Precondition::Var(name) => write!(f, "Var({:?})", name),
            Precondition::All(all) => f.debug_tuple("All").field(all).finish(),
            Precondition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A named unit of work in a checklist
#[derive(Clone)]
pub struct Check {
    pub name: String,
    pub action: Option<Arc<dyn CheckAction>>,
    pub precondition: Option<Precondition>,
    pub timeout: Option<Duration>,
}

impl Check {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            action: None,
            precondition: None,
            timeout: None,
        }
    }

    /// Shorthand for a check whose action is an async closure
    pub fn from_fn<F, Fut>(name: &str, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self::new(name).with_action(FnAction(f))
    }

    pub fn with_action(mut self, action: impl CheckAction + 'static) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    pub fn requires(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("has_action", &self.action.is_some())
            .field("precondition", &self.precondition)
            .field("timeout", &self.timeout)
            .finish()
    }
}
