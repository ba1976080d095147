use crate::backend::{Actor, Backend};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ${key} where key can contain dots
    PATTERN.get_or_init(|| Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").expect("valid variable pattern"))
}

/// Runtime state shared by the checks of one run
pub struct RunContext {
    backend: Arc<dyn Backend>,

    /// Base directory for resolving relative file paths
    pub base_dir: PathBuf,

    /// Variables declared by the checklist
    pub env: HashMap<String, String>,

    /// Variables saved by checks during the run
    pub vars: HashMap<String, String>,

    actor: Option<Actor>,
}

impl RunContext {
    pub fn new(backend: Arc<dyn Backend>, base_dir: &Path, env: HashMap<String, String>) -> Self {
        Self {
            backend,
            base_dir: base_dir.to_path_buf(),
            env,
            vars: HashMap::new(),
            actor: None,
        }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// The actor signed in by an earlier check, if any
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Track the signed-in actor and expose it as `actor.id` / `actor.identity`
    pub fn set_actor(&mut self, actor: Option<Actor>) {
        match &actor {
            Some(a) => {
                self.vars.insert("actor.id".to_string(), a.id.clone());
                self.vars.insert("actor.identity".to_string(), a.identity.clone());
            }
            None => {
                self.vars.remove("actor.id");
                self.vars.remove("actor.identity");
            }
        }
        self.actor = actor;
    }

    /// Follow the backend's session, which actions outside `Step` may change
    pub async fn sync_actor(&mut self) {
        let actor = self.backend.current_actor().await;
        if actor != self.actor {
            log::debug!("Session actor is now {:?}", actor.as_ref().map(|a| &a.id));
            self.set_actor(actor);
        }
    }

    /// Resolve a relative path against the checklist directory
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Look up a variable in run vars, then checklist env, then the process env
    pub fn get_var(&self, name: &str) -> Option<String> {
        self.vars
            .get(name)
            .cloned()
            .or_else(|| self.env.get(name).cloned())
            .or_else(|| std::env::var(name).ok())
    }

    pub fn set_var(&mut self, name: &str, value: &str) {
        let substituted = self.substitute_vars(value);
        self.vars.insert(name.to_string(), substituted);
    }

    /// Substitute ${varname} or ${varname.json.path} patterns in a string
    pub fn substitute_vars(&self, text: &str) -> String {
        var_pattern()
            .replace_all(text, |caps: &regex::Captures| {
                let full_key = &caps[1];

                if let Some(val) = self.get_var(full_key) {
                    return val;
                }

                match full_key {
                    "time" => return chrono::Local::now().format("%H:%M:%S").to_string(),
                    "date" => return chrono::Local::now().format("%Y-%m-%d").to_string(),
                    "timestamp" => return chrono::Utc::now().timestamp_millis().to_string(),
                    "now" => return chrono::Utc::now().to_rfc3339(),
                    _ => {}
                }

                // var.path.inside -> JSON pointer into the variable's JSON content
                if let Some((var_name, json_path)) = full_key.split_once('.') {
                    if let Some(json_str) = self.get_var(var_name) {
                        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&json_str) {
                            let pointer = format!("/{}", json_path.replace('.', "/"));
                            if let Some(target) = value.pointer(&pointer) {
                                if let Some(s) = target.as_str() {
                                    return s.to_string();
                                }
                                return target.to_string();
                            }
                        }
                    }
                }

                // Keep unresolved placeholders verbatim
                format!("${{{}}}", full_key)
            })
            .to_string()
    }

    /// Substitute variables in every string of a JSON value
    pub fn substitute_value(&self, value: &serde_json::Value) -> serde_json::Value {
        use serde_json::Value;

        match value {
            Value::String(s) => Value::String(self.substitute_vars(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.substitute_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.substitute_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}
