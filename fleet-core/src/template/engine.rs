//! Compile-once/execute-many template engine (spec.md §4.1).
//!
//! Two caches: a parsed-template cache keyed by template text (a
//! `RwLock<HashMap>`, read-biased since the set of distinct templates
//! in use is small and stable after startup), and a result cache keyed
//! by `(template text, structural hash of data)` bounded by count with
//! LRU eviction (`lru::LruCache`, chosen over an unbounded map per
//! spec.md §4.1's explicit "bounded by count" requirement).

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use fleet_model::TemplateError;
use parking_lot::RwLock;

use super::ast::{CompiledTemplate, Expr, Segment};
use super::functions;
use super::parser;
use super::value::{structural_hash, Value};

pub struct TemplateEngine {
    parsed: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    results: RwLock<lru::LruCache<(String, u64), String>>,
    named: RwLock<HashMap<String, String>>,
}

impl TemplateEngine {
    pub fn new(result_cache_capacity: usize) -> Self {
        let cap = NonZeroUsize::new(result_cache_capacity.max(1)).expect("capacity >= 1");
        Self {
            parsed: RwLock::new(HashMap::new()),
            results: RwLock::new(lru::LruCache::new(cap)),
            named: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `template` under `name` for later `execute_named`
    /// calls. Rejects templates that fail to parse or validate.
    pub fn register_named(&self, name: impl Into<String>, template: impl Into<String>) -> Result<(), TemplateError> {
        let template = template.into();
        self.validate(&template)?;
        self.named.write().insert(name.into(), template);
        Ok(())
    }

    /// Parse-and-function-check without evaluating against data.
    pub fn validate(&self, template: &str) -> Result<(), TemplateError> {
        let compiled = self.compile(template)?;
        check_functions_known(&compiled.segments)
    }

    /// Parses (if needed, caching the parsed form) and evaluates
    /// `template` against `data`, consulting and populating the result
    /// cache by `(template, structural hash of data)`.
    pub fn execute(&self, template: &str, data: &serde_json::Value) -> Result<String, TemplateError> {
        let value = Value::from(data);
        let hash = structural_hash(&value);
        let cache_key = (template.to_string(), hash);

        // Reader-biased fast path: a read lock and a non-promoting
        // `peek` serve the overwhelmingly common repeat-render case
        // without ever taking a write lock.
        if let Some(hit) = self.results.read().peek(&cache_key) {
            return Ok(hit.clone());
        }

        let compiled = self.compile(template)?;
        check_functions_known(&compiled.segments)?;
        let rendered = render(&compiled.segments, &value)?;

        self.results.write().put(cache_key, rendered.clone());
        Ok(rendered)
    }

    pub fn execute_named(&self, name: &str, data: &serde_json::Value) -> Result<String, TemplateError> {
        let template = self
            .named
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::UnknownNamedTemplate(name.to_string()))?;
        self.execute(&template, data)
    }

    fn compile(&self, template: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        if let Some(hit) = self.parsed.read().get(template) {
            return Ok(Arc::clone(hit));
        }
        let compiled = Arc::new(parser::parse(template)?);
        self.parsed.write().entry(template.to_string()).or_insert_with(|| Arc::clone(&compiled));
        Ok(compiled)
    }
}

fn check_functions_known(segments: &[Segment]) -> Result<(), TemplateError> {
    for segment in segments {
        if let Segment::Expr(expr) = segment {
            check_expr_functions_known(expr)?;
        }
    }
    Ok(())
}

fn check_expr_functions_known(expr: &Expr) -> Result<(), TemplateError> {
    match expr {
        Expr::Literal(_) | Expr::Field(_) => Ok(()),
        Expr::Call(name, args) => {
            if !functions::is_known(name) {
                return Err(TemplateError::UndefinedFunction(name.clone()));
            }
            for arg in args {
                check_expr_functions_known(arg)?;
            }
            Ok(())
        }
    }
}

fn render(segments: &[Segment], data: &Value) -> Result<String, TemplateError> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(t) => out.push_str(t),
            Segment::Expr(expr) => out.push_str(&eval(expr, data)?.to_display_string()),
        }
    }
    Ok(out)
}

fn eval(expr: &Expr, data: &Value) -> Result<Value, TemplateError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Field(path) => Ok(data.get_path(path)),
        Expr::Call(name, args) => {
            let func = functions::lookup(name).ok_or_else(|| TemplateError::UndefinedFunction(name.clone()))?;
            let evaluated: Vec<Value> = args.iter().map(|a| eval(a, data)).collect::<Result<_, _>>()?;
            func(&evaluated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execute_is_pure_across_repeated_calls() {
        let engine = TemplateEngine::new(100);
        let data = json!({"status": {"phase": "Running"}});
        let a = engine.execute("{{ .status.phase }}", &data).unwrap();
        let b = engine.execute("{{ .status.phase }}", &data).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "Running");
    }

    #[test]
    fn validate_rejects_unknown_function() {
        let engine = TemplateEngine::new(100);
        let err = engine.validate("{{ bogus(.status.phase) }}").unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedFunction(_)));
    }

    #[test]
    fn threshold_coloring_end_to_end() {
        let engine = TemplateEngine::new(100);
        let data = json!({"cpu_ratio": 0.85});
        let out = engine
            .execute(r#"{{ colorIf(.cpu_ratio, "yellow", "green", "850m") }}"#, &data)
            .unwrap();
        assert_eq!(out, "<fg=yellow>850m</fg>");
    }

    #[test]
    fn named_template_must_be_registered_first() {
        let engine = TemplateEngine::new(100);
        let err = engine.execute_named("missing", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownNamedTemplate(_)));

        engine.register_named("phase", "{{ .status.phase }}").unwrap();
        let out = engine
            .execute_named("phase", &json!({"status": {"phase": "Pending"}}))
            .unwrap();
        assert_eq!(out, "Pending");
    }

    #[test]
    fn default_function_substitutes_on_empty_field() {
        let engine = TemplateEngine::new(100);
        let out = engine
            .execute(r#"{{ default("-", .spec.nodeName) }}"#, &json!({}))
            .unwrap();
        assert_eq!(out, "-");
    }
}
