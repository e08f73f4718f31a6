//! The engine's function library (spec.md §4.1): styling, sizes, time,
//! logic, icons, math, strings, lists, defaults. Every function here is
//! pure and deterministic for equal inputs, so `Execute` caching is
//! behaviorally invisible.

use std::collections::BTreeMap;

use fleet_model::TemplateError;
use regex::Regex;

use crate::formatting;
use crate::styling::{self, Color, Decorations};

use super::value::Value;

pub type Func = fn(&[Value]) -> Result<Value, TemplateError>;

pub fn lookup(name: &str) -> Option<Func> {
    match name {
        // styling
        "color" => Some(f_color),
        "style" => Some(f_style),
        "gradient" => Some(f_gradient),
        // sizes
        "humanizeBytes" => Some(f_humanize_bytes),
        "millicores" => Some(f_millicores),
        "cores" => Some(f_cores),
        "toMB" => Some(f_to_mb),
        "toGB" => Some(f_to_gb),
        "toMillicores" => Some(f_millicores),
        // time
        "ago" => Some(f_ago),
        "ageInSeconds" => Some(f_age_in_seconds),
        "timestamp" => Some(f_timestamp),
        // logic
        "colorIf" => Some(f_color_if),
        "choose" => Some(f_choose),
        "matches" => Some(f_matches),
        "hasPrefix" => Some(f_has_prefix),
        "hasSuffix" => Some(f_has_suffix),
        "contains" => Some(f_contains),
        // icons
        "icon" => Some(f_icon),
        // math
        "add" => Some(f_add),
        "sub" => Some(f_sub),
        "mul" => Some(f_mul),
        "div" => Some(f_div),
        "min" => Some(f_min),
        "max" => Some(f_max),
        "percent" => Some(f_percent),
        // strings
        "join" => Some(f_join),
        "split" => Some(f_split),
        "upper" => Some(f_upper),
        "lower" => Some(f_lower),
        "trim" => Some(f_trim),
        "len" => Some(f_len),
        "toString" => Some(f_to_string),
        // lists
        "list" => Some(f_list),
        "append" => Some(f_append),
        "slice" => Some(f_slice),
        // defaults
        "default" => Some(f_default),
        _ => None,
    }
}

pub fn is_known(name: &str) -> bool {
    lookup(name).is_some()
}

fn arg(args: &[Value], i: usize) -> Result<&Value, TemplateError> {
    args.get(i)
        .ok_or_else(|| TemplateError::Execution(format!("missing argument {i}")))
}

fn arg_str(args: &[Value], i: usize) -> Result<String, TemplateError> {
    Ok(arg(args, i)?.to_display_string())
}

fn arg_num(args: &[Value], i: usize) -> Result<f64, TemplateError> {
    arg(args, i)?
        .as_number()
        .ok_or_else(|| TemplateError::Execution(format!("argument {i} is not numeric")))
}

// --- styling ---

fn f_color(args: &[Value]) -> Result<Value, TemplateError> {
    let name = arg_str(args, 0)?;
    let text = arg_str(args, 1)?;
    Ok(Value::Str(styling::colorize(&name, &text)))
}

fn f_style(args: &[Value]) -> Result<Value, TemplateError> {
    let bg = arg_str(args, 0)?;
    let fg = arg_str(args, 1)?;
    let decorations = Decorations::parse(&arg_str(args, 2)?);
    let text = arg_str(args, 3)?;
    Ok(Value::Str(styling::styled(&bg, &fg, decorations, &text)))
}

fn f_gradient(args: &[Value]) -> Result<Value, TemplateError> {
    let value = arg_num(args, 0)?;
    let min = arg_num(args, 1)?;
    let max = arg_num(args, 2)?;
    let palette: Vec<Color> = arg(args, 3)?
        .as_list()
        .unwrap_or(&[])
        .iter()
        .filter_map(|v| v.as_str().and_then(Color::parse))
        .collect();
    Ok(Value::Str(styling::gradient_color(value, min, max, &palette).name().to_string()))
}

// --- sizes ---

fn f_humanize_bytes(args: &[Value]) -> Result<Value, TemplateError> {
    let n = arg_num(args, 0)? as u64;
    Ok(Value::Str(formatting::humanize_bytes(n)))
}

fn f_millicores(args: &[Value]) -> Result<Value, TemplateError> {
    let v = arg(args, 0)?;
    let millicores = match v {
        Value::Str(s) => formatting::parse_millicores(s)
            .ok_or_else(|| TemplateError::Execution(format!("invalid cpu quantity: {s}")))?,
        _ => formatting::cores_to_millicores(v.as_number().unwrap_or(0.0)),
    };
    Ok(Value::Number(millicores as f64))
}

fn f_cores(args: &[Value]) -> Result<Value, TemplateError> {
    let millicores = arg_num(args, 0)?;
    Ok(Value::Number(formatting::millicores_to_cores(millicores as u64)))
}

fn f_to_mb(args: &[Value]) -> Result<Value, TemplateError> {
    let bytes = arg_num(args, 0)?;
    Ok(Value::Number(bytes / (1024.0 * 1024.0)))
}

fn f_to_gb(args: &[Value]) -> Result<Value, TemplateError> {
    let bytes = arg_num(args, 0)?;
    Ok(Value::Number(bytes / (1024.0 * 1024.0 * 1024.0)))
}

// --- time ---

fn resolve_timestamp(v: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    match v {
        Value::Str(s) => formatting::parse_timestamp(s),
        Value::Number(n) => chrono::DateTime::from_timestamp(*n as i64, 0),
        _ => None,
    }
}

fn f_ago(args: &[Value]) -> Result<Value, TemplateError> {
    let v = arg(args, 0)?;
    match resolve_timestamp(v) {
        Some(ts) => Ok(Value::Str(formatting::format_age(ts, chrono::Utc::now()))),
        None => Ok(Value::Str("unknown".to_string())),
    }
}

fn f_age_in_seconds(args: &[Value]) -> Result<Value, TemplateError> {
    let v = arg(args, 0)?;
    match resolve_timestamp(v) {
        Some(ts) => Ok(Value::Number((chrono::Utc::now() - ts).num_seconds().max(0) as f64)),
        None => Ok(Value::Str("unknown".to_string())),
    }
}

fn f_timestamp(args: &[Value]) -> Result<Value, TemplateError> {
    let v = arg(args, 0)?;
    match resolve_timestamp(v) {
        Some(ts) => Ok(Value::Str(ts.to_rfc3339())),
        None => Ok(Value::Str("unknown".to_string())),
    }
}

// --- logic ---

fn f_color_if(args: &[Value]) -> Result<Value, TemplateError> {
    let cond = arg(args, 0)?.as_bool();
    let color = if cond { arg_str(args, 1)? } else { arg_str(args, 2)? };
    let text = arg_str(args, 3)?;
    Ok(Value::Str(styling::colorize(&color, &text)))
}

fn f_choose(args: &[Value]) -> Result<Value, TemplateError> {
    let cond = arg(args, 0)?.as_bool();
    Ok(if cond { arg(args, 1)?.clone() } else { arg(args, 2)?.clone() })
}

fn f_matches(args: &[Value]) -> Result<Value, TemplateError> {
    let pattern = arg_str(args, 0)?;
    let text = arg_str(args, 1)?;
    let re = Regex::new(&pattern)
        .map_err(|e| TemplateError::Execution(format!("invalid regex {pattern}: {e}")))?;
    Ok(Value::Bool(re.is_match(&text)))
}

fn f_has_prefix(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Bool(arg_str(args, 1)?.starts_with(&arg_str(args, 0)?)))
}

fn f_has_suffix(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Bool(arg_str(args, 1)?.ends_with(&arg_str(args, 0)?)))
}

fn f_contains(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Bool(arg_str(args, 1)?.contains(&arg_str(args, 0)?)))
}

// --- icons ---

fn f_icon(args: &[Value]) -> Result<Value, TemplateError> {
    let name = arg_str(args, 0)?;
    let glyph = match name.as_str() {
        "success" => "\u{2713}",
        "error" => "\u{2717}",
        "warning" => "\u{26a0}",
        "info" => "\u{2139}",
        "running" => "\u{25b6}",
        "pending" => "\u{23f3}",
        "stopped" => "\u{25a0}",
        "pod" => "\u{25cf}",
        "deployment" => "\u{25a3}",
        "service" => "\u{29d6}",
        "configmap" => "\u{2637}",
        "secret" => "\u{1f512}",
        _ => "",
    };
    Ok(Value::Str(glyph.to_string()))
}

// --- math ---

fn f_add(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Number(arg_num(args, 0)? + arg_num(args, 1)?))
}

fn f_sub(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Number(arg_num(args, 0)? - arg_num(args, 1)?))
}

fn f_mul(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Number(arg_num(args, 0)? * arg_num(args, 1)?))
}

fn f_div(args: &[Value]) -> Result<Value, TemplateError> {
    let divisor = arg_num(args, 1)?;
    if divisor == 0.0 {
        Ok(Value::Number(0.0))
    } else {
        Ok(Value::Number(arg_num(args, 0)? / divisor))
    }
}

fn f_min(args: &[Value]) -> Result<Value, TemplateError> {
    variadic_numbers(args)?
        .into_iter()
        .fold(None, |acc, n| Some(acc.map_or(n, |a: f64| a.min(n))))
        .map(Value::Number)
        .ok_or_else(|| TemplateError::Execution("min requires at least one argument".to_string()))
}

fn f_max(args: &[Value]) -> Result<Value, TemplateError> {
    variadic_numbers(args)?
        .into_iter()
        .fold(None, |acc, n| Some(acc.map_or(n, |a: f64| a.max(n))))
        .map(Value::Number)
        .ok_or_else(|| TemplateError::Execution("max requires at least one argument".to_string()))
}

fn variadic_numbers(args: &[Value]) -> Result<Vec<f64>, TemplateError> {
    args.iter()
        .map(|v| v.as_number().ok_or_else(|| TemplateError::Execution("non-numeric argument".to_string())))
        .collect()
}

fn f_percent(args: &[Value]) -> Result<Value, TemplateError> {
    let value = arg_num(args, 0)?;
    let total = arg_num(args, 1)?;
    if total == 0.0 {
        Ok(Value::Str("0%".to_string()))
    } else {
        Ok(Value::Str(format!("{}%", ((value / total) * 100.0).round() as i64)))
    }
}

// --- strings ---

fn f_join(args: &[Value]) -> Result<Value, TemplateError> {
    // Both argument orders accepted: join(sep, list) | join(list, sep).
    let (list, sep) = match (arg(args, 0)?, arg(args, 1)?) {
        (Value::List(items), sep) => (items.clone(), sep.to_display_string()),
        (sep, Value::List(items)) => (items.clone(), sep.to_display_string()),
        _ => {
            return Err(TemplateError::Execution(
                "join requires one list and one separator argument".to_string(),
            ))
        }
    };
    Ok(Value::Str(
        list.iter().map(Value::to_display_string).collect::<Vec<_>>().join(&sep),
    ))
}

fn f_split(args: &[Value]) -> Result<Value, TemplateError> {
    let sep = arg_str(args, 0)?;
    let text = arg_str(args, 1)?;
    Ok(Value::List(text.split(&sep as &str).map(|s| Value::Str(s.to_string())).collect()))
}

fn f_upper(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Str(arg_str(args, 0)?.to_uppercase()))
}

fn f_lower(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Str(arg_str(args, 0)?.to_lowercase()))
}

fn f_trim(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Str(arg_str(args, 0)?.trim().to_string()))
}

fn f_len(args: &[Value]) -> Result<Value, TemplateError> {
    let n = match arg(args, 0)? {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        _ => 0,
    };
    Ok(Value::Number(n as f64))
}

fn f_to_string(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::Str(arg_str(args, 0)?))
}

// --- lists ---

fn f_list(args: &[Value]) -> Result<Value, TemplateError> {
    Ok(Value::List(args.to_vec()))
}

fn f_append(args: &[Value]) -> Result<Value, TemplateError> {
    let mut items = arg(args, 0)?.as_list().unwrap_or(&[]).to_vec();
    items.extend(args[1..].iter().cloned());
    Ok(Value::List(items))
}

fn f_slice(args: &[Value]) -> Result<Value, TemplateError> {
    let items = arg(args, 0)?.as_list().unwrap_or(&[]).to_vec();
    let len = items.len();
    let start = args.get(1).and_then(Value::as_number).map(|n| n as usize).unwrap_or(0).min(len);
    let end = args.get(2).and_then(Value::as_number).map(|n| n as usize).unwrap_or(len).clamp(start, len);
    Ok(Value::List(items[start..end].to_vec()))
}

// --- defaults ---

fn f_default(args: &[Value]) -> Result<Value, TemplateError> {
    let default_value = arg(args, 0)?.clone();
    let value = arg(args, 1)?;
    if value.is_zero() {
        Ok(default_value)
    } else {
        Ok(value.clone())
    }
}

#[allow(dead_code)]
fn empty_map() -> BTreeMap<String, Value> {
    BTreeMap::new()
}
