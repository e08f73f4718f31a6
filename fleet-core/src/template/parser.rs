//! Recursive-descent parser for template text. Templates interleave
//! literal text with `{{ expr }}` interpolations (spec.md §4.1); `expr`
//! is a field path, a literal, or a function call whose arguments are
//! themselves expressions.

use super::ast::{CompiledTemplate, Expr, Segment};
use super::value::Value;
use fleet_model::TemplateError;

pub fn parse(source: &str) -> Result<CompiledTemplate, TemplateError> {
    let mut segments = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0usize;
    let mut text_start = 0usize;

    while pos < bytes.len() {
        if bytes[pos] == b'{' && bytes.get(pos + 1) == Some(&b'{') {
            if pos > text_start {
                segments.push(Segment::Text(source[text_start..pos].to_string()));
            }
            let expr_start = pos + 2;
            let close = find_close(source, expr_start)?;
            let expr_src = source[expr_start..close].trim();
            let mut cursor = ExprCursor::new(expr_src, expr_start);
            let expr = cursor.parse_expr()?;
            cursor.expect_end()?;
            segments.push(Segment::Expr(expr));
            pos = close + 2;
            text_start = pos;
        } else {
            pos += 1;
        }
    }
    if text_start < source.len() {
        segments.push(Segment::Text(source[text_start..].to_string()));
    }

    Ok(CompiledTemplate {
        source: source.to_string(),
        segments,
    })
}

fn find_close(source: &str, from: usize) -> Result<usize, TemplateError> {
    source[from..]
        .find("}}")
        .map(|rel| from + rel)
        .ok_or_else(|| TemplateError::Parse {
            position: from,
            message: "unterminated \"{{\" interpolation".to_string(),
        })
}

/// Parses one expression out of the text between `{{` and `}}`.
struct ExprCursor<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    base_offset: usize,
}

impl<'a> ExprCursor<'a> {
    fn new(src: &'a str, base_offset: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            base_offset,
        }
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            position: self.base_offset + self.pos,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect_end(&mut self) -> Result<(), TemplateError> {
        self.skip_ws();
        if self.pos != self.bytes.len() {
            return Err(self.error(format!("unexpected trailing input: {}", &self.src[self.pos..])));
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<Expr, TemplateError> {
        self.skip_ws();
        match self.peek() {
            Some(b'.') => self.parse_field_path(),
            Some(b'"') => self.parse_string().map(Expr::Literal),
            Some(c) if c.is_ascii_digit() || c == b'-' => self.parse_number().map(Expr::Literal),
            Some(c) if c.is_ascii_alphabetic() || c == b'_' => self.parse_ident_expr(),
            _ => Err(self.error("expected expression")),
        }
    }

    fn parse_field_path(&mut self) -> Result<Expr, TemplateError> {
        let mut segments = Vec::new();
        loop {
            if self.peek() != Some(b'.') {
                break;
            }
            self.pos += 1;
            let start = self.pos;
            while self
                .peek()
                .map(|c| c.is_ascii_alphanumeric() || c == b'_')
                .unwrap_or(false)
            {
                self.pos += 1;
            }
            if self.pos == start {
                return Err(self.error("expected field name after '.'"));
            }
            segments.push(self.src[start..self.pos].to_string());
        }
        Ok(Expr::Field(segments))
    }

    fn parse_string(&mut self) -> Result<Value, TemplateError> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.pos += 1;
        let start = self.pos;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped as char);
                    self.pos += 1;
                    return self.continue_string(out);
                }
                Some(_) => self.pos += 1,
            }
        }
        Ok(Value::Str(out))
    }

    fn continue_string(&mut self, mut out: String) -> Result<Value, TemplateError> {
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    return Ok(Value::Str(out));
                }
                Some(b'\\') => {
                    out.push_str(&self.src[start..self.pos]);
                    self.pos += 1;
                    let escaped = self.peek().ok_or_else(|| self.error("dangling escape"))?;
                    out.push(escaped as char);
                    self.pos += 1;
                    return self.continue_string(out);
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn parse_number(&mut self) -> Result<Value, TemplateError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self.peek().map(|c| c.is_ascii_digit() || c == b'.').unwrap_or(false) {
            self.pos += 1;
        }
        self.src[start..self.pos]
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| self.error("invalid number literal"))
    }

    fn parse_ident_expr(&mut self) -> Result<Expr, TemplateError> {
        let start = self.pos;
        while self
            .peek()
            .map(|c| c.is_ascii_alphanumeric() || c == b'_')
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        let ident = &self.src[start..self.pos];
        self.skip_ws();
        match ident {
            "true" => return Ok(Expr::Literal(Value::Bool(true))),
            "false" => return Ok(Expr::Literal(Value::Bool(false))),
            "null" | "nil" => return Ok(Expr::Literal(Value::Null)),
            _ => {}
        }
        if self.peek() != Some(b'(') {
            return Err(self.error(format!("expected '(' after function name '{ident}'")));
        }
        self.pos += 1;
        let args = self.parse_args()?;
        Ok(Expr::Call(ident.to_string(), args))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            let arg = self.parse_expr()?;
            args.push(arg);
            self.skip_ws();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                }
                Some(b')') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("expected ',' or ')' in argument list")),
            }
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_text_and_expr() {
        let tpl = parse("Status: {{ .status.phase }}!").unwrap();
        assert_eq!(tpl.segments.len(), 3);
    }

    #[test]
    fn parses_nested_calls() {
        let tpl = parse(r#"{{ color("red", .status.phase) }}"#).unwrap();
        assert_eq!(tpl.segments.len(), 1);
    }

    #[test]
    fn reports_parse_error_with_position() {
        let err = parse("{{ .status. }}").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn unterminated_interpolation_is_an_error() {
        let err = parse("{{ .status").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }
}
