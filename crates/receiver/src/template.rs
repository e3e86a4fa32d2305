//! Template rendering utilities using Tera
//!
//! Task definitions are written with Go template syntax (`{{ .Values.job }}`). This module
//! converts that syntax to Tera and renders it with the alert's common labels bound under
//! `Values`.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tera::{Context, Tera};

use crate::{Error, Result};

/// Name the common labels are bound to inside task definitions.
pub const VALUES_KEY: &str = "Values";

const TEMPLATE_NAME: &str = "definition";

lazy_static! {
    static ref ACTION: Regex =
        Regex::new(r"(?s)\{\{(-\s)?(\s*)(.*?)(\s*)(\s-)?\}\}").unwrap();
    static ref VARIABLE: Regex = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref FIELD: Regex = Regex::new(r"(^|[\s(,|])\.([A-Za-z_])").unwrap();
    static ref COMPARISON: Regex =
        Regex::new(r"^(eq|ne|lt|le|gt|ge)\s+(\S+)\s+(\S+)$").unwrap();
    static ref RANGE: Regex = Regex::new(
        r"^range\s+\$([A-Za-z_][A-Za-z0-9_]*)(?:\s*,\s*\$([A-Za-z_][A-Za-z0-9_]*))?\s*:=\s*(.+)$"
    )
    .unwrap();
    static ref DEFAULT_DOUBLE: Regex = Regex::new(r#"\|\s*default\s+"([^"]*)""#).unwrap();
    static ref DEFAULT_SINGLE: Regex = Regex::new(r#"\|\s*default\s+'([^']*)'"#).unwrap();
    static ref DEFAULT_BARE: Regex = Regex::new(r#"\|\s*default\s+([^\s|"']+)"#).unwrap();
    static ref LABEL_LOOKUP: Regex = Regex::new(r"\bValues(?:\.[A-Za-z_][A-Za-z0-9_]*)+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    If,
    For,
}

/// Convert Go template syntax to Tera syntax
///
/// Handles common patterns:
/// - {{ .path.to.value }} -> {{ path.to.value }}
/// - {{ .Values.team }} -> {{ Values.team | default(value="") }}
/// - {{ .value | default "default" }} -> {{ value | default(value="default") }}
/// - {{ if eq .a "x" }}..{{ else }}..{{ end }} -> {% if a == "x" %}..{% else %}..{% endif %}
/// - {{ range $k, $v := .Values }}..{{ end }} -> {% for k, v in Values %}..{% endfor %}
/// - {{/* comment */}} -> {# comment #}
///
/// Actions with no Tera counterpart (`with`, `define`, dot-rebinding `range`) are left as-is
/// and surface as a parse error when rendering.
pub fn convert_go_to_tera(template: &str) -> String {
    let mut blocks: Vec<Block> = Vec::new();

    ACTION
        .replace_all(template, |caps: &Captures| {
            let trim_left = caps.get(1).is_some();
            let trim_right = caps.get(5).is_some();
            let body = &caps[3];

            if body.starts_with("/*") && body.ends_with("*/") {
                let comment = body.trim_start_matches("/*").trim_end_matches("*/");
                return format!("{{#{}#}}", comment);
            }

            let statement = |inner: String| {
                format!(
                    "{}{}{}",
                    if trim_left { "{%- " } else { "{% " },
                    inner,
                    if trim_right { " -%}" } else { " %}" }
                )
            };

            if let Some(condition) = body.strip_prefix("if ") {
                blocks.push(Block::If);
                return statement(format!("if {}", label_defaults(&convert_expression(condition))));
            }
            if let Some(condition) = body.strip_prefix("else if ") {
                return statement(format!("elif {}", label_defaults(&convert_expression(condition))));
            }
            if body == "else" {
                return statement("else".to_string());
            }
            if let Some(range) = RANGE.captures(body) {
                blocks.push(Block::For);
                let source = convert_expression(&range[3]);
                return match range.get(2) {
                    Some(value) => statement(format!("for {}, {} in {}", &range[1], value.as_str(), source)),
                    None => statement(format!("for {} in {}", &range[1], source)),
                };
            }
            if body == "end" {
                return match blocks.pop() {
                    Some(Block::If) => statement("endif".to_string()),
                    Some(Block::For) => statement("endfor".to_string()),
                    None => caps[0].to_string(),
                };
            }
            if ["with ", "define ", "template ", "block ", "range "]
                .iter()
                .any(|keyword| body.starts_with(keyword))
            {
                return caps[0].to_string();
            }

            format!(
                "{}{}{}",
                if trim_left { "{{- ".to_string() } else { format!("{{{{{}", &caps[2]) },
                label_defaults(&convert_expression(body)),
                if trim_right { " -}}".to_string() } else { format!("{}}}}}", &caps[4]) }
            )
        })
        .into_owned()
}

fn convert_expression(expression: &str) -> String {
    let expression = expression.trim();
    let converted = VARIABLE.replace_all(expression, "$1");
    let converted = FIELD.replace_all(&converted, "${1}${2}");

    let converted = match COMPARISON.captures(&converted) {
        Some(caps) => {
            let operator = match &caps[1] {
                "eq" => "==",
                "ne" => "!=",
                "lt" => "<",
                "le" => "<=",
                "gt" => ">",
                _ => ">=",
            };
            format!("{} {} {}", &caps[2], operator, &caps[3])
        }
        None => converted.into_owned(),
    };

    let converted = DEFAULT_DOUBLE.replace_all(&converted, "| default(value=\"$1\")");
    let converted = DEFAULT_SINGLE.replace_all(&converted, "| default(value=\"$1\")");
    DEFAULT_BARE
        .replace_all(&converted, "| default(value=\"$1\")")
        .into_owned()
}

// A label the alert does not carry renders as an empty string. `default` only catches
// undefined lookups when it is the first filter in the chain.
fn label_defaults(expression: &str) -> String {
    let mut converted = String::with_capacity(expression.len());
    let mut last = 0;
    for lookup in LABEL_LOOKUP.find_iter(expression) {
        converted.push_str(&expression[last..lookup.end()]);
        let has_default = expression[lookup.end()..]
            .trim_start()
            .strip_prefix('|')
            .map_or(false, |filters| filters.trim_start().starts_with("default"));
        if !has_default {
            converted.push_str(" | default(value=\"\")");
        }
        last = lookup.end();
    }
    converted.push_str(&expression[last..]);
    converted
}

/// Render a task definition with the alert's common labels bound as `Values`.
pub fn render_template(template: &str, labels: &BTreeMap<String, String>) -> Result<String> {
    let mut output = Vec::new();
    render_template_to(template, labels, &mut output)?;
    String::from_utf8(output)
        .map_err(|e| Error::Render(format!("Rendered template is not valid UTF-8: {}", e)))
}

/// Render into `output`. When evaluation fails part way, everything rendered before the
/// failing node is left in `output`; a template that does not parse leaves it empty.
pub fn render_template_to(
    template: &str,
    labels: &BTreeMap<String, String>,
    output: &mut Vec<u8>,
) -> Result<()> {
    let converted_template = convert_go_to_tera(template);

    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, &converted_template)
        .map_err(|e| Error::Render(format!("Failed to parse template: {}", error_chain(&e))))?;

    let mut context = Context::new();
    context.insert(VALUES_KEY, labels);

    tera.render_to(TEMPLATE_NAME, &context, output)
        .map_err(|e| Error::Render(format!("Failed to render template: {}", error_chain(&e))))
}

// Tera keeps the useful part of the message in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_convert_go_to_tera() {
        let tests = vec![
            ("{{ .name }}", "{{ name }}"),
            ("{{ .path.to.value }}", "{{ path.to.value }}"),
            ("{{.name}}", "{{name}}"),
            ("{{ .name | default \"unknown\" }}", "{{ name | default(value=\"unknown\") }}"),
            ("{{ .count | default 0 }}", "{{ count | default(value=\"0\") }}"),
            ("{{- .Values.job -}}", "{{- Values.job | default(value=\"\") -}}"),
            (
                "{{ .Values.env | default \"dev\" }}",
                "{{ Values.env | default(value=\"dev\") }}",
            ),
            (
                "{{ if .Values.env }}a{{ end }}",
                "{% if Values.env | default(value=\"\") %}a{% endif %}",
            ),
            (
                "{{ if eq .Values.env \"prod\" }}a{{ else if .Values.x }}b{{ else }}c{{ end }}",
                "{% if Values.env | default(value=\"\") == \"prod\" %}a{% elif Values.x | default(value=\"\") %}b{% else %}c{% endif %}",
            ),
            (
                "{{ range $k, $v := .Values }}{{ $k }}={{ $v }}{{ end }}",
                "{% for k, v in Values %}{{ k }}={{ v }}{% endfor %}",
            ),
            ("{{/* note */}}x", "{# note #}x"),
        ];

        for (input, expected) in tests {
            assert_eq!(convert_go_to_tera(input), expected, "input: {}", input);
        }
    }

    #[test]
    fn test_nested_blocks_close_in_order() {
        let converted = convert_go_to_tera(
            "{{ range $v := .Values.items }}{{ if $v }}{{ $v }}{{ end }}{{ end }}",
        );
        assert_eq!(
            converted,
            "{% for v in Values.items %}{% if v %}{{ v }}{% endif %}{% endfor %}"
        );
    }

    #[test]
    fn test_render_template() {
        let labels = labels(&[("job", "disable_global_search"), ("namespace", "search")]);

        let template = "Job {{ .Values.job }} in namespace {{ .Values.namespace }}";
        let result = render_template(template, &labels).unwrap();
        assert_eq!(result, "Job disable_global_search in namespace search");

        let template_with_default = "Severity: {{ .Values.severity | default \"warning\" }}";
        let result = render_template(template_with_default, &labels).unwrap();
        assert_eq!(result, "Severity: warning");
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let template = "apiVersion: batch/v1\nkind: Job\nmetadata:\n  generateName: cleanup-";
        let result = render_template(template, &labels(&[("job", "x")])).unwrap();
        assert_eq!(result, template);
    }

    #[test]
    fn test_values_are_substituted() {
        let labels = labels(&[("job", "x")]);
        assert_eq!(render_template("{{ .Values.job }}", &labels).unwrap(), "x");
    }

    #[test]
    fn test_conditionals_over_labels() {
        let template = "{{ if eq .Values.severity \"critical\" }}page{{ else }}ticket{{ end }}";
        let critical = labels(&[("severity", "critical")]);
        assert_eq!(render_template(template, &critical).unwrap(), "page");
        assert_eq!(render_template(template, &labels(&[])).unwrap(), "ticket");
    }

    #[test]
    fn test_missing_label_renders_empty() {
        let labels = labels(&[("job", "x")]);
        let result = render_template("team: \"{{ .Values.team }}\"", &labels).unwrap();
        assert_eq!(result, "team: \"\"");
    }

    #[test]
    fn test_evaluation_error_keeps_rendered_prefix() {
        let labels = labels(&[("job", "x")]);
        let mut output = Vec::new();
        let err = render_template_to(
            "kind: Job\nname: {{ .Values.job }}\nowner: {{ .Release.Name }}",
            &labels,
            &mut output,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        assert_eq!(String::from_utf8(output).unwrap(), "kind: Job\nname: x\nowner: ");
    }

    #[test]
    fn test_unsupported_action_is_a_parse_error() {
        let mut output = Vec::new();
        let err = render_template_to("{{ with .Values }}x{{ end }}", &labels(&[]), &mut output)
            .unwrap_err();
        assert!(output.is_empty());
        match err {
            Error::Render(message) => assert!(message.contains("parse")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
