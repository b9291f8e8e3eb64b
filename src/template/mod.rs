//! Placeholder engine: turns one stored sniplet plus live context into final
//! text, the custom fields still requiring user input, and the net counter
//! deltas for the caller to commit.
//!
//! Single pass per fragment: inclusion expansion first, then counters, then
//! placeholders. Deltas are never written back here — a failed or abandoned
//! pass must leave the persistent counters table untouched.

pub mod datetime;

use crate::document::{Counters, DocumentContainer};
use crate::tree::Sniplet;
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Legacy compatibility marker disabling substitution when it prefixes a
/// sniplet name (case-insensitive).
const NOSUBST_MARKER: &str = "[NOSUBST]";

/// `$[SNIPLET(name)]` / `$[CLIPPING(name)]` inline raw content (pre form);
/// the brace spelling inlines fully processed content (post form).
static INCLUSION_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\[(?:SNIPLET|CLIPPING)(?:\(([^)]+)\)|\{([^}]+)\})\]").expect("inclusion regex")
});

/// `#[name]` / `#[name(increment)]`.
static COUNTER_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\[([^\]()]+)(?:\((-?\d+)\))?\]").expect("counter regex"));

/// `$[NAME]`, `$[NAME(format)]`, `$[NAME{default}]` and combinations.
static PLACEHOLDER_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\[([^\]\(\)\{\}]+)(?:\(([^)]*)\))?(?:\{([^}]*)\})?\]")
        .expect("placeholder regex")
});

/// Input kind requested from the user for a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Select { options: Vec<String> },
}

/// A template token with no built-in meaning, deferred to the caller for
/// user-supplied resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub value: String,
}

/// Result of processing one sniplet.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ProcessedSniplet {
    pub content: String,
    /// True when substitution was skipped entirely.
    #[serde(skip_serializing_if = "is_false")]
    pub nosubst: bool,
    /// Unresolved custom fields, in encounter order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    /// Net counter increments; committed by the caller after success.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub counter_deltas: BTreeMap<String, i64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Host/session context consulted by built-in placeholders.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    /// Display names along the open folder path, space name first.
    pub path_names: Vec<String>,
    /// BCP 47 language tag driving date styles and ordinal suffixes.
    pub locale: String,
    /// Identification string for `$[HOSTAPP]`.
    pub host_app: String,
    /// Identification string for `$[UA]`.
    pub user_agent: String,
    /// Fixed instant for `$[DATE]`/`$[TIME]`; `None` renders the current one.
    pub now: Option<DateTime<Local>>,
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self {
            path_names: Vec::new(),
            locale: "en-US".to_string(),
            host_app: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            user_agent: format!(
                "{}/{} ({})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            ),
            now: None,
        }
    }
}

impl ProcessContext {
    fn instant(&self) -> DateTime<Local> {
        self.now.unwrap_or_else(Local::now)
    }
}

fn name_disables_substitution(name: &str) -> bool {
    name.get(..NOSUBST_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(NOSUBST_MARKER))
}

/// Process one sniplet against its document.
///
/// The returned counter deltas are not applied here; the caller commits them
/// once the pass (and any following save) succeeds.
pub async fn process_sniplet(
    doc: &DocumentContainer,
    sniplet: &Sniplet,
    ctx: &ProcessContext,
) -> ProcessedSniplet {
    let mut stack = vec![sniplet.name.clone()];
    process_inner(doc, sniplet, ctx, &mut stack).await
}

/// Full pipeline for one fragment. Boxed because post-form inclusions
/// recurse through it.
fn process_inner<'a>(
    doc: &'a DocumentContainer,
    sniplet: &'a Sniplet,
    ctx: &'a ProcessContext,
    stack: &'a mut Vec<String>,
) -> BoxFuture<'a, ProcessedSniplet> {
    Box::pin(async move {
        if sniplet.nosubst || name_disables_substitution(&sniplet.name) {
            return ProcessedSniplet {
                content: sniplet.content.clone(),
                nosubst: true,
                ..Default::default()
            };
        }

        let mut deltas = BTreeMap::new();
        let text =
            expand_inclusions(doc, sniplet.content.clone(), ctx, stack, &mut deltas).await;
        let text = substitute_counters(&doc.counters, &text, &mut deltas);
        let (content, custom_fields) = substitute_placeholders(&text, sniplet, ctx);

        ProcessedSniplet {
            content,
            nosubst: false,
            custom_fields,
            counter_deltas: deltas,
        }
    })
}

struct InclusionHit {
    start: usize,
    end: usize,
    name: String,
    /// Post form: inline the target's processed content instead of its raw
    /// content.
    post: bool,
}

/// Inclusion pass. Targets resolve by exact name, depth-first across the
/// whole document. Names already on the stack (cycles) and names that do not
/// resolve to a sniplet leave the token verbatim.
fn expand_inclusions<'a>(
    doc: &'a DocumentContainer,
    text: String,
    ctx: &'a ProcessContext,
    stack: &'a mut Vec<String>,
    deltas: &'a mut BTreeMap<String, i64>,
) -> BoxFuture<'a, String> {
    Box::pin(async move {
        if !INCLUSION_RX.is_match(&text) {
            return text;
        }
        let hits: Vec<InclusionHit> = INCLUSION_RX
            .captures_iter(&text)
            .map(|caps| {
                let whole = caps.get(0).expect("whole match");
                let (name, post) = match caps.get(1) {
                    Some(pre) => (pre.as_str().to_string(), false),
                    None => (caps[2].to_string(), true),
                };
                InclusionHit {
                    start: whole.start(),
                    end: whole.end(),
                    name,
                    post,
                }
            })
            .collect();

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for hit in hits {
            out.push_str(&text[last..hit.start]);
            let token = &text[hit.start..hit.end];
            last = hit.end;

            let target = match doc.find_sniplet_by_name(&hit.name) {
                Some(target) if !stack.contains(&hit.name) => target,
                _ => {
                    out.push_str(token);
                    continue;
                }
            };
            stack.push(hit.name);
            if hit.post {
                // full pipeline; counters propagate upward, custom fields are
                // re-detected against the parent's own copy
                let processed = process_inner(doc, target, ctx, &mut *stack).await;
                for (name, delta) in processed.counter_deltas {
                    *deltas.entry(name).or_insert(0) += delta;
                }
                out.push_str(&processed.content);
            } else {
                // raw content; chained inclusions expand before any other
                // processing happens
                let expanded =
                    expand_inclusions(doc, target.content.clone(), ctx, &mut *stack, &mut *deltas)
                        .await;
                out.push_str(&expanded);
            }
            stack.pop();
        }
        out.push_str(&text[last..]);
        out
    })
}

/// Counter pass. The first occurrence of a name reads the table; later
/// occurrences advance a running value without re-reading storage.
fn substitute_counters(
    counters: &Counters,
    text: &str,
    deltas: &mut BTreeMap<String, i64>,
) -> String {
    let mut running: BTreeMap<String, i64> = BTreeMap::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in COUNTER_RX.captures_iter(text) {
        let whole = caps.get(0).expect("whole match");
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let name = caps[1].to_string();
        let increment = caps
            .get(2)
            .and_then(|arg| arg.as_str().parse::<i64>().ok())
            .unwrap_or(1);
        let value = *running
            .entry(name.clone())
            .or_insert_with(|| counters.value_or_start(&name));
        out.push_str(&value.to_string());
        running.insert(name.clone(), value + increment);
        *deltas.entry(name).or_insert(0) += increment;
    }
    out.push_str(&text[last..]);
    out
}

/// Placeholder pass. Built-in names dispatch case-sensitively; everything
/// else becomes a custom field and the token stays in the output for the
/// caller to patch.
fn substitute_placeholders(
    text: &str,
    sniplet: &Sniplet,
    ctx: &ProcessContext,
) -> (String, Vec<CustomField>) {
    let mut fields: Vec<CustomField> = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RX.captures_iter(text) {
        let whole = caps.get(0).expect("whole match");
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let name = &caps[1];
        let format = caps.get(2).map(|m| m.as_str());
        let default = caps.get(3).map(|m| m.as_str());
        let replacement = match name {
            // a stranded inclusion token (cycle, unknown target) is not a
            // custom field
            "SNIPLET" | "CLIPPING" => None,
            "NAME" => Some(sniplet.name.clone()),
            "FOLDER" => Some(ctx.path_names.last().cloned().unwrap_or_default()),
            "PATH" => Some(ctx.path_names.join(format.unwrap_or("/"))),
            "DATE" => Some(datetime::format_date(&ctx.instant(), format, &ctx.locale)),
            "TIME" => Some(datetime::format_time(&ctx.instant(), format, &ctx.locale)),
            "HOSTAPP" => Some(ctx.host_app.clone()),
            "UA" => Some(ctx.user_agent.clone()),
            custom => {
                if !fields.iter().any(|field| field.name == custom) {
                    fields.push(custom_field(custom, default));
                }
                None
            }
        };
        match replacement {
            Some(value) => out.push_str(&value),
            None => out.push_str(whole.as_str()),
        }
    }
    out.push_str(&text[last..]);
    (out, fields)
}

fn custom_field(name: &str, default: Option<&str>) -> CustomField {
    match default {
        Some(default) if default.contains('|') => {
            let options: Vec<String> = default.split('|').map(str::to_string).collect();
            let value = options[0].clone();
            CustomField {
                name: name.to_string(),
                kind: FieldKind::Select { options },
                value,
            }
        }
        _ => CustomField {
            name: name.to_string(),
            kind: FieldKind::Text,
            value: default.unwrap_or_default().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Children;
    use crate::tree::{Folder, TreeItem};
    use chrono::TimeZone;

    fn doc_with(items: Vec<TreeItem>) -> DocumentContainer {
        DocumentContainer {
            children: Children::Live(items),
            ..DocumentContainer::new()
        }
    }

    fn sniplet(name: &str, content: &str) -> Sniplet {
        Sniplet::new(Some(name.to_string()), content)
    }

    fn ctx() -> ProcessContext {
        ProcessContext {
            path_names: vec!["Personal".into(), "Work".into()],
            now: Some(Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 2).unwrap()),
            ..ProcessContext::default()
        }
    }

    #[tokio::test]
    async fn test_greeting_with_fresh_counter() {
        let s = sniplet("Greeting", "Hello $[NAME], ticket #[n]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "Hello Greeting, ticket 0");
        assert_eq!(result.counter_deltas, BTreeMap::from([("n".into(), 1)]));
        assert!(result.custom_fields.is_empty());
    }

    #[tokio::test]
    async fn test_nosubst_flag_returns_content_verbatim() {
        let mut s = sniplet("Raw", "Hello $[NAME], #[n], $[custom]");
        s.nosubst = true;
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "Hello $[NAME], #[n], $[custom]");
        assert!(result.nosubst);
        assert!(result.custom_fields.is_empty());
        assert!(result.counter_deltas.is_empty());
    }

    #[tokio::test]
    async fn test_nosubst_name_marker_is_case_insensitive() {
        let s = sniplet("[NoSubst] literal", "keep $[NAME]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "keep $[NAME]");
        assert!(result.nosubst);
    }

    #[tokio::test]
    async fn test_counter_multiple_occurrences_accumulate() {
        let s = sniplet("C", "#[n] #[n] #[n(5)] #[n]");
        let mut doc = doc_with(vec![s.clone().into()]);
        doc.counters.set("n", 10);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "10 11 12 17");
        assert_eq!(result.counter_deltas, BTreeMap::from([("n".into(), 8)]));
        // storage untouched until the caller commits
        assert_eq!(doc.counters.get("n"), Some(10));
    }

    #[tokio::test]
    async fn test_counter_negative_increment() {
        let s = sniplet("C", "#[n(-2)] #[n]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "0 -2");
        assert_eq!(result.counter_deltas, BTreeMap::from([("n".into(), -1)]));
    }

    #[tokio::test]
    async fn test_malformed_counter_argument_left_verbatim() {
        let s = sniplet("C", "#[n(x)]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "#[n(x)]");
        assert!(result.counter_deltas.is_empty());
    }

    #[tokio::test]
    async fn test_builtin_placeholders() {
        let s = sniplet("S", "$[FOLDER] | $[PATH] | $[PATH( > )] | $[HOSTAPP]");
        let doc = doc_with(vec![s.clone().into()]);
        let context = ctx();
        let result = process_sniplet(&doc, &s, &context).await;
        assert_eq!(
            result.content,
            format!(
                "Work | Personal/Work | Personal > Work | {}",
                context.host_app
            )
        );
    }

    #[tokio::test]
    async fn test_date_placeholder_styles_and_patterns() {
        let s = sniplet("S", "$[DATE(MMMM D, YYYY)] at $[TIME(short)]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "March 5, 2024 at 2:07 PM");
    }

    #[tokio::test]
    async fn test_custom_fields_ordered_and_deduplicated() {
        let s = sniplet(
            "S",
            "$[Client{Acme}] $[Urgency{low|high}] $[Client] $[Note]",
        );
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // tokens stay in the output for the caller to patch
        assert_eq!(
            result.content,
            "$[Client{Acme}] $[Urgency{low|high}] $[Client] $[Note]"
        );
        let names: Vec<&str> = result
            .custom_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["Client", "Urgency", "Note"]);
        assert_eq!(result.custom_fields[0].value, "Acme");
        assert_eq!(result.custom_fields[0].kind, FieldKind::Text);
        assert_eq!(
            result.custom_fields[1].kind,
            FieldKind::Select {
                options: vec!["low".into(), "high".into()]
            }
        );
        assert_eq!(result.custom_fields[1].value, "low");
        assert_eq!(result.custom_fields[2].value, "");
    }

    #[tokio::test]
    async fn test_pre_inclusion_inlines_raw_content() {
        let sig = sniplet("Sig", "-- $[NAME]");
        let s = sniplet("Mail", "Hello\n$[SNIPLET(Sig)]");
        let doc = doc_with(vec![s.clone().into(), sig.into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // raw inline means $[NAME] resolves in the parent's context
        assert_eq!(result.content, "Hello\n-- Mail");
    }

    #[tokio::test]
    async fn test_post_inclusion_inlines_processed_content() {
        let sig = sniplet("Sig", "-- $[NAME], #[uses]");
        let s = sniplet("Mail", "Hello\n$[SNIPLET{Sig}]");
        let doc = doc_with(vec![s.clone().into(), sig.into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // processed inline keeps the child's own name and propagates deltas
        assert_eq!(result.content, "Hello\n-- Sig, 0");
        assert_eq!(result.counter_deltas, BTreeMap::from([("uses".into(), 1)]));
    }

    #[tokio::test]
    async fn test_post_inclusion_discards_child_fields() {
        let inner = sniplet("Inner", "ask $[Who{them}]");
        let s = sniplet("Outer", "$[SNIPLET{Inner}] and $[Who]");
        let doc = doc_with(vec![s.clone().into(), inner.into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // the child's unresolved token is re-detected against the parent copy
        assert_eq!(result.content, "ask $[Who{them}] and $[Who]");
        let names: Vec<&str> = result
            .custom_fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, ["Who"]);
        assert_eq!(result.custom_fields[0].value, "them");
    }

    #[tokio::test]
    async fn test_inclusion_cycle_leaves_token_verbatim() {
        let a = sniplet("A", "a: $[SNIPLET(B)]");
        let b = sniplet("B", "b: $[SNIPLET(A)]");
        let doc = doc_with(vec![a.clone().into(), b.into()]);
        let result = process_sniplet(&doc, &a, &ctx()).await;
        assert_eq!(result.content, "a: b: $[SNIPLET(A)]");
        assert!(result.custom_fields.is_empty());
    }

    #[tokio::test]
    async fn test_self_inclusion_is_guarded() {
        let a = sniplet("A", "me: $[SNIPLET{A}]");
        let doc = doc_with(vec![a.clone().into()]);
        let result = process_sniplet(&doc, &a, &ctx()).await;
        assert_eq!(result.content, "me: $[SNIPLET{A}]");
    }

    #[tokio::test]
    async fn test_unknown_inclusion_target_left_verbatim() {
        let s = sniplet("S", "$[SNIPLET(Nowhere)]");
        let doc = doc_with(vec![s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        assert_eq!(result.content, "$[SNIPLET(Nowhere)]");
        assert!(result.custom_fields.is_empty());
    }

    #[tokio::test]
    async fn test_inclusion_lookup_is_case_sensitive_and_depth_first() {
        let mut folder = Folder::new("F");
        folder.seq = 1;
        let mut nested = sniplet("Sig", "nested");
        nested.seq = 1;
        folder.children.push(nested.into());
        let mut top = sniplet("Sig", "top");
        top.seq = 2;
        let s = sniplet("S", "$[CLIPPING(Sig)] $[CLIPPING(sig)]");
        let doc = doc_with(vec![folder.into(), top.into(), s.clone().into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // depth-first finds the nested copy first; wrong case stays verbatim
        assert_eq!(result.content, "nested $[CLIPPING(sig)]");
    }

    #[tokio::test]
    async fn test_nosubst_child_inlines_raw_via_post_form() {
        let mut raw = sniplet("Raw", "keep $[NAME]");
        raw.nosubst = true;
        let s = sniplet("S", "$[SNIPLET{Raw}]");
        let doc = doc_with(vec![s.clone().into(), raw.into()]);
        let result = process_sniplet(&doc, &s, &ctx()).await;
        // the child skipped its own pass (its name would have read "Raw"),
        // so its surviving tokens resolve in the parent's context
        assert_eq!(result.content, "keep S");
    }

    #[test]
    fn test_processed_sniplet_omits_empty_sections() {
        let value = serde_json::to_value(ProcessedSniplet {
            content: "x".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(value.get("customFields").is_none());
        assert!(value.get("custom_fields").is_none());
        assert!(value.get("counter_deltas").is_none());
        assert!(value.get("nosubst").is_none());
    }
}
