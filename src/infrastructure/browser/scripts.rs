//! JavaScript snippets evaluated inside a frame's execution context.
//!
//! Every snippet is a self-contained expression; arguments are embedded as JSON
//! literals so labels with quotes or non-ASCII characters survive intact.

use super::ElementQuery;

const FOLD: &str = "const fold = (s) => (s || '').normalize('NFKD').replace(/[\\u0300-\\u036f]/g, '').replace(/\\s+/g, ' ').trim().toLowerCase();";

const VISIBLE: &str =
    "const visible = (el) => !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);";

const TEXT_OF: &str = "const textOf = (el) => el.innerText || el.textContent || '';";

fn literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

pub fn body_text() -> String {
    "document.body ? document.body.innerText : ''".to_string()
}

pub fn ready_state() -> String {
    "document.readyState".to_string()
}

/// Resolves to `true` once the resource count stopped growing for a second
/// with the document complete, `false` when `timeout_ms` runs out first.
pub fn network_idle(timeout_ms: u64) -> String {
    format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            const count = () => {{ try {{ return performance.getEntriesByType('resource').length; }} catch (_) {{ return 0; }} }};
            let last = count();
            let stable = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const cur = count();
                if (document.readyState === 'complete' && cur === last) {{
                    stable += interval;
                    if (stable >= idleMs) return true;
                }} else {{
                    stable = 0;
                }}
                last = cur;
            }}
            return false;
        }})()"#
    )
}

pub fn click_query(query: &ElementQuery) -> String {
    let test = match query {
        ElementQuery::ExactText { text, .. } => format!(
            "const target = fold({}); const test = (el) => fold(textOf(el)) === target;",
            literal(text)
        ),
        ElementQuery::ContainsText { text, .. } => format!(
            "const target = fold({}); const test = (el) => fold(textOf(el)).includes(target);",
            literal(text)
        ),
        ElementQuery::Attribute {
            attributes,
            value,
            partial,
            ..
        } => format!(
            "const target = fold({}); const names = {}; const partial = {}; \
             const test = (el) => names.some((n) => {{ const v = fold(el.getAttribute(n)); \
             return v.length > 0 && (partial ? v.includes(target) : v === target); }});",
            literal(value),
            serde_json::Value::from(attributes.clone()),
            partial
        ),
    };

    format!(
        r#"(() => {{
            {FOLD}
            {VISIBLE}
            {TEXT_OF}
            {test}
            const hit = Array.from(document.querySelectorAll({scope})).filter(visible).find(test);
            if (!hit) return false;
            hit.scrollIntoView({{ block: 'center' }});
            hit.click();
            return true;
        }})()"#,
        scope = literal(query.scope()),
    )
}

pub fn candidate_texts(selector: &str) -> String {
    format!(
        "(() => {{ {TEXT_OF} return Array.from(document.querySelectorAll({})).map(textOf); }})()",
        literal(selector)
    )
}

pub fn click_candidate(selector: &str, index: usize) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelectorAll({selector})[{index}];
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"#,
        selector = literal(selector),
    )
}
