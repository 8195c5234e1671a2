use std::sync::LazyLock;

use regex::Regex;

use crate::models::ReportBody;

/// Bracketed source indices such as `[3]`.
static CITATION_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid citation index regex"));

/// Opening or closing citation tags, optionally namespaced (`<cite index="1-2">`,
/// `</x:cite>`). The wrapped text is kept.
static CITATION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?(?:[A-Za-z][\w.-]*:)?cite(?:\s[^>]*)?/?>").expect("valid citation tag regex")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Removal repeats until nothing changes, since dropping one marker can join the
/// pieces of another (`[<cite>4</cite>]`, `[[1]2]`).
pub fn strip_citations(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = {
            let without_index = CITATION_INDEX.replace_all(&current, "");
            CITATION_TAG.replace_all(&without_index, "").into_owned()
        };
        if next == current {
            break;
        }
        current = next;
    }
    WHITESPACE_RUN.replace_all(&current, " ").trim().to_string()
}

/// Cleans every free-text field. Research sources, severities and the score are
/// left exactly as extracted.
#[tracing::instrument(
    name = "pipeline_stage sanitize",
    skip_all,
    fields(pipeline.stage = "sanitize", sanitize.fields_changed)
)]
pub fn sanitize(mut body: ReportBody) -> ReportBody {
    let mut changed = 0usize;
    let mut clean = |field: &mut String| {
        let cleaned = strip_citations(field);
        if cleaned != *field {
            changed += 1;
            *field = cleaned;
        }
    };

    let intel = &mut body.competitive_intelligence;
    clean(&mut intel.market_reality);
    clean(&mut intel.industry_benchmarks);
    clean(&mut intel.competitive_set);

    for flag in &mut body.red_flags {
        clean(&mut flag.title);
        clean(&mut flag.description);
    }

    clean(&mut body.hidden_pattern);
    clean(&mut body.implications.short_term);
    clean(&mut body.implications.long_term);

    for recommendation in &mut body.recommendations {
        clean(recommendation);
    }

    clean(&mut body.next_steps);

    tracing::Span::current().record("sanitize.fields_changed", changed);

    body
}
