use std::sync::OnceLock;

use minijinja::{Environment, context};

use crate::entities::drug::{CanonicalDrug, ExtractionRecord, InteractionRecord};
use crate::entities::prescription::VerificationReport;
use crate::error::RxVerifyError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> Result<&'static Environment<'static>, RxVerifyError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_filter("truncate", |s: String, max_bytes: usize| -> String {
        if s.len() <= max_bytes {
            return s;
        }
        if max_bytes == 0 {
            return "…".to_string();
        }
        let mut boundary = max_bytes;
        while boundary > 0 && !s.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let mut out = s[..boundary].trim_end().to_string();
        out.push('…');
        out
    });
    // Table cells: one line, no column breaks.
    env.add_filter("cell", |s: String| -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    });
    env.add_template(
        "resolve.md.j2",
        include_str!("../../templates/report/resolve.md.j2"),
    )?;
    env.add_template(
        "interactions.md.j2",
        include_str!("../../templates/report/interactions.md.j2"),
    )?;
    env.add_template(
        "extraction.md.j2",
        include_str!("../../templates/report/extraction.md.j2"),
    )?;
    env.add_template(
        "verification.md.j2",
        include_str!("../../templates/report/verification.md.j2"),
    )?;

    let _ = ENV.set(env);
    Ok(ENV
        .get()
        .expect("ENV should be initialized by the time this is reached"))
}

pub fn resolve_markdown(query: &str, drug: &CanonicalDrug) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("resolve.md.j2")?;
    Ok(tmpl.render(context! {
        query => query,
        drug => drug,
    })?)
}

pub fn interactions_markdown(
    names: &[String],
    interactions: &[InteractionRecord],
) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("interactions.md.j2")?;
    Ok(tmpl.render(context! {
        names => names,
        interactions => interactions,
    })?)
}

pub fn extraction_markdown(records: &[ExtractionRecord]) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("extraction.md.j2")?;
    Ok(tmpl.render(context! { records => records })?)
}

pub fn verification_markdown(report: &VerificationReport) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("verification.md.j2")?;
    Ok(tmpl.render(context! { report => report })?)
}

/// Free-text guidance under a heading.
pub fn guidance_markdown(title: &str, text: &str) -> String {
    format!("# {}\n\n{}\n", title.trim(), text.trim())
}
