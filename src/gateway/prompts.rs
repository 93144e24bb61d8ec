use std::sync::OnceLock;

use minijinja::{Environment, context};

use crate::error::RxVerifyError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> Result<&'static Environment<'static>, RxVerifyError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_template(
        "dosage.txt.j2",
        include_str!("../../templates/prompts/dosage.txt.j2"),
    )?;
    env.add_template(
        "alternative.txt.j2",
        include_str!("../../templates/prompts/alternative.txt.j2"),
    )?;
    env.add_template(
        "extraction_primary.txt.j2",
        include_str!("../../templates/prompts/extraction_primary.txt.j2"),
    )?;
    env.add_template(
        "extraction_secondary.txt.j2",
        include_str!("../../templates/prompts/extraction_secondary.txt.j2"),
    )?;

    let _ = ENV.set(env);
    Ok(ENV
        .get()
        .expect("ENV should be initialized by the time this is reached"))
}

pub fn dosage(age: u32, drug: &str, dosage: &str) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("dosage.txt.j2")?;
    Ok(tmpl.render(context! {
        age => age,
        drug => drug.trim(),
        dosage => dosage.trim(),
    })?)
}

pub fn alternative(problem_drug: &str, interacting_drug: &str) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("alternative.txt.j2")?;
    Ok(tmpl.render(context! {
        problem_drug => problem_drug.trim(),
        interacting_drug => interacting_drug.trim(),
    })?)
}

/// Strict prompt for the primary provider; the reply may still carry prose around the array.
pub fn extraction_primary(text: &str) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("extraction_primary.txt.j2")?;
    Ok(tmpl.render(context! { text => text })?)
}

pub fn extraction_secondary(text: &str) -> Result<String, RxVerifyError> {
    let tmpl = env()?.get_template("extraction_secondary.txt.j2")?;
    Ok(tmpl.render(context! { text => text })?)
}
