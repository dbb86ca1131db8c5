//! jq preprocessing for `json-gen` samples.
use anyhow::{Context, Result, anyhow};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` over `input`; every output of the filter is one value.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in outputs {
        let v = item.map_err(|e| anyhow!("jq error: {e}"))?;
        let text = v.to_string();
        out.push(serde_json::from_str(&text).with_context(|| format!("jq produced non-JSON output `{text}`"))?);
    }
    log::debug!("jq `{filter_src}` produced {} value(s)", out.len());
    Ok(out)
}

/// Apply `filter` to every sample and flatten the outputs; no filter keeps
/// the samples as they are.
pub fn preprocess(filter: Option<&str>, samples: Vec<Value>) -> Result<Vec<Value>> {
    let Some(filter) = filter else {
        return Ok(samples);
    };
    let mut out = Vec::new();
    for sample in &samples {
        out.extend(run_jaq(filter, sample)?);
    }
    Ok(out)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_outputs_become_samples() {
        let doc = json!({"data": {"items": [{"id": 1}, {"id": 2}]}});
        let out = run_jaq(".data.items[]", &doc).unwrap();
        assert_eq!(out, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn preprocess_flattens_and_passes_through() {
        let samples = vec![json!({"a": [1, 2]}), json!({"a": [3]})];
        assert_eq!(preprocess(Some(".a[]"), samples.clone()).unwrap(), vec![json!(1), json!(2), json!(3)]);
        assert_eq!(preprocess(None, samples.clone()).unwrap(), samples);
    }

    #[test]
    fn bad_filter_is_an_error() {
        assert!(run_jaq(".[", &json!({})).is_err());
        assert!(run_jaq("no_such_fn", &json!({})).is_err());
    }
}
