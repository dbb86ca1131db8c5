//! Code generation targets and the emit pipeline shared by all of them.
pub mod dart;
pub mod go;
pub mod js;
pub mod lua;
pub mod python;
pub mod templates;

use std::fmt;

use serde_json::Value;

use crate::ast::Module;
use crate::emitter::{Converter, EmitError};
use crate::rewriters::{self, Rewriter};
use crate::targets::python::Flavor;
use crate::tokens::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    PyLxml,
    PyParsel,
    PyBs4,
    PySelectolax,
    JsPure,
    GoGoquery,
    Lua,
    Dart,
}

impl Target {
    pub const ALL: [Target; 8] = [
        Self::PyLxml,
        Self::PyParsel,
        Self::PyBs4,
        Self::PySelectolax,
        Self::JsPure,
        Self::GoGoquery,
        Self::Lua,
        Self::Dart,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::PyLxml => python::lxml::Lxml::NAME,
            Self::PyParsel => python::parsel::Parsel::NAME,
            Self::PyBs4 => python::bs4::Bs4::NAME,
            Self::PySelectolax => python::selectolax::Selectolax::NAME,
            Self::JsPure => js::NAME,
            Self::GoGoquery => go::NAME,
            Self::Lua => lua::NAME,
            Self::Dart => dart::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::PyLxml | Self::PyParsel | Self::PyBs4 | Self::PySelectolax => "py",
            Self::JsPure => "js",
            Self::GoGoquery => "go",
            Self::Lua => "lua",
            Self::Dart => "dart",
        }
    }

    /// External formatter invoked on the written file: program and leading
    /// arguments.
    pub fn formatter(self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::PyLxml | Self::PyParsel | Self::PyBs4 | Self::PySelectolax => ("ruff", &["format"]),
            Self::JsPure => ("prettier", &["--write"]),
            Self::GoGoquery => ("gofmt", &["-w"]),
            Self::Lua => ("stylua", &[]),
            Self::Dart => ("dart", &["format"]),
        }
    }

    pub fn converter(self) -> Converter {
        match self {
            Self::PyLxml => python::converter::<python::lxml::Lxml>(),
            Self::PyParsel => python::converter::<python::parsel::Parsel>(),
            Self::PyBs4 => python::converter::<python::bs4::Bs4>(),
            Self::PySelectolax => python::converter::<python::selectolax::Selectolax>(),
            Self::JsPure => js::converter(),
            Self::GoGoquery => go::converter(),
            Self::Lua => lua::converter(),
            Self::Dart => dart::converter(),
        }
    }

    pub fn rewriters(self) -> &'static [Rewriter] {
        match self {
            Self::PyLxml | Self::PyParsel | Self::PyBs4 | Self::PySelectolax => &[
                rewriters::remove_empty_lines,
                rewriters::collapse_py_return,
                rewriters::py_fstrings,
            ],
            Self::JsPure => &[rewriters::remove_empty_lines, rewriters::collapse_js_return],
            Self::Lua | Self::Dart => &[rewriters::remove_empty_lines],
            Self::GoGoquery => &[
                rewriters::remove_empty_lines,
                rewriters::collapse_go_return,
                rewriters::go_unused_imports,
            ],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Prefix every node's code with a comment naming its kind and kwargs.
    pub debug: bool,
    /// Go package clause.
    pub package: String,
    /// Run the post-emit rewriters.
    pub rewrite: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { debug: false, package: "main".to_string(), rewrite: true }
    }
}

/// Render `module` for `target`: generator header, converted tree, rewriters.
pub fn emit(target: Target, module: &Module, opts: &EmitOptions) -> Result<String, EmitError> {
    let conv = target.converter().with_debug(opts.debug);
    let body = match target {
        Target::GoGoquery => conv.convert(&with_package(module, &opts.package))?,
        _ => conv.convert(module)?,
    };
    let code = format!("{}Code generated by ssc-gen. DO NOT EDIT.\n{body}\n", conv.comment_prefix());
    log::debug!("{target}: emitted {} nodes", module.len());
    if !opts.rewrite {
        return Ok(code);
    }
    Ok(rewriters::apply(target.rewriters(), &code))
}

fn with_package(module: &Module, package: &str) -> Module {
    let mut module = module.clone();
    if let Some(id) = module.root().find_child(TokenKind::Imports).map(|n| n.id()) {
        module.data_mut(id).kwargs.insert("package".to_string(), Value::from(package));
    }
    module
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_build::{BuildOptions, build};
    use crate::document::{Document, Filter};
    use crate::schema::{JsonStruct, Schema, SchemaRegistry};
    use crate::tokens::{ITEM, KEY, PRE_VALIDATE, SPLIT_DOC, StructType, VALUE};

    fn books() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Books", StructType::List)
                .returned_classvar("SOURCE", "books")
                .field(SPLIT_DOC, Document::new().css_all(".col-lg-3"))
                .field("name", Document::new().css(".thumbnail").attr("alt"))
                .field("url", Document::new().css("a").attr("href").format("https://x.test/{{}}"))
                .field("price", Document::new().default("0").css(".price_color").text().re(r"\d+")),
        )
        .unwrap();
        reg
    }

    /// One schema per kind, touching every operation the DSL can build.
    fn everything() -> SchemaRegistry {
        let mut reg = books();
        reg.insert_json_struct(JsonStruct::new("Meta", false).field("id", "number").field("tags", "array_string"));
        reg.insert(Schema::new("Config", StructType::ConfigClassvars).classvar("PREFIX", "Title: "))
            .unwrap();
        reg.insert(
            Schema::new("Page", StructType::Item)
                .doc("Single page")
                .classvar("BASE", "https://x.test")
                .field(PRE_VALIDATE, Document::new().is_css("h1", "no title").has_attr("lang", "no lang"))
                .field(
                    "title",
                    Document::new()
                        .css("h1")
                        .text()
                        .trim()
                        .ltrim_chars("-")
                        .rtrim()
                        .rm_prefix("x")
                        .hook("substr", "Config.PREFIX")
                        .rm_suffix("y")
                        .rm_prefix_and_suffix("z")
                        .unescape()
                        .replace("a", "b")
                        .map_replace(&[("c", "d")])
                        .re_sub(r"(\w+)", r"\1!")
                        .is_regex(r"\w", "word")
                        .is_not_equal("", "empty")
                        .is_equal("t", "t")
                        .format("<{{}}>"),
                )
                .field(
                    "tags",
                    Document::new()
                        .css_all(".tag")
                        .has_no_attr("hidden", "hidden tag")
                        .text()
                        .trim()
                        .ltrim()
                        .rtrim_chars(".")
                        .rm_prefix("#")
                        .rm_suffix(",")
                        .rm_prefix_and_suffix("'")
                        .unescape()
                        .replace("_", " ")
                        .map_replace(&[("a", "b"), ("c", "d")])
                        .format("#{{}}")
                        .re_sub(r"\s+", " ")
                        .filter(Filter::and(vec![
                            Filter::or(vec![Filter::eq(&["a"]), Filter::ne(&["b", "c"])]),
                            Filter::not(Filter::contains(&["x"])),
                            Filter::starts_with(&["#"]),
                            Filter::ends_with(&["!", "?"]),
                            Filter::re_with("^[a-z]", true),
                            Filter::len_eq(1),
                            Filter::len_ne(2),
                            Filter::len_lt(30),
                            Filter::len_le(29),
                            Filter::len_gt(0),
                            Filter::len_ge(1),
                        ]))
                        .any_is_regex("#", "hash")
                        .all_is_regex(".", "dot")
                        .is_contains("#a", "missing")
                        .unique(true),
                )
                .field("first_link", Document::new().css_all("a").first().attr("href"))
                .field("links", Document::new().css_all("a").attrs(&["href", "data-href"]))
                .field("alt", Document::new().css("img").attrs(&["alt", "title"]).join(" "))
                .field("count", Document::new().css_all("li").to_len())
                .field("words", Document::new().css("p").text().split(" ").last())
                .field("numbers", Document::new().css_all(".n").text().to_int().is_contains(3, "no 3"))
                .field("floats", Document::new().css_all(".f").text().to_float())
                .field("rating", Document::new().default(Value::Null).css(".rating").text().to_float())
                .field("stock", Document::new().css(".stock").text().re_with(r"(\d+) left", 1, true, true).to_int())
                .field("all_numbers", Document::new().css("p").text().re_all(r"\d+").to_len())
                .field("raw", Document::new().css("main").raw())
                .field("raws", Document::new().css_all("section").raw().to_len())
                .field("texts", Document::new().css_all("section").text().join("\n"))
                .field("visible", Document::new().css(".flag").text().to_bool())
                .field("meta", Document::new().css("script").text().jsonify("Meta", "data.0"))
                .field("books", Document::new().css(".books").sub_parser("Books")),
        )
        .unwrap();
        reg.insert(
            Schema::new("Prices", StructType::Dict)
                .field(SPLIT_DOC, Document::new().css_all("tr"))
                .field(KEY, Document::new().css("th").text())
                .field(VALUE, Document::new().css("td").text().to_int()),
        )
        .unwrap();
        reg.insert(
            Schema::new("Names", StructType::FlatList)
                .field(SPLIT_DOC, Document::new().css_all("li"))
                .field(ITEM, Document::new().text()),
        )
        .unwrap();
        reg.insert(
            Schema::new("Emails", StructType::AccList)
                .field("a", Document::new().css_all("a.mail").attr("href"))
                .field("b", Document::new().css("p").text().re_all(r"\S+@\S+")),
        )
        .unwrap();
        reg
    }

    fn render(target: Target, reg: &SchemaRegistry) -> String {
        let module = build(reg, BuildOptions::default()).unwrap();
        emit(target, &module, &EmitOptions::default()).unwrap()
    }

    #[test]
    fn default_wraps_regex_field() {
        let py = render(Target::PyLxml, &books());
        assert!(py.contains("with suppress(Exception):"));
        assert!(py.contains("re.search("));
        assert!(py.contains("return '0'"));

        let js = render(Target::JsPure, &books());
        assert!(js.contains("} catch (e) {"));
        assert!(js.contains("return \"0\";"));

        let go = render(Target::GoGoquery, &books());
        assert!(go.contains("func (p *Books) parsePrice(v *goquery.Selection) (result string, err error) {"));
        assert!(go.contains("result = \"0\""));
        assert!(go.contains("sscRegexMatch("));
    }

    #[test]
    fn format_becomes_interpolation() {
        assert!(render(Target::PyLxml, &books()).contains("f'https://x.test/{v1}'"));
        assert!(render(Target::PyParsel, &books()).contains("f'https://x.test/{v1}'"));
        assert!(render(Target::JsPure, &books()).contains("`https://x.test/${v1}`"));
        assert!(render(Target::GoGoquery, &books()).contains("fmt.Sprintf(\"https://x.test/%s\", v1)"));
    }

    #[test]
    fn emit_is_deterministic() {
        let reg = everything();
        for target in Target::ALL {
            let module = build(&reg, BuildOptions::default()).unwrap();
            let opts = EmitOptions::default();
            let first = emit(target, &module, &opts);
            let second = emit(target, &build(&reg, BuildOptions::default()).unwrap(), &opts);
            assert_eq!(first, second, "{target}");
        }
    }

    #[test]
    fn every_buildable_kind_has_a_callback() {
        for target in Target::ALL {
            let conv = target.converter();
            for kind in TokenKind::ALL.iter().copied().filter(|k| *k != TokenKind::Default) {
                assert!(conv.handles(kind) || conv.is_unsupported(kind), "{target}: {kind}");
            }
        }
    }

    #[test]
    fn full_fixture_emits_for_every_target() {
        let reg = everything();
        let module = build(&reg, BuildOptions { gen_docstring: true, ..Default::default() }).unwrap();
        for target in Target::ALL {
            let code = emit(target, &module, &EmitOptions::default()).unwrap();
            assert!(code.starts_with(target.converter().comment_prefix()), "{target}");
            for name in ["Books", "Page", "Prices", "Names", "Emails"] {
                assert!(code.contains(name), "{target}: {name}");
            }
        }
    }

    #[test]
    fn css_only_targets_reject_xpath() {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("X", StructType::Item).field("a", Document::new().xpath("//a").text()))
            .unwrap();
        let module = build(&reg, BuildOptions::default()).unwrap();
        for target in [Target::GoGoquery, Target::PyBs4, Target::PySelectolax, Target::Lua, Target::Dart] {
            assert_eq!(
                emit(target, &module, &EmitOptions::default()),
                Err(EmitError::NotImplemented { kind: TokenKind::Xpath, target: target.name() })
            );
        }
        assert!(emit(Target::PyLxml, &module, &EmitOptions::default()).is_ok());
        assert!(emit(Target::JsPure, &module, &EmitOptions::default()).is_ok());

        let css = build(&reg, BuildOptions { xpath_to_css: true, ..BuildOptions::default() }).unwrap();
        assert!(emit(Target::Lua, &css, &EmitOptions::default()).is_ok());
    }

    #[test]
    fn target_names_round_trip() {
        for target in Target::ALL {
            assert_eq!(Target::from_name(target.name()), Some(target));
        }
        assert_eq!(Target::Lua.extension(), "lua");
        assert_eq!(Target::Dart.formatter(), ("dart", &["format"][..]));
    }

    #[test]
    fn go_package_and_debug_comments() {
        let module = build(&books(), BuildOptions::default()).unwrap();
        let opts = EmitOptions { debug: true, package: "scrapers".to_string(), rewrite: true };
        let code = emit(Target::GoGoquery, &module, &opts).unwrap();
        assert!(code.contains("package scrapers\n"));
        assert!(code.contains("// EXPR_CSS {\"query\":\".thumbnail\"}"));
        assert!(!module.root().find_child(TokenKind::Imports).unwrap().kwargs().contains_key("package"));
        assert_eq!(Target::from_name("go::goquery").map(|t| t.extension()), Some("go"));
    }

    fn hooked_schemas() -> SchemaRegistry {
        let mut reg = SchemaRegistry::new();
        reg.insert(Schema::new("Books", StructType::ConfigClassvars).classvar("BASE", "https://x.test/{{}}"))
            .unwrap();
        reg.insert(
            Schema::new("Main", StructType::Item)
                .classvar("PAT", r"(\d+)")
                .classvar("SEL", "h1")
                .classvar("SEP", "; ")
                .field(
                    "url",
                    Document::new().css("a").attr("href").format("https://x.test/{{}}").hook("fmt", "Books.BASE"),
                )
                .field("num", Document::new().css("p").text().re(r"(\d+)").hook("pattern", "Main.PAT"))
                .field("title", Document::new().css("h1").hook("query", "Main.SEL").text())
                .field("words", Document::new().css_all("li").text().join(", ").hook("sep", "Main.SEP")),
        )
        .unwrap();
        reg
    }

    #[test]
    fn classvar_hooks_render_as_references() {
        let reg = hooked_schemas();
        for target in [Target::PyLxml, Target::PyParsel, Target::PyBs4, Target::PySelectolax] {
            let py = render(target, &reg);
            assert!(py.contains("Books.BASE.format("), "{target}");
            assert!(py.contains("re.search(Main.PAT, "), "{target}");
            assert!(py.contains("Main.SEP.join("), "{target}");
            assert!(py.contains("Main.SEL"), "{target}");
            assert!(!py.contains("'https://x.test/{}'.format("), "{target}");
        }

        let js = render(Target::JsPure, &reg);
        assert!(js.contains("Books.BASE.replaceAll(\"{{}}\", "));
        assert!(js.contains("new RegExp(Main.PAT"));
        assert!(js.contains(".join(Main.SEP)"));

        let go = render(Target::GoGoquery, &reg);
        assert!(go.contains("strings.ReplaceAll(BooksCfg.Base, \"{{}}\", "));
        assert!(go.contains("regexp.MustCompile(MainCfg.Pat)"));
        assert!(go.contains("strings.Join(") && go.contains(", MainCfg.Sep)"));
        assert!(go.contains("sscCss(v, MainCfg.Sel)"));

        let lua = render(Target::Lua, &reg);
        assert!(lua.contains("Ssc.fmt(Books.BASE, "));
        assert!(lua.contains(", Main.PAT, 1)"));
        assert!(lua.contains("table.concat(") && lua.contains(", Main.SEP)"));
        assert!(lua.contains("Ssc.css(v, Main.SEL)"));

        let dart = render(Target::Dart, &reg);
        assert!(dart.contains("Books.BASE.replaceAll(\"{{}}\", "));
        assert!(dart.contains("RegExp(Main.PAT)"));
        assert!(dart.contains(".join(Main.SEP)"));
        assert!(dart.contains("sscCss(v, Main.SEL)"));
    }

    #[test]
    fn js_attr_throws_unless_defaulted() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Links", StructType::Item)
                .field("href", Document::new().css("a").attr("href"))
                .field("alt", Document::new().default(Value::Null).css("img").attr("alt")),
        )
        .unwrap();
        let js = render(Target::JsPure, &reg);
        assert!(js.contains("function sscAttr(v, key) {"));
        assert!(js.contains("throw new Error(`missing attribute ${key}`)"));
        assert_eq!(js.matches("sscAttr(v").count(), 3);
        assert!(js.contains("return null;"));
        assert!(!js.contains(".getAttribute(\"href\")"));
    }

    #[test]
    fn pseudo_suffixed_css_survives_xpath_rewrite() {
        let mut reg = SchemaRegistry::new();
        reg.insert(
            Schema::new("Page", StructType::Item)
                .field("title", Document::new().css("#main .x::text"))
                .field("link", Document::new().css("div.product > a::attr(href)")),
        )
        .unwrap();
        let module = build(&reg, BuildOptions { css_to_xpath: true, ..BuildOptions::default() }).unwrap();
        assert!(module.walk().into_iter().all(|n| n.kind() != TokenKind::Css));
        for target in [Target::PyLxml, Target::PyParsel, Target::JsPure] {
            let code = emit(target, &module, &EmitOptions::default()).unwrap();
            assert!(code.contains("descendant-or-self::*[@id = 'main']/descendant-or-self::*/*[@class"), "{target}");
            assert!(code.contains("descendant-or-self::div[@class"), "{target}");
        }
    }

    #[test]
    fn rewriters_are_idempotent_on_emitted_code() {
        let module = build(&everything(), BuildOptions::default()).unwrap();
        for target in Target::ALL {
            let once = emit(target, &module, &EmitOptions::default()).unwrap();
            assert_eq!(rewriters::apply(target.rewriters(), &once), once, "{target}");
        }
    }
}
