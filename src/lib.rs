//! Generate web-scraper parsers for several languages from one declarative
//! schema description.
pub mod analyzer;
pub mod ast;
pub mod ast_build;
pub mod cli;
pub mod document;
pub mod emitter;
pub mod inference;
pub mod jq_exec;
pub mod logging;
pub mod path_de;
pub mod regex_utils;
pub mod rewriters;
pub mod schema;
pub mod selector;
pub mod str_utils;
pub mod targets;
pub mod tokens;
