#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Decides which annotations a resource receives at admission time.
//!
//! A [`RuleSet`] is loaded once from configuration and evaluated against each
//! resource under admission. Every matching rule contributes its annotations,
//! in declaration order, so later rules override earlier ones.

mod evaluate;
pub mod labels;
mod rule;


pub use self::{
    evaluate::{Evaluation, ResourceContext},
    labels::{Map, Selector},
    rule::{ConfigError, Rule, RuleSet, RULE_LABEL},
};
