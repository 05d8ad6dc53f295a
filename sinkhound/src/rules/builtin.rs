//! Builtin signature rules.
//!
//! Seeded for hertz-style web services: the framework's two handler shapes,
//! the request-extraction methods of `app.RequestContext` as sources, and
//! gorm's raw-SQL and clause-composition methods as sinks. A rule file can
//! replace any of the three lists.

use super::SigRule;

const REQUEST_CONTEXT: &str = r"^\*[\w./]*app\.RequestContext$";
const GORM_DB: &str = r"^\*[\w./]*gorm\.DB$";

fn rule(
    frame: &str,
    receiver: Option<&str>,
    name: Option<&str>,
    params: Option<&[&str]>,
    results: Option<&[&str]>,
) -> SigRule {
    SigRule {
        frame: frame.to_owned(),
        receiver: receiver.map(str::to_owned),
        name: name.map(str::to_owned),
        params: params.map(|ps| ps.iter().map(|&p| p.to_owned()).collect()),
        results: results.map(|rs| rs.iter().map(|&r| r.to_owned()).collect()),
    }
}

/// Handler shapes: `(context.Context, *app.RequestContext)` and the older
/// single-context form, both returning nothing.
#[must_use]
pub fn handler_rules() -> Vec<SigRule> {
    vec![
        rule(
            "hertz",
            None,
            None,
            Some(&[r"^context\.Context$", REQUEST_CONTEXT]),
            Some(&[]),
        ),
        rule(
            "hertz",
            None,
            None,
            Some(&[r"^\*[\w./]*hertz\.RequestContext$"]),
            Some(&[]),
        ),
    ]
}

/// Request-extraction sources on `*app.RequestContext`.
#[must_use]
pub fn source_rules() -> Vec<SigRule> {
    vec![
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^GetString$"),
            Some(&["^string$"]),
            Some(&["^string$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^BindAndValidate$"),
            Some(&[r"^interface\{\}$"]),
            Some(&["^error$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^(Query|PostForm|Param)$"),
            Some(&["^string$"]),
            Some(&["^string$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^DefaultQuery$"),
            Some(&["^string$", "^string$"]),
            Some(&["^string$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^GetHeader$"),
            Some(&["^string$"]),
            Some(&[r"^\[\]byte$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^ClientIP$"),
            Some(&[]),
            Some(&["^string$"]),
        ),
        rule(
            "hertz",
            Some(REQUEST_CONTEXT),
            Some("^GetRawData$"),
            Some(&[]),
            Some(&[r"^\[\]byte$"]),
        ),
    ]
}

/// SQL execution and where/order/group/having clause composition on
/// `*gorm.DB`, plus the catch-all `SQLInject` marker.
#[must_use]
pub fn sink_rules() -> Vec<SigRule> {
    vec![
        rule(
            "gorm",
            Some(GORM_DB),
            Some("^(Exec|Raw)$"),
            None,
            None,
        ),
        rule(
            "gorm",
            Some(GORM_DB),
            Some("^(Where|Order|Group|Having)$"),
            None,
            None,
        ),
        rule("diy", None, Some("^SQLInject$"), None, None),
    ]
}
