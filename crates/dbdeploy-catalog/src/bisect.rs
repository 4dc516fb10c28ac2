//! Single-step bisection over a DBMS's ordered releases.
//!
//! Each call returns the midpoint between two releases. The narrowing loop
//! itself (test the midpoint, pick a half, call again) is driven by the
//! operator or an external script.

use dbdeploy_common::error::{DeployError, Result};

use crate::catalog::Catalog;
use crate::model::Release;

/// Returns the release halfway between `old` and `new`, inclusive.
///
/// `new` is searched only from `old`'s position onwards, so a pair given
/// in reverse catalog order fails instead of being swapped. The midpoint
/// index rounds toward `old`.
///
/// # Errors
///
/// Returns `DeployError::NotFound` if `old` is absent, or if `new` does not
/// appear at or after `old`.
pub fn bisect<'a>(releases: &'a [Release], old: &str, new: &str) -> Result<&'a Release> {
    let lo = releases
        .iter()
        .position(|r| r.id == old)
        .ok_or_else(|| DeployError::NotFound {
            kind: "bisect start",
            id: old.to_string(),
        })?;
    let hi = releases[lo..]
        .iter()
        .position(|r| r.id == new)
        .map(|offset| lo + offset)
        .ok_or_else(|| DeployError::NotFound {
            kind: "bisect end",
            id: new.to_string(),
        })?;
    let mid = lo + (hi - lo) / 2;
    tracing::debug!(lo, hi, mid, "bisect");
    Ok(&releases[mid])
}

impl Catalog {
    /// Bisects between two releases of `dbms`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NotFound` if the DBMS or either endpoint is
    /// unknown, or the endpoints are out of order.
    pub fn bisect(&self, dbms: &str, old: &str, new: &str) -> Result<&Release> {
        bisect(self.find_dbms(dbms)?.releases(), old, new)
    }
}

#[cfg(test)]
mod tests {
    use dbdeploy_common::types::ImageRef;

    use super::*;
    use crate::model::ReleaseSource;

    fn releases(ids: &[&str]) -> Vec<Release> {
        ids.iter()
            .map(|id| Release {
                id: (*id).to_string(),
                source: ReleaseSource::PullPrebuilt(ImageRef::new("mysql", *id)),
                run_flags: Vec::new(),
                readiness: None,
                init: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn full_range_returns_middle() {
        let list = releases(&["v1", "v2", "v3", "v4", "v5"]);
        assert_eq!(bisect(&list, "v1", "v5").expect("bisect").id, "v3");
    }

    #[test]
    fn same_endpoint_returns_itself() {
        let list = releases(&["v1", "v2", "v3", "v4", "v5"]);
        assert_eq!(bisect(&list, "v3", "v3").expect("bisect").id, "v3");
    }

    #[test]
    fn even_span_rounds_toward_old() {
        let list = releases(&["v1", "v2", "v3", "v4"]);
        assert_eq!(bisect(&list, "v1", "v4").expect("bisect").id, "v2");
        assert_eq!(bisect(&list, "v3", "v4").expect("bisect").id, "v3");
    }

    #[test]
    fn reversed_endpoints_are_not_found() {
        let list = releases(&["v1", "v2", "v3", "v4", "v5"]);
        let err = bisect(&list, "v4", "v2").unwrap_err();
        assert!(
            matches!(err, DeployError::NotFound { kind: "bisect end", ref id } if id == "v2"),
            "got: {err}"
        );
    }

    #[test]
    fn unknown_start_is_not_found() {
        let list = releases(&["v1", "v2"]);
        let err = bisect(&list, "v0", "v2").unwrap_err();
        assert!(matches!(err, DeployError::NotFound { kind: "bisect start", .. }));
    }

    #[test]
    fn catalog_bisect_uses_dbms_release_order() {
        let catalog = Catalog::from_json(
            r#"[ { "name": "mysql", "port": 3306, "versions": [
                { "name": "5.0.15" }, { "name": "5.0.16" }, { "name": "5.0.17" } ] } ]"#,
        )
        .expect("catalog");
        assert_eq!(
            catalog.bisect("mysql", "5.0.15", "5.0.17").expect("bisect").id,
            "5.0.16"
        );
        assert!(catalog.bisect("postgres", "a", "b").is_err());
    }
}
