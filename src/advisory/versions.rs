//! Affected-version ranges.

use semver::{Comparator, Op, Version, VersionReq};

/// Version ranges listed in an advisory's `[versions]` table.
///
/// A version is vulnerable unless it matches at least one `patched` or
/// `unaffected` requirement.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Versions {
    pub patched: Vec<VersionReq>,
    pub unaffected: Vec<VersionReq>,
}

impl Versions {
    /// # Examples
    ///
    /// ```
    /// use oxidized_cargo_audit::advisory::Versions;
    /// use semver::{Version, VersionReq};
    ///
    /// let versions = Versions {
    ///     patched: vec![VersionReq::parse(">= 1.2.0").unwrap()],
    ///     unaffected: vec![VersionReq::parse("< 1.0.0").unwrap()],
    /// };
    /// assert!(versions.is_vulnerable(&Version::parse("1.1.0").unwrap()));
    /// assert!(!versions.is_vulnerable(&Version::parse("1.2.3").unwrap()));
    /// assert!(!versions.is_vulnerable(&Version::parse("0.9.0").unwrap()));
    /// ```
    pub fn is_vulnerable(&self, version: &Version) -> bool {
        !self
            .patched
            .iter()
            .chain(self.unaffected.iter())
            .any(|req| req_matches(req, version))
    }
}

/// Matches `version` against `req`, letting prereleases satisfy ordered ranges.
///
/// `semver` refuses to match `2.0.0-rc.1` against `>= 1.0.0`, which would
/// flag every prerelease of a fixed line as vulnerable. For prereleases the
/// ordered operators are evaluated by plain version ordering instead.
pub(crate) fn req_matches(req: &VersionReq, version: &Version) -> bool {
    if version.pre.is_empty() {
        return req.matches(version);
    }
    req.comparators
        .iter()
        .all(|cmp| comparator_matches_ordered(cmp, version))
}

fn comparator_matches_ordered(cmp: &Comparator, version: &Version) -> bool {
    let mut candidate = version.clone();
    candidate.build = semver::BuildMetadata::EMPTY;

    // A partial bound such as `1.2` stands for the whole `1.2.*` line: `>=`
    // and `<` start at `1.2.0`, while `>` and `<=` exclude everything up to
    // the next minor (or major) release.
    let partial = cmp.minor.is_none() || cmp.patch.is_none();
    let mut bound = match (cmp.minor, cmp.patch) {
        (Some(minor), Some(patch)) => Version::new(cmp.major, minor, patch),
        (Some(minor), None) => match cmp.op {
            Op::Greater | Op::LessEq => Version::new(cmp.major, minor + 1, 0),
            _ => Version::new(cmp.major, minor, 0),
        },
        (None, _) => match cmp.op {
            Op::Greater | Op::LessEq => Version::new(cmp.major + 1, 0, 0),
            _ => Version::new(cmp.major, 0, 0),
        },
    };
    bound.pre = cmp.pre.clone();

    match (cmp.op, partial) {
        (Op::GreaterEq, _) | (Op::Greater, true) => candidate >= bound,
        (Op::Greater, false) => candidate > bound,
        (Op::Less, _) | (Op::LessEq, true) => candidate < bound,
        (Op::LessEq, false) => candidate <= bound,
        _ => cmp.matches(version),
    }
}
