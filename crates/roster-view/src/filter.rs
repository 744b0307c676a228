//! Validation and evaluation of container list filters.
//!
//! Filters arrive as a multi-map of `key -> values`. Every key is validated
//! before any value is looked at, so an unknown key fails the whole request
//! with `invalid filter '<key>'`. A record matches when, for each key given,
//! at least one of that key's values matches.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use regex::Regex;
use roster_common::constants::{DEFAULT_IMAGE_TAG, IMAGE_DIGEST_PREFIX, NAME_SEPARATOR};
use roster_common::error::{Result, RosterError};
use roster_common::types::{
    ContainerRecord, ContainerState, HealthStatus, Isolation, strip_separator,
};
use serde::{Deserialize, Serialize};

use crate::ports::PortRange;
use crate::store::Snapshot;

/// Filter keys accepted by [`ListFilter::compile`].
pub const RECOGNIZED_KEYS: [&str; 13] = [
    "ancestor",
    "before",
    "expose",
    "health",
    "id",
    "isolation",
    "label",
    "name",
    "network",
    "publish",
    "since",
    "status",
    "volume",
];

/// Characters that turn a `name` filter value into a pattern.
const NAME_PATTERN_METACHARACTERS: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Caller-supplied filter arguments: each key maps to a set of values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterArgs {
    fields: BTreeMap<String, BTreeSet<String>>,
}

impl FilterArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one `(key, value)` pair.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let _ = self
            .fields
            .entry(key.into())
            .or_default()
            .insert(value.into());
    }

    /// Adds one `(key, value)` pair, builder style.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add(key, value);
        self
    }

    /// Parses and adds a `key=value` argument.
    ///
    /// # Errors
    ///
    /// Returns an error if the argument has no `=`.
    pub fn add_kv(&mut self, arg: &str) -> Result<()> {
        let (key, value) = arg.split_once('=').ok_or_else(|| RosterError::Config {
            message: format!("bad format of filter (expected name=value): {arg}"),
        })?;
        self.add(key.trim().to_ascii_lowercase(), value);
        Ok(())
    }

    /// Parses the JSON filter encoding, accepting both
    /// `{"key": ["v1", "v2"]}` and the legacy `{"key": {"v1": true}}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not one of those shapes.
    pub fn from_json(input: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Values {
            List(Vec<String>),
            Flags(BTreeMap<String, bool>),
        }

        if input.trim().is_empty() {
            return Ok(Self::new());
        }
        let raw: BTreeMap<String, Values> = serde_json::from_str(input)?;
        let mut args = Self::new();
        for (key, values) in raw {
            let values: BTreeSet<String> = match values {
                Values::List(list) => list.into_iter().collect(),
                Values::Flags(flags) => flags
                    .into_iter()
                    .filter_map(|(value, on)| on.then_some(value))
                    .collect(),
            };
            let _ = args.fields.insert(key, values);
        }
        Ok(args)
    }

    /// Returns whether any value was supplied for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Iterates over the values supplied for `key`.
    pub fn get(&self, key: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(key)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Iterates over the supplied keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Returns whether no filter was supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fails with `invalid filter '<key>'` on the first unknown key.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::InvalidFilter`] naming the offending key.
    pub fn validate(&self, accepted: &[&str]) -> Result<()> {
        match self.keys().find(|key| !accepted.contains(key)) {
            Some(key) => Err(RosterError::invalid_filter_key(key)),
            None => Ok(()),
        }
    }
}

/// Two-path matcher for the `name` filter.
#[derive(Debug, Clone)]
enum NameMatcher {
    Exact(String),
    Pattern { literal: String, regex: Regex },
}

impl NameMatcher {
    fn compile(value: &str) -> Self {
        let value = strip_pattern_separator(value);
        if !value.contains(NAME_PATTERN_METACHARACTERS) {
            return Self::Exact(value);
        }
        match Regex::new(&value) {
            Ok(regex) => Self::Pattern {
                literal: value,
                regex,
            },
            Err(err) => {
                tracing::debug!(pattern = %value, %err, "name filter is not a pattern");
                Self::Exact(value)
            }
        }
    }

    /// Matches a name already stripped of its leading separator.
    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Exact(literal) => literal == name,
            Self::Pattern { literal, regex } => literal == name || regex.is_match(name),
        }
    }
}

/// Removes the separator from a name filter value, keeping a leading `^`.
fn strip_pattern_separator(value: &str) -> String {
    match value.strip_prefix('^') {
        Some(rest) => format!("^{}", strip_separator(rest)),
        None => strip_separator(value).to_owned(),
    }
}

#[derive(Debug, Clone)]
enum LabelMatcher {
    Present(String),
    Equals(String, String),
    NotEquals(String, String),
}

impl LabelMatcher {
    fn parse(value: &str) -> Self {
        if let Some((key, val)) = value.split_once("!=") {
            return Self::NotEquals(key.to_owned(), val.to_owned());
        }
        match value.split_once('=') {
            Some((key, val)) => Self::Equals(key.to_owned(), val.to_owned()),
            None => Self::Present(value.to_owned()),
        }
    }

    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Present(key) => labels.contains_key(key),
            Self::Equals(key, val) => labels.get(key) == Some(val),
            Self::NotEquals(key, val) => labels.get(key).is_some_and(|v| v != val),
        }
    }
}

/// Compiled, validated filter ready to evaluate against records.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    names: Vec<NameMatcher>,
    ids: Vec<String>,
    statuses: Vec<ContainerState>,
    labels: Vec<LabelMatcher>,
    ancestors: Vec<String>,
    volumes: Vec<String>,
    networks: Vec<String>,
    health: Vec<Option<HealthStatus>>,
    isolation: Vec<Isolation>,
    publish: Vec<PortRange>,
    expose: Vec<PortRange>,
    before: Option<Arc<ContainerRecord>>,
    since: Option<Arc<ContainerRecord>>,
}

impl ListFilter {
    /// Validates `args` and compiles them against `snapshot`.
    ///
    /// `before` and `since` are resolved in the same snapshot that will be
    /// filtered, so the reference container is consistent with the result.
    ///
    /// # Errors
    ///
    /// Returns [`RosterError::InvalidFilter`] for an unknown key or an
    /// unusable value, and [`RosterError::NoSuchContainer`] when `before`
    /// or `since` does not resolve.
    pub fn compile(args: &FilterArgs, snapshot: &Snapshot) -> Result<Self> {
        args.validate(&RECOGNIZED_KEYS)?;

        let mut filter = Self {
            names: args.get("name").map(NameMatcher::compile).collect(),
            ids: args.get("id").map(str::to_owned).collect(),
            labels: args.get("label").map(LabelMatcher::parse).collect(),
            ancestors: args.get("ancestor").map(str::to_owned).collect(),
            volumes: args.get("volume").map(str::to_owned).collect(),
            networks: args.get("network").map(str::to_owned).collect(),
            ..Self::default()
        };

        for value in args.get("status") {
            filter.statuses.push(value.parse()?);
        }
        for value in args.get("health") {
            filter.health.push(parse_health(value)?);
        }
        for value in args.get("isolation") {
            filter.isolation.push(value.parse()?);
        }
        for value in args.get("publish") {
            let range = PortRange::parse(value)
                .ok_or_else(|| RosterError::invalid_filter_value("publish", value))?;
            filter.publish.push(range);
        }
        for value in args.get("expose") {
            let range = PortRange::parse(value)
                .ok_or_else(|| RosterError::invalid_filter_value("expose", value))?;
            filter.expose.push(range);
        }

        // Values of one key are OR-ed: "before any of them" is "before the
        // newest of them", and "since any of them" is "since the oldest".
        filter.before = resolve_all(snapshot, args.get("before"))?
            .into_iter()
            .max_by_key(|r| r.created);
        filter.since = resolve_all(snapshot, args.get("since"))?
            .into_iter()
            .min_by_key(|r| r.created);

        Ok(filter)
    }

    /// Returns whether the filter selects stopped containers on its own.
    #[must_use]
    pub fn implies_all(&self) -> bool {
        !self.statuses.is_empty()
    }

    /// Returns whether a `before` or `since` bound is present.
    #[must_use]
    pub const fn has_range(&self) -> bool {
        self.before.is_some() || self.since.is_some()
    }

    /// Evaluates the filter against one record.
    #[must_use]
    pub fn matches(&self, rec: &ContainerRecord) -> bool {
        any_or_empty(&self.names, |m| m.matches(rec.bare_name()))
            && any_or_empty(&self.ids, |id| rec.id.as_str().starts_with(id.as_str()))
            && any_or_empty(&self.statuses, |s| *s == rec.state)
            && any_or_empty(&self.labels, |m| m.matches(&rec.labels))
            && any_or_empty(&self.ancestors, |a| matches_ancestor(a, rec))
            && any_or_empty(&self.volumes, |v| matches_volume(v, rec))
            && any_or_empty(&self.networks, |n| matches_network(n, rec))
            && any_or_empty(&self.health, |h| *h == rec.health)
            && any_or_empty(&self.isolation, |i| *i == rec.host_config.isolation)
            && any_or_empty(&self.publish, |range| {
                rec.host_config.port_bindings.keys().any(|p| range.contains(*p))
            })
            && any_or_empty(&self.expose, |range| {
                rec.exposed_ports.iter().any(|p| range.contains(*p))
            })
            && self.within_range(rec)
    }

    fn within_range(&self, rec: &ContainerRecord) -> bool {
        if let Some(before) = &self.before {
            if rec.id == before.id || rec.created >= before.created {
                return false;
            }
        }
        if let Some(since) = &self.since {
            if rec.id == since.id || rec.created <= since.created {
                return false;
            }
        }
        true
    }
}

fn any_or_empty<T>(values: &[T], pred: impl Fn(&T) -> bool) -> bool {
    values.is_empty() || values.iter().any(pred)
}

fn parse_health(value: &str) -> Result<Option<HealthStatus>> {
    match value {
        "none" => Ok(None),
        "starting" => Ok(Some(HealthStatus::Starting)),
        "healthy" => Ok(Some(HealthStatus::Healthy)),
        "unhealthy" => Ok(Some(HealthStatus::Unhealthy)),
        _ => Err(RosterError::invalid_filter_value("health", value)),
    }
}

fn resolve_all<'a>(
    snapshot: &Snapshot,
    references: impl Iterator<Item = &'a str>,
) -> Result<Vec<Arc<ContainerRecord>>> {
    references
        .map(|reference| {
            snapshot
                .resolve(reference)
                .cloned()
                .ok_or_else(|| RosterError::NoSuchContainer {
                    reference: reference.to_owned(),
                })
        })
        .collect()
}

/// Appends the default tag to a reference that has neither tag nor digest.
fn with_default_tag(reference: &str) -> String {
    let last = reference.rsplit(NAME_SEPARATOR).next().unwrap_or(reference);
    if last.contains(':') || reference.contains('@') {
        reference.to_owned()
    } else {
        format!("{reference}:{DEFAULT_IMAGE_TAG}")
    }
}

fn matches_ancestor(value: &str, rec: &ContainerRecord) -> bool {
    if value == rec.image || with_default_tag(value) == with_default_tag(&rec.image) {
        return true;
    }
    let digest = value.strip_prefix(IMAGE_DIGEST_PREFIX).unwrap_or(value);
    !digest.is_empty() && rec.image_id.digest_hex().starts_with(digest)
}

fn matches_volume(value: &str, rec: &ContainerRecord) -> bool {
    rec.mounts
        .iter()
        .any(|m| m.name == value || m.source == value || m.destination == value)
}

fn matches_network(value: &str, rec: &ContainerRecord) -> bool {
    rec.networks.contains_key(value)
        || rec
            .networks
            .values()
            .any(|ep| !ep.network_id.is_empty() && ep.network_id.starts_with(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_common::types::{
        ContainerId, EndpointSettings, ImageId, MountPoint, Port, PortBinding,
    };

    use crate::store::ViewStore;

    fn record(id: &str, name: &str) -> ContainerRecord {
        let mut rec = ContainerRecord::new(ContainerId::new(id), name);
        rec.state = ContainerState::Running;
        rec
    }

    fn compile(args: &FilterArgs) -> Result<ListFilter> {
        ListFilter::compile(args, &Snapshot::default())
    }

    fn name_filter(value: &str) -> ListFilter {
        compile(&FilterArgs::new().with("name", value)).unwrap()
    }

    #[test]
    fn unknown_key_fails_before_values_are_checked() {
        let args = FilterArgs::new()
            .with("status", "not-a-status")
            .with("bogus", "x");
        let err = compile(&args).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter 'bogus'");
    }

    #[test]
    fn every_recognized_key_is_accepted() {
        let args = FilterArgs::new().with("label", "a");
        assert!(compile(&args).is_ok());
        for key in RECOGNIZED_KEYS {
            assert!(
                FilterArgs::new().with(key, "x").validate(&RECOGNIZED_KEYS).is_ok(),
                "{key} rejected"
            );
        }
    }

    #[test]
    fn caret_pattern_matches_stripped_name() {
        let filter = name_filter("^a");
        assert!(filter.matches(&record("1", "a1")));
        assert!(filter.matches(&record("2", "/a2")));
        assert!(!filter.matches(&record("3", "b1")));
        assert!(!filter.matches(&record("4", "ba")));
    }

    #[test]
    fn caret_slash_pattern_is_equivalent() {
        let filter = name_filter("^/a");
        assert!(filter.matches(&record("1", "a1")));
        assert!(!filter.matches(&record("3", "b1")));
    }

    #[test]
    fn plain_name_matches_exactly() {
        let filter = name_filter("b1");
        assert!(filter.matches(&record("1", "b1")));
        assert!(!filter.matches(&record("2", "b10")));
        assert!(!filter.matches(&record("3", "ab1")));
        assert!(name_filter("/b1").matches(&record("1", "b1")));
        assert!(name_filter("web-1").matches(&record("1", "web-1")));
        assert!(!name_filter("web-1").matches(&record("1", "web-10")));
    }

    #[test]
    fn invalid_pattern_falls_back_to_exact() {
        let filter = name_filter("a(");
        assert!(filter.matches(&record("1", "a(")));
        assert!(!filter.matches(&record("2", "a")));
    }

    #[test]
    fn unanchored_pattern_searches_anywhere() {
        let filter = name_filter("b.$");
        assert!(filter.matches(&record("1", "web1")));
        assert!(!filter.matches(&record("2", "b1x")));
    }

    #[test]
    fn values_of_one_key_are_ored_and_keys_anded() {
        let args = FilterArgs::new()
            .with("name", "a1")
            .with("name", "b1")
            .with("status", "running");
        let filter = compile(&args).unwrap();
        assert!(filter.matches(&record("1", "a1")));
        assert!(filter.matches(&record("2", "b1")));

        let mut stopped = record("3", "a1");
        stopped.state = ContainerState::Exited;
        assert!(!filter.matches(&stopped));
    }

    #[test]
    fn id_filter_matches_prefix() {
        let filter = compile(&FilterArgs::new().with("id", "abc")).unwrap();
        assert!(filter.matches(&record("abcdef", "x")));
        assert!(!filter.matches(&record("xabc", "y")));
    }

    #[test]
    fn status_value_is_validated() {
        let err = compile(&FilterArgs::new().with("status", "sleeping")).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter 'status=sleeping'");
        let filter = compile(&FilterArgs::new().with("status", "exited")).unwrap();
        assert!(filter.implies_all());
    }

    #[test]
    fn label_presence_equality_and_negation() {
        let mut rec = record("1", "x");
        let _ = rec.labels.insert("tier".into(), "web".into());

        let present = compile(&FilterArgs::new().with("label", "tier")).unwrap();
        let equal = compile(&FilterArgs::new().with("label", "tier=web")).unwrap();
        let wrong = compile(&FilterArgs::new().with("label", "tier=db")).unwrap();
        let negated = compile(&FilterArgs::new().with("label", "tier!=db")).unwrap();
        assert!(present.matches(&rec));
        assert!(equal.matches(&rec));
        assert!(!wrong.matches(&rec));
        assert!(negated.matches(&rec));
        assert!(!present.matches(&record("2", "y")));
    }

    #[test]
    fn ancestor_matches_reference_and_image_id() {
        let mut rec = record("1", "x");
        rec.image = "nginx".into();
        rec.image_id = ImageId::new("sha256:deadbeef");

        for value in ["nginx", "nginx:latest", "deadbe", "sha256:deadbeef"] {
            let filter = compile(&FilterArgs::new().with("ancestor", value)).unwrap();
            assert!(filter.matches(&rec), "{value} should match");
        }
        let filter = compile(&FilterArgs::new().with("ancestor", "nginx:1.25")).unwrap();
        assert!(!filter.matches(&rec));
    }

    #[test]
    fn volume_matches_name_source_or_destination() {
        let mut rec = record("1", "x");
        rec.mounts.push(MountPoint {
            name: "data".into(),
            source: "/var/lib/data".into(),
            destination: "/data".into(),
        });
        for value in ["data", "/var/lib/data", "/data"] {
            let filter = compile(&FilterArgs::new().with("volume", value)).unwrap();
            assert!(filter.matches(&rec), "{value} should match");
        }
        let filter = compile(&FilterArgs::new().with("volume", "other")).unwrap();
        assert!(!filter.matches(&rec));
    }

    #[test]
    fn network_matches_name_or_id_prefix() {
        let mut rec = record("1", "x");
        let _ = rec.networks.insert(
            "backend".into(),
            EndpointSettings {
                network_id: "net0123".into(),
                ip_address: "10.0.0.2".into(),
            },
        );
        for value in ["backend", "net01"] {
            let filter = compile(&FilterArgs::new().with("network", value)).unwrap();
            assert!(filter.matches(&rec), "{value} should match");
        }
        let filter = compile(&FilterArgs::new().with("network", "frontend")).unwrap();
        assert!(!filter.matches(&rec));
    }

    #[test]
    fn health_none_matches_containers_without_healthcheck() {
        let plain = record("1", "x");
        let mut healthy = record("2", "y");
        healthy.health = Some(HealthStatus::Healthy);

        let none = compile(&FilterArgs::new().with("health", "none")).unwrap();
        let ok = compile(&FilterArgs::new().with("health", "healthy")).unwrap();
        assert!(none.matches(&plain));
        assert!(!none.matches(&healthy));
        assert!(ok.matches(&healthy));
        assert!(compile(&FilterArgs::new().with("health", "meh")).is_err());
    }

    #[test]
    fn isolation_value_is_validated() {
        let err = compile(&FilterArgs::new().with("isolation", "vm")).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter 'isolation=vm'");
        let filter = compile(&FilterArgs::new().with("isolation", "default")).unwrap();
        assert!(filter.matches(&record("1", "x")));
    }

    #[test]
    fn publish_and_expose_match_port_ranges() {
        let mut rec = record("1", "x");
        let _ = rec.exposed_ports.insert(Port::tcp(80));
        let _ = rec
            .host_config
            .port_bindings
            .insert(Port::tcp(443), vec![PortBinding::default()]);

        let expose = compile(&FilterArgs::new().with("expose", "70-90")).unwrap();
        let publish = compile(&FilterArgs::new().with("publish", "443/tcp")).unwrap();
        let unpublished = compile(&FilterArgs::new().with("publish", "80")).unwrap();
        assert!(expose.matches(&rec));
        assert!(publish.matches(&rec));
        assert!(!unpublished.matches(&rec));

        let err = compile(&FilterArgs::new().with("expose", "abc")).unwrap_err();
        assert_eq!(err.to_string(), "invalid filter 'expose=abc'");
    }

    #[test]
    fn before_and_since_bound_creation_time() {
        let base = chrono::Utc::now();
        let store = ViewStore::new();
        for (i, id) in ["old", "mid", "new"].iter().enumerate() {
            let mut rec = record(id, id);
            rec.created = base + chrono::Duration::seconds(i64::try_from(i).unwrap());
            store.save(rec);
        }
        let snap = store.snapshot();

        let before = ListFilter::compile(&FilterArgs::new().with("before", "mid"), &snap).unwrap();
        let since = ListFilter::compile(&FilterArgs::new().with("since", "mid"), &snap).unwrap();
        let get = |id: &str| snap.get(&ContainerId::new(id)).unwrap().clone();

        assert!(before.has_range());
        assert!(before.matches(&get("old")));
        assert!(!before.matches(&get("mid")));
        assert!(!before.matches(&get("new")));
        assert!(since.matches(&get("new")));
        assert!(!since.matches(&get("mid")));
        assert!(!since.matches(&get("old")));
    }

    #[test]
    fn unresolvable_before_reports_missing_container() {
        let err = compile(&FilterArgs::new().with("before", "ghost")).unwrap_err();
        assert!(matches!(err, RosterError::NoSuchContainer { .. }));
    }

    #[test]
    fn kv_arguments_parse() {
        let mut args = FilterArgs::new();
        args.add_kv("name=^web").unwrap();
        args.add_kv("label=a=b").unwrap();
        assert_eq!(args.get("name").collect::<Vec<_>>(), vec!["^web"]);
        assert_eq!(args.get("label").collect::<Vec<_>>(), vec!["a=b"]);
        assert!(args.add_kv("novalue").is_err());
    }

    #[test]
    fn json_arguments_accept_both_encodings() {
        let list = FilterArgs::from_json(r#"{"name":["a","b"]}"#).unwrap();
        let flags = FilterArgs::from_json(r#"{"name":{"a":true,"b":true,"c":false}}"#).unwrap();
        assert_eq!(list, flags);
        assert!(FilterArgs::from_json("").unwrap().is_empty());
        assert!(FilterArgs::from_json("[1]").is_err());
    }
}
